use serde::Deserialize;

/// Transcript of one audio clip.
///
/// Transient value object: the caller owns persistence. An empty or `null`
/// service response decodes to the zero value rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranscriptionResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// One timed slice of the transcript. `start`/`end` are elapsed-seconds
/// offsets with `start <= end`; segments arrive ordered by `index`. Both
/// are producer-side guarantees, not validated here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Segment {
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
}
