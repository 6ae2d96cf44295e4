use serde::Deserialize;

/// Five independent scores plus free-text feedback for one spoken answer.
///
/// No cross-field invariant is enforced here; range validation, if any,
/// belongs to the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreResult {
    #[serde(default)]
    pub overall: f64,
    #[serde(default)]
    pub fluency: f64,
    #[serde(default)]
    pub vocabulary: f64,
    #[serde(default)]
    pub grammar: f64,
    #[serde(default)]
    pub pronunciation: f64,
    #[serde(default)]
    pub feedback: String,
}

/// Corrected rendition of a transcription with per-issue detail.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrammarCorrection {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Correction {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub reason: String,
}
