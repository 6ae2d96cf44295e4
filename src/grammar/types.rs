/// Outcome of one grammar check.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarReport {
    /// Human-readable issue count, e.g. `"found 3 issues"`.
    pub summary: String,
    /// The full, unmodified response document, retained so downstream code
    /// can inspect individual matches.
    pub raw: serde_json::Value,
}
