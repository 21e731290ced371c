use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One prior document's share of the generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    #[serde(default)]
    pub id: String,
    /// Percentage, 0–100. Absent while the number is still streaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributions: Option<f64>,
}

/// A cover letter as it streams in: every field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceAttribution>>,
}

/// The strict shape the finished document must have.
#[derive(Debug, Deserialize)]
pub struct FinalCoverLetter {
    pub text: String,
    pub sources: Option<Vec<FinalSource>>,
}

#[derive(Debug, Deserialize)]
pub struct FinalSource {
    pub id: String,
    pub contributions: f64,
}

impl From<FinalCoverLetter> for GenerationResult {
    fn from(done: FinalCoverLetter) -> Self {
        GenerationResult {
            text: done.text,
            sources: done.sources.map(|sources| {
                sources
                    .into_iter()
                    .map(|s| SourceAttribution {
                        id: s.id,
                        contributions: Some(s.contributions),
                    })
                    .collect()
            }),
        }
    }
}

/// A result whose stream has ended, tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedGeneration {
    pub run_id: Uuid,
    pub result: GenerationResult,
}
