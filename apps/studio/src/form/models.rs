use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::taxonomy::JobRole;

/// Years-of-experience buckets offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceBucket {
    #[serde(rename = "Less than 1 year")]
    LessThanOne,
    #[serde(rename = "1-2 years")]
    OneToTwo,
    #[serde(rename = "3-5 years")]
    ThreeToFive,
    #[serde(rename = "5-10 years")]
    FiveToTen,
    #[serde(rename = "10+ years")]
    TenPlus,
}

impl ExperienceBucket {
    pub const ALL: [ExperienceBucket; 5] = [
        ExperienceBucket::LessThanOne,
        ExperienceBucket::OneToTwo,
        ExperienceBucket::ThreeToFive,
        ExperienceBucket::FiveToTen,
        ExperienceBucket::TenPlus,
    ];

    #[cfg(test)]
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceBucket::LessThanOne => "Less than 1 year",
            ExperienceBucket::OneToTwo => "1-2 years",
            ExperienceBucket::ThreeToFive => "3-5 years",
            ExperienceBucket::FiveToTen => "5-10 years",
            ExperienceBucket::TenPlus => "10+ years",
        }
    }

    pub fn seniority(&self) -> Seniority {
        match self {
            ExperienceBucket::FiveToTen | ExperienceBucket::TenPlus => Seniority::Senior,
            _ => Seniority::Junior,
        }
    }
}

/// Two-valued seniority code sent to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Seniority {
    #[serde(rename = "S")]
    Senior,
    #[serde(rename = "J")]
    Junior,
}

/// Free-text fields held by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextField {
    Introduction,
    Motivation,
    Experience,
    Aspirations,
    Company,
    Department,
    Position,
    CustomPrompt,
    Skills,
}

/// Any field that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    JobTitle,
    YearsOfExperience,
    Introduction,
    Motivation,
    Experience,
    Aspirations,
}

/// Raw form contents. Optional fields are empty strings when unused.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub job_role: Option<JobRole>,
    pub years_of_experience: Option<ExperienceBucket>,
    pub introduction: String,
    pub motivation: String,
    pub experience: String,
    pub aspirations: String,
    pub company: String,
    pub department: String,
    pub position: String,
    pub custom_prompt: String,
    pub skills: String,
}

impl FormInput {
    pub fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Introduction => &mut self.introduction,
            TextField::Motivation => &mut self.motivation,
            TextField::Experience => &mut self.experience,
            TextField::Aspirations => &mut self.aspirations,
            TextField::Company => &mut self.company,
            TextField::Department => &mut self.department,
            TextField::Position => &mut self.position,
            TextField::CustomPrompt => &mut self.custom_prompt,
            TextField::Skills => &mut self.skills,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model parameters
// ────────────────────────────────────────────────────────────────────────────

pub const MAX_OUTPUT_TOKENS: u32 = 4000;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("temperature must be between 0 and 1, got {0}")]
    Temperature(f32),

    #[error("max length must be between 1 and {MAX_OUTPUT_TOKENS}, got {0}")]
    MaxTokens(u32),

    #[error("top-p must be between 0 and 1, got {0}")]
    TopP(f32),
}

/// Sampling dials forwarded to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: MAX_OUTPUT_TOKENS,
            top_p: 0.9,
        }
    }
}

impl ModelParams {
    pub fn validated(self) -> Result<Self, ParamsError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ParamsError::Temperature(self.temperature));
        }
        if !(1..=MAX_OUTPUT_TOKENS).contains(&self.max_tokens) {
            return Err(ParamsError::MaxTokens(self.max_tokens));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ParamsError::TopP(self.top_p));
        }
        Ok(self)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire request
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub self_introduction: String,
    pub motivation: String,
    pub relevant_experience: String,
    pub future_aspirations: String,
    pub target_company: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub custom_prompt: String,
    pub skills: String,
    pub experience: ExperienceBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleBody {
    pub role: String,
    pub experience: Seniority,
}

/// Body POSTed to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub payload: GenerationPayload,
    pub body: RoleBody,
    pub model_params: ModelParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_senior_buckets_map_to_s() {
        assert_eq!(ExperienceBucket::FiveToTen.seniority(), Seniority::Senior);
        assert_eq!(ExperienceBucket::TenPlus.seniority(), Seniority::Senior);
    }

    #[test]
    fn test_other_buckets_map_to_j() {
        for bucket in [
            ExperienceBucket::LessThanOne,
            ExperienceBucket::OneToTwo,
            ExperienceBucket::ThreeToFive,
        ] {
            assert_eq!(bucket.seniority(), Seniority::Junior, "{}", bucket.label());
        }
    }

    #[test]
    fn test_bucket_serializes_as_label() {
        for bucket in ExperienceBucket::ALL {
            let json = serde_json::to_value(bucket).unwrap();
            assert_eq!(json, serde_json::json!(bucket.label()));
        }
        let parsed: ExperienceBucket = serde_json::from_str("\"10+ years\"").unwrap();
        assert_eq!(parsed, ExperienceBucket::TenPlus);
    }

    #[test]
    fn test_model_params_defaults_are_valid() {
        let params = ModelParams::default();
        assert_eq!(params.validated(), Ok(params));
    }

    #[test]
    fn test_model_params_bounds() {
        let hot = ModelParams {
            temperature: 1.5,
            ..ModelParams::default()
        };
        assert_eq!(hot.validated(), Err(ParamsError::Temperature(1.5)));

        let long = ModelParams {
            max_tokens: 4001,
            ..ModelParams::default()
        };
        assert_eq!(long.validated(), Err(ParamsError::MaxTokens(4001)));

        let zero = ModelParams {
            max_tokens: 0,
            ..ModelParams::default()
        };
        assert!(zero.validated().is_err());

        let top_p = ModelParams {
            top_p: -0.1,
            ..ModelParams::default()
        };
        assert!(matches!(top_p.validated(), Err(ParamsError::TopP(_))));
    }
}
