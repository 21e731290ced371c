use std::collections::BTreeMap;

use serde::Serialize;

use crate::form::models::{FormField, FormInput, TextField};

/// Minimum length of each narrative field.
pub const MIN_NARRATIVE_CHARS: usize = 10;

/// Field-scoped validation messages, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FormField, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn set(&mut self, field: FormField, result: Option<String>) {
        match result {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }
}

impl FormField {
    pub fn narrative(field: TextField) -> Option<FormField> {
        match field {
            TextField::Introduction => Some(FormField::Introduction),
            TextField::Motivation => Some(FormField::Motivation),
            TextField::Experience => Some(FormField::Experience),
            TextField::Aspirations => Some(FormField::Aspirations),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FormField::JobTitle => "Job title",
            FormField::YearsOfExperience => "Years of experience",
            FormField::Introduction => "Introduction",
            FormField::Motivation => "Motivation",
            FormField::Experience => "Experience",
            FormField::Aspirations => "Aspirations",
        }
    }
}

/// Checks a single field, returning its error message if it fails.
pub fn validate_field(input: &FormInput, field: FormField) -> Option<String> {
    let narrative = |text: &str| {
        (text.trim().chars().count() < MIN_NARRATIVE_CHARS).then(|| {
            format!(
                "{} must be at least {MIN_NARRATIVE_CHARS} characters.",
                field.label()
            )
        })
    };

    match field {
        FormField::JobTitle => input
            .job_role
            .is_none()
            .then(|| format!("{} is required.", field.label())),
        FormField::YearsOfExperience => input
            .years_of_experience
            .is_none()
            .then(|| format!("{} is required.", field.label())),
        FormField::Introduction => narrative(&input.introduction),
        FormField::Motivation => narrative(&input.motivation),
        FormField::Experience => narrative(&input.experience),
        FormField::Aspirations => narrative(&input.aspirations),
    }
}

/// Re-validates one field inside an existing error map.
pub fn revalidate(errors: &mut FieldErrors, input: &FormInput, field: FormField) {
    errors.set(field, validate_field(input, field));
}

/// Validates every required field.
pub fn validate_form(input: &FormInput) -> FieldErrors {
    let mut errors = FieldErrors::default();
    for field in [
        FormField::JobTitle,
        FormField::YearsOfExperience,
        FormField::Introduction,
        FormField::Motivation,
        FormField::Experience,
        FormField::Aspirations,
    ] {
        revalidate(&mut errors, input, field);
    }
    errors
}
