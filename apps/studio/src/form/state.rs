//! Form State Manager — owns the form input, its field errors, and the
//! cascading job-role picker.

use serde::Serialize;

use crate::form::models::{
    ExperienceBucket, FormField, FormInput, GenerationPayload, GenerationRequest, ModelParams,
    RoleBody, TextField,
};
use crate::form::taxonomy::{Picker, RoleSelection, SelectionError};
use crate::form::validation::{revalidate, validate_form, FieldErrors};

/// Role and experience metadata attached to a saved cover letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveMetadata {
    pub role: String,
    pub experience: ExperienceBucket,
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    input: FormInput,
    selection: RoleSelection,
    picker: Option<Picker>,
    errors: FieldErrors,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub input: FormInput,
    pub selection: RoleSelection,
    pub open_picker: Option<Picker>,
    pub title_options: &'static [&'static str],
    pub qualified_role: Option<String>,
    pub errors: FieldErrors,
}

impl FormState {
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            input: self.input.clone(),
            selection: self.selection,
            open_picker: self.picker,
            title_options: self.selection.title_options(),
            qualified_role: self.qualified_role(),
            errors: self.errors.clone(),
        }
    }

    pub fn input(&self) -> &FormInput {
        &self.input
    }

    /// Clears subcategory and title. Categories without subcategories open
    /// the title picker immediately.
    pub fn select_category(&mut self, name: &str) -> Result<(), SelectionError> {
        self.selection = self.selection.select_category(name)?;
        self.input.job_role = None;
        self.picker = match self.selection.next_picker() {
            Picker::Title => Some(Picker::Title),
            _ => None,
        };
        Ok(())
    }

    /// Clears the title and opens the title picker.
    pub fn select_subcategory(&mut self, name: &str) -> Result<(), SelectionError> {
        self.selection = self.selection.select_subcategory(name)?;
        self.input.job_role = None;
        self.picker = Some(Picker::Title);
        Ok(())
    }

    /// Writes the chosen role into the form and validates it.
    pub fn select_title(&mut self, title: &str) -> Result<(), SelectionError> {
        self.selection = self.selection.select_title(title)?;
        self.input.job_role = self.selection.role().copied();
        self.picker = None;
        revalidate(&mut self.errors, &self.input, FormField::JobTitle);
        Ok(())
    }

    pub fn set_experience(&mut self, bucket: ExperienceBucket) {
        self.input.years_of_experience = Some(bucket);
        revalidate(&mut self.errors, &self.input, FormField::YearsOfExperience);
    }

    pub fn set_text(&mut self, field: TextField, value: String) {
        *self.input.text_mut(field) = value;
        if let Some(required) = FormField::narrative(field) {
            revalidate(&mut self.errors, &self.input, required);
        }
    }

    pub fn qualified_role(&self) -> Option<String> {
        self.input.job_role.map(|role| role.qualified())
    }

    /// Validates the whole form. On failure the field errors are stored for
    /// display and returned; nothing is submitted.
    pub fn build_request(&mut self, params: ModelParams) -> Result<GenerationRequest, FieldErrors> {
        self.errors = validate_form(&self.input);
        let (Some(role), Some(bucket)) = (self.input.job_role, self.input.years_of_experience)
        else {
            return Err(self.errors.clone());
        };
        if !self.errors.is_empty() {
            return Err(self.errors.clone());
        }

        let input = &self.input;
        Ok(GenerationRequest {
            payload: GenerationPayload {
                self_introduction: input.introduction.clone(),
                motivation: input.motivation.clone(),
                relevant_experience: input.experience.clone(),
                future_aspirations: input.aspirations.clone(),
                target_company: non_empty(&input.company),
                department: non_empty(&input.department),
                position: Some(role.title().to_string()),
                custom_prompt: input.custom_prompt.clone(),
                skills: input.skills.clone(),
                experience: bucket,
            },
            body: RoleBody {
                role: role.qualified(),
                experience: bucket.seniority(),
            },
            model_params: params,
        })
    }

    /// Metadata for the save step; `None` until a role and bucket are chosen.
    pub fn save_metadata(&self) -> Option<SaveMetadata> {
        Some(SaveMetadata {
            role: self.input.job_role?.title().to_string(),
            experience: self.input.years_of_experience?,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
