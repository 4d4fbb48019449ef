use serde::{Deserialize, Serialize};

use crate::profile::models::{CurrentStatus, ProfileDraft, ProfileField};

/// Fields that make up the required share of the completion score.
pub const REQUIRED_FIELDS: &[ProfileField] = &[
    ProfileField::FullName,
    ProfileField::CurrentStatus,
    ProfileField::EducationLevel,
    ProfileField::TargetJob,
];

/// Fields that make up the optional share of the completion score.
pub const OPTIONAL_FIELDS: &[ProfileField] = &[
    ProfileField::EducationDetail,
    ProfileField::Affiliation,
    ProfileField::Gender,
    ProfileField::Dob,
    ProfileField::Location,
];

const REQUIRED_WEIGHT: f64 = 60.0;
const OPTIONAL_WEIGHT: f64 = 40.0;

/// Labels and visibility that depend on other draft values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVisibility {
    pub affiliation_label: String,
    pub education_detail_label: String,
    pub experience_years_visible: bool,
}

pub fn is_filled(draft: &ProfileDraft, field: ProfileField) -> bool {
    let text = |s: &str| !s.trim().is_empty();
    match field {
        ProfileField::FullName => text(&draft.full_name),
        ProfileField::Bio => text(&draft.bio),
        // Enum selectors always hold a value.
        ProfileField::CurrentStatus | ProfileField::EducationLevel => true,
        ProfileField::EducationDetail => text(&draft.education_detail),
        ProfileField::Affiliation => text(&draft.college_or_company),
        ProfileField::Gender => text(&draft.gender),
        ProfileField::Dob => draft.dob.is_some(),
        ProfileField::TargetJob => text(&draft.target_job),
        ProfileField::ExperienceYears => draft.visible_experience_years().is_some(),
        ProfileField::Industry => text(&draft.industry),
        ProfileField::Location => text(&draft.location),
        ProfileField::Availability => text(&draft.availability),
        ProfileField::SalaryExpectation => text(&draft.salary_expectation),
    }
}

/// `round(60 * required_filled / 4 + 40 * optional_filled / 5)`, in 0..=100.
pub fn completion_score(draft: &ProfileDraft) -> u8 {
    let share = |fields: &[ProfileField]| {
        let filled = fields.iter().filter(|f| is_filled(draft, **f)).count();
        filled as f64 / fields.len() as f64
    };

    let score = REQUIRED_WEIGHT * share(REQUIRED_FIELDS) + OPTIONAL_WEIGHT * share(OPTIONAL_FIELDS);
    score.round().clamp(0.0, 100.0) as u8
}

pub fn field_visibility(draft: &ProfileDraft) -> FieldVisibility {
    let affiliation_label = if draft.current_status == CurrentStatus::Student {
        "College/University"
    } else {
        "Company/Organization"
    };
    let education_detail_label = if draft.education_level.is_degree() {
        "Degree/Major"
    } else {
        "Program/Field"
    };

    FieldVisibility {
        affiliation_label: affiliation_label.to_string(),
        education_detail_label: education_detail_label.to_string(),
        experience_years_visible: draft.current_status.tracks_experience(),
    }
}
