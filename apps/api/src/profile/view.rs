use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::profile::completeness::{field_visibility, FieldVisibility};
use crate::profile::engine::EnginePhase;
use crate::profile::models::{
    CurrentStatus, EducationLevel, ExperienceYears, ProfileDraft, SkillSet,
};

/// Read-only snapshot of a draft, safe to render while a save is in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub phase: EnginePhase,
    pub completion: u8,
    pub full_name: String,
    pub bio: String,
    pub current_status: CurrentStatus,
    pub education_level: EducationLevel,
    pub education_detail: String,
    pub college_or_company: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub target_job: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<ExperienceYears>,
    pub industry: String,
    pub location: String,
    pub availability: String,
    pub salary_expectation: String,
    pub skills: SkillSet,
    pub avatar_url: Option<String>,
    pub has_pending_avatar: bool,
    /// False once the draft matches what was last loaded or saved.
    pub has_unsaved_changes: bool,
    pub visibility: FieldVisibility,
}

impl ProfileView {
    pub fn new(
        draft: &ProfileDraft,
        phase: EnginePhase,
        completion: u8,
        has_unsaved_changes: bool,
    ) -> Self {
        Self {
            user_id: draft.user_id,
            phase,
            completion,
            full_name: draft.full_name.clone(),
            bio: draft.bio.clone(),
            current_status: draft.current_status,
            education_level: draft.education_level,
            education_detail: draft.education_detail.clone(),
            college_or_company: draft.college_or_company.clone(),
            gender: draft.gender.clone(),
            dob: draft.dob,
            target_job: draft.target_job.clone(),
            experience_years: draft.visible_experience_years(),
            industry: draft.industry.clone(),
            location: draft.location.clone(),
            availability: draft.availability.clone(),
            salary_expectation: draft.salary_expectation.clone(),
            skills: draft.skills.clone(),
            avatar_url: draft.avatar.display_url().map(String::from),
            has_pending_avatar: draft.avatar.pending.is_some(),
            has_unsaved_changes,
            visibility: field_visibility(draft),
        }
    }
}
