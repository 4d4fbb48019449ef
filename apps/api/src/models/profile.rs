use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of the `profiles` table. Every column except `id` is nullable; the
/// engine falls back to draft defaults for anything absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PersistedProfile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub current_status: Option<String>,
    pub education_level: Option<String>,
    pub education_detail: Option<String>,
    pub college_or_company: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub target_job: Option<String>,
    pub experience_years: Option<String>,
    pub industry: Option<String>,
    /// Comma-separated skill tags.
    pub skills: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
    pub salary_expectation: Option<String>,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
impl PersistedProfile {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
