use std::str::FromStr;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::PersistedProfile;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStatus {
    #[default]
    Student,
    Working,
    Freelancer,
    Unemployed,
    CareerChange,
}

impl CurrentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrentStatus::Student => "student",
            CurrentStatus::Working => "working",
            CurrentStatus::Freelancer => "freelancer",
            CurrentStatus::Unemployed => "unemployed",
            CurrentStatus::CareerChange => "career_change",
        }
    }

    /// Statuses for which years of experience are asked for.
    pub fn tracks_experience(&self) -> bool {
        matches!(self, CurrentStatus::Working | CurrentStatus::Freelancer)
    }
}

impl FromStr for CurrentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(CurrentStatus::Student),
            "working" => Ok(CurrentStatus::Working),
            "freelancer" => Ok(CurrentStatus::Freelancer),
            "unemployed" => Ok(CurrentStatus::Unemployed),
            "career_change" => Ok(CurrentStatus::CareerChange),
            other => Err(format!("'{other}' is not a valid current_status")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum EducationLevel {
    #[serde(rename = "High School", alias = "HighSchool")]
    HighSchool,
    #[default]
    #[serde(rename = "UG")]
    Undergraduate,
    #[serde(rename = "PG")]
    Postgraduate,
    #[serde(rename = "PhD")]
    Doctorate,
    Diploma,
    Certificate,
}

impl EducationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "High School",
            EducationLevel::Undergraduate => "UG",
            EducationLevel::Postgraduate => "PG",
            EducationLevel::Doctorate => "PhD",
            EducationLevel::Diploma => "Diploma",
            EducationLevel::Certificate => "Certificate",
        }
    }

    pub fn is_degree(&self) -> bool {
        matches!(
            self,
            EducationLevel::Undergraduate | EducationLevel::Postgraduate
        )
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "High School" | "HighSchool" => Ok(EducationLevel::HighSchool),
            "UG" => Ok(EducationLevel::Undergraduate),
            "PG" => Ok(EducationLevel::Postgraduate),
            "PhD" => Ok(EducationLevel::Doctorate),
            "Diploma" => Ok(EducationLevel::Diploma),
            "Certificate" => Ok(EducationLevel::Certificate),
            other => Err(format!("'{other}' is not a valid education_level")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExperienceYears {
    #[serde(rename = "0-1")]
    UpToOne,
    #[serde(rename = "1-3")]
    OneToThree,
    #[serde(rename = "3-5")]
    ThreeToFive,
    #[serde(rename = "5-10")]
    FiveToTen,
    #[serde(rename = "10+")]
    TenPlus,
}

impl ExperienceYears {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceYears::UpToOne => "0-1",
            ExperienceYears::OneToThree => "1-3",
            ExperienceYears::ThreeToFive => "3-5",
            ExperienceYears::FiveToTen => "5-10",
            ExperienceYears::TenPlus => "10+",
        }
    }
}

impl FromStr for ExperienceYears {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0-1" => Ok(ExperienceYears::UpToOne),
            "1-3" => Ok(ExperienceYears::OneToThree),
            "3-5" => Ok(ExperienceYears::ThreeToFive),
            "5-10" => Ok(ExperienceYears::FiveToTen),
            "10+" => Ok(ExperienceYears::TenPlus),
            other => Err(format!("'{other}' is not a valid experience_years bucket")),
        }
    }
}

/// Scalar fields addressable through `set_field`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FullName,
    Bio,
    CurrentStatus,
    EducationLevel,
    EducationDetail,
    #[serde(rename = "college_or_company", alias = "affiliation")]
    Affiliation,
    Gender,
    Dob,
    TargetJob,
    ExperienceYears,
    Industry,
    Location,
    Availability,
    SalaryExpectation,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::FullName => "full_name",
            ProfileField::Bio => "bio",
            ProfileField::CurrentStatus => "current_status",
            ProfileField::EducationLevel => "education_level",
            ProfileField::EducationDetail => "education_detail",
            ProfileField::Affiliation => "college_or_company",
            ProfileField::Gender => "gender",
            ProfileField::Dob => "dob",
            ProfileField::TargetJob => "target_job",
            ProfileField::ExperienceYears => "experience_years",
            ProfileField::Industry => "industry",
            ProfileField::Location => "location",
            ProfileField::Availability => "availability",
            ProfileField::SalaryExpectation => "salary_expectation",
        }
    }
}

impl FromStr for ProfileField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "full_name" => Ok(ProfileField::FullName),
            "bio" => Ok(ProfileField::Bio),
            "current_status" => Ok(ProfileField::CurrentStatus),
            "education_level" => Ok(ProfileField::EducationLevel),
            "education_detail" => Ok(ProfileField::EducationDetail),
            "college_or_company" | "affiliation" => Ok(ProfileField::Affiliation),
            "gender" => Ok(ProfileField::Gender),
            "dob" => Ok(ProfileField::Dob),
            "target_job" => Ok(ProfileField::TargetJob),
            "experience_years" => Ok(ProfileField::ExperienceYears),
            "industry" => Ok(ProfileField::Industry),
            "location" => Ok(ProfileField::Location),
            "availability" => Ok(ProfileField::Availability),
            "salary_expectation" => Ok(ProfileField::SalaryExpectation),
            "skills" => Err("'skills' is edited through the skill operations".to_string()),
            other => Err(format!("Unknown profile field '{other}'")),
        }
    }
}

/// Free-text skill tags in insertion order. Membership is exact-string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    /// Parses a persisted comma-separated list, trimming entries and dropping
    /// empty or repeated ones.
    pub fn from_csv(raw: &str) -> Self {
        let mut set = SkillSet::default();
        for entry in raw.split(',') {
            set.insert(entry);
        }
        set
    }

    pub fn to_csv(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }

    /// Returns false when the trimmed tag is empty or already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        match self.0.iter().position(|t| t == tag) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// An avatar image chosen locally but not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAvatar {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvatarState {
    /// Durable reference from the last load or successful save.
    pub resolved_url: Option<String>,
    pub pending: Option<PendingAvatar>,
    /// Data URI derived from `pending`.
    pub preview_url: Option<String>,
}

impl AvatarState {
    /// Reference to show right now: the local preview wins until it is saved.
    pub fn display_url(&self) -> Option<&str> {
        self.preview_url
            .as_deref()
            .or(self.resolved_url.as_deref())
    }
}

/// The in-progress profile owned by one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDraft {
    pub user_id: Uuid,
    pub full_name: String,
    pub bio: String,
    pub current_status: CurrentStatus,
    pub education_level: EducationLevel,
    pub education_detail: String,
    pub college_or_company: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub target_job: String,
    /// Retained while hidden; see `visible_experience_years`.
    pub experience_years: Option<ExperienceYears>,
    pub industry: String,
    pub location: String,
    pub availability: String,
    pub salary_expectation: String,
    pub skills: SkillSet,
    pub avatar: AvatarState,
}

impl ProfileDraft {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            full_name: String::new(),
            bio: String::new(),
            current_status: CurrentStatus::default(),
            education_level: EducationLevel::default(),
            education_detail: String::new(),
            college_or_company: String::new(),
            gender: String::new(),
            dob: None,
            target_job: String::new(),
            experience_years: None,
            industry: String::new(),
            location: String::new(),
            availability: String::new(),
            salary_expectation: String::new(),
            skills: SkillSet::default(),
            avatar: AvatarState::default(),
        }
    }

    /// Parses `value` for `field` and stores it. An empty value clears the
    /// optional typed fields; the two enum selectors cannot be cleared.
    pub fn set(&mut self, field: ProfileField, value: &str) -> Result<(), String> {
        match field {
            ProfileField::FullName => self.full_name = value.to_string(),
            ProfileField::Bio => self.bio = value.to_string(),
            ProfileField::CurrentStatus => self.current_status = value.parse()?,
            ProfileField::EducationLevel => self.education_level = value.parse()?,
            ProfileField::EducationDetail => self.education_detail = value.to_string(),
            ProfileField::Affiliation => self.college_or_company = value.to_string(),
            ProfileField::Gender => self.gender = value.to_string(),
            ProfileField::Dob => self.dob = parse_optional(value, parse_dob)?,
            ProfileField::TargetJob => self.target_job = value.to_string(),
            ProfileField::ExperienceYears => {
                self.experience_years = parse_optional(value, |v| v.parse())?
            }
            ProfileField::Industry => self.industry = value.to_string(),
            ProfileField::Location => self.location = value.to_string(),
            ProfileField::Availability => self.availability = value.to_string(),
            ProfileField::SalaryExpectation => self.salary_expectation = value.to_string(),
        }
        Ok(())
    }

    /// Experience bucket as it may be shown or submitted for the current status.
    pub fn visible_experience_years(&self) -> Option<ExperienceYears> {
        self.experience_years
            .filter(|_| self.current_status.tracks_experience())
    }

    /// Overwrites every field from a persisted record. Absent, empty, or
    /// unparsable values fall back to the defaults of a fresh draft.
    pub fn overwrite_from(&mut self, record: &PersistedProfile) {
        let defaults = ProfileDraft::new(self.user_id);

        self.full_name = text_or_empty(&record.full_name);
        self.bio = text_or_empty(&record.bio);
        self.current_status =
            parse_lenient("current_status", &record.current_status, defaults.current_status);
        self.education_level =
            parse_lenient("education_level", &record.education_level, defaults.education_level);
        self.education_detail = text_or_empty(&record.education_detail);
        self.college_or_company = text_or_empty(&record.college_or_company);
        self.gender = text_or_empty(&record.gender);
        self.dob = record.dob;
        self.target_job = text_or_empty(&record.target_job);
        self.experience_years = record
            .experience_years
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| match v.parse() {
                Ok(years) => Some(years),
                Err(e) => {
                    tracing::warn!("Ignoring persisted experience_years: {e}");
                    None
                }
            });
        self.industry = text_or_empty(&record.industry);
        self.location = text_or_empty(&record.location);
        self.availability = text_or_empty(&record.availability);
        self.salary_expectation = text_or_empty(&record.salary_expectation);
        self.skills = record
            .skills
            .as_deref()
            .map(SkillSet::from_csv)
            .unwrap_or_default();
        self.avatar = AvatarState {
            resolved_url: record.avatar_url.clone().filter(|u| !u.trim().is_empty()),
            pending: None,
            preview_url: None,
        };
    }

    /// Builds the record submitted to the store. Hidden experience years are
    /// left out, and `avatar_url` is the resolved reference.
    pub fn to_record(&self) -> PersistedProfile {
        PersistedProfile {
            id: self.user_id,
            full_name: Some(self.full_name.clone()),
            bio: Some(self.bio.clone()),
            current_status: Some(self.current_status.as_str().to_string()),
            education_level: Some(self.education_level.as_str().to_string()),
            education_detail: Some(self.education_detail.clone()),
            college_or_company: Some(self.college_or_company.clone()),
            gender: Some(self.gender.clone()),
            dob: self.dob,
            target_job: Some(self.target_job.clone()),
            experience_years: self
                .visible_experience_years()
                .map(|y| y.as_str().to_string()),
            industry: Some(self.industry.clone()),
            skills: Some(self.skills.to_csv()),
            location: Some(self.location.clone()),
            availability: Some(self.availability.clone()),
            salary_expectation: Some(self.salary_expectation.clone()),
            avatar_url: self.avatar.resolved_url.clone(),
        }
    }
}

fn parse_dob(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a valid dob (expected YYYY-MM-DD)"))
}

fn parse_optional<T>(
    value: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, String> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn parse_lenient<T: FromStr<Err = String>>(field: &str, value: &Option<String>, default: T) -> T {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default {field}: {e}");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_csv_trims_and_drops_empty_entries() {
        let skills = SkillSet::from_csv(" Rust, ,SQL,,  Python ,Rust");
        assert_eq!(skills.iter().collect::<Vec<_>>(), vec!["Rust", "SQL", "Python"]);
        assert_eq!(skills.to_csv(), "Rust,SQL,Python");
    }

    #[test]
    fn test_skill_membership_is_case_sensitive() {
        let mut skills = SkillSet::default();
        assert!(skills.insert("rust"));
        assert!(skills.insert("Rust"));
        assert!(!skills.insert(" rust "));
        assert_eq!(skills.iter().count(), 2);
    }

    #[test]
    fn test_remove_missing_skill_is_noop() {
        let mut skills = SkillSet::from_csv("Go");
        assert!(!skills.remove("go"));
        assert_eq!(skills.iter().count(), 1);
    }

    #[test]
    fn test_unknown_field_name_rejected() {
        assert!("favourite_color".parse::<ProfileField>().is_err());
        assert!("skills".parse::<ProfileField>().is_err());
        assert_eq!(
            "affiliation".parse::<ProfileField>(),
            Ok(ProfileField::Affiliation)
        );
    }

    #[test]
    fn test_education_level_accepts_both_high_school_spellings() {
        assert_eq!("High School".parse(), Ok(EducationLevel::HighSchool));
        assert_eq!("HighSchool".parse(), Ok(EducationLevel::HighSchool));
        assert!("Bootcamp".parse::<EducationLevel>().is_err());
    }

    #[test]
    fn test_set_rejects_invalid_enum_and_date() {
        let mut draft = ProfileDraft::new(Uuid::new_v4());
        assert!(draft.set(ProfileField::CurrentStatus, "retired").is_err());
        assert!(draft.set(ProfileField::CurrentStatus, "").is_err());
        assert!(draft.set(ProfileField::Dob, "31/12/1999").is_err());
        assert!(draft.set(ProfileField::ExperienceYears, "2-4").is_err());
        assert_eq!(draft.current_status, CurrentStatus::Student);
    }

    #[test]
    fn test_set_empty_clears_optional_typed_fields() {
        let mut draft = ProfileDraft::new(Uuid::new_v4());
        draft.set(ProfileField::Dob, "1999-12-31").unwrap();
        draft.set(ProfileField::ExperienceYears, "3-5").unwrap();
        draft.set(ProfileField::Dob, "  ").unwrap();
        draft.set(ProfileField::ExperienceYears, "").unwrap();
        assert_eq!(draft.dob, None);
        assert_eq!(draft.experience_years, None);
    }

    #[test]
    fn test_overwrite_falls_back_to_defaults() {
        let user_id = Uuid::new_v4();
        let mut draft = ProfileDraft::new(user_id);
        draft.set(ProfileField::CurrentStatus, "working").unwrap();
        draft.set(ProfileField::Location, "Berlin").unwrap();

        let record = PersistedProfile {
            full_name: Some("Ada".to_string()),
            current_status: Some("astronaut".to_string()),
            education_level: Some(String::new()),
            skills: Some("Rust, SQL".to_string()),
            ..PersistedProfile::new(user_id)
        };
        draft.overwrite_from(&record);

        assert_eq!(draft.full_name, "Ada");
        assert_eq!(draft.current_status, CurrentStatus::Student);
        assert_eq!(draft.education_level, EducationLevel::Undergraduate);
        assert_eq!(draft.location, "");
        assert_eq!(draft.skills.to_csv(), "Rust,SQL");
    }

    #[test]
    fn test_record_omits_hidden_experience_years() {
        let mut draft = ProfileDraft::new(Uuid::new_v4());
        draft.set(ProfileField::CurrentStatus, "freelancer").unwrap();
        draft.set(ProfileField::ExperienceYears, "10+").unwrap();
        assert_eq!(draft.to_record().experience_years.as_deref(), Some("10+"));

        draft.set(ProfileField::CurrentStatus, "unemployed").unwrap();
        assert_eq!(draft.to_record().experience_years, None);
        assert_eq!(draft.experience_years, Some(ExperienceYears::TenPlus));
    }
}
