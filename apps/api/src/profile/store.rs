use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::profile::PersistedProfile;

/// Persistence boundary for profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_by_id(&self, user_id: Uuid) -> Result<Option<PersistedProfile>>;

    async fn upsert(&self, user_id: Uuid, record: &PersistedProfile) -> Result<()>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load_by_id(&self, user_id: Uuid) -> Result<Option<PersistedProfile>> {
        Ok(sqlx::query_as::<_, PersistedProfile>(
            r#"
            SELECT id, full_name, bio, current_status, education_level, education_detail,
                   college_or_company, gender, dob, target_job, experience_years, industry,
                   skills, location, availability, salary_expectation, avatar_url
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert(&self, user_id: Uuid, record: &PersistedProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, full_name, bio, current_status, education_level, education_detail,
                 college_or_company, gender, dob, target_job, experience_years, industry,
                 skills, location, availability, salary_expectation, avatar_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                bio = EXCLUDED.bio,
                current_status = EXCLUDED.current_status,
                education_level = EXCLUDED.education_level,
                education_detail = EXCLUDED.education_detail,
                college_or_company = EXCLUDED.college_or_company,
                gender = EXCLUDED.gender,
                dob = EXCLUDED.dob,
                target_job = EXCLUDED.target_job,
                experience_years = EXCLUDED.experience_years,
                industry = EXCLUDED.industry,
                skills = EXCLUDED.skills,
                location = EXCLUDED.location,
                availability = EXCLUDED.availability,
                salary_expectation = EXCLUDED.salary_expectation,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(&record.full_name)
        .bind(&record.bio)
        .bind(&record.current_status)
        .bind(&record.education_level)
        .bind(&record.education_detail)
        .bind(&record.college_or_company)
        .bind(&record.gender)
        .bind(record.dob)
        .bind(&record.target_job)
        .bind(&record.experience_years)
        .bind(&record.industry)
        .bind(&record.skills)
        .bind(&record.location)
        .bind(&record.availability)
        .bind(&record.salary_expectation)
        .bind(&record.avatar_url)
        .execute(&self.pool)
        .await?;

        info!("Upserted profile for user {user_id}");
        Ok(())
    }
}
