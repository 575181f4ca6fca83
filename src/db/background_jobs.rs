//! Background job status lookups
//!
//! Jobs are run elsewhere; this service only reports the latest job of a
//! given type for a campaign.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::sqlite_helpers::timestamp_column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    UploadContacts,
    StartCampaign,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::UploadContacts => "upload_contacts",
            JobType::StartCampaign => "start_campaign",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJobRecord {
    pub id: i64,
    pub campaign_id: Option<i64>,
    pub job_type: String,
    pub status: String,
    pub result_message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl sqlx::FromRow<'_, SqliteRow> for BackgroundJobRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            campaign_id: row.try_get("campaign_id")?,
            job_type: row.try_get("job_type")?,
            status: row.try_get("status")?,
            result_message: row.try_get("result_message")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

pub struct BackgroundJobRepository {
    pool: SqlitePool,
}

impl BackgroundJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent job of `job_type` for the campaign
    pub async fn latest_for_campaign(
        &self,
        job_type: JobType,
        campaign_id: i64,
    ) -> Result<Option<BackgroundJobRecord>> {
        let job = sqlx::query_as::<_, BackgroundJobRecord>(
            r#"
            SELECT * FROM "background_job"
            WHERE job_type = ? AND campaign_id = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(job_type.as_str())
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }
}
