//! Database connection and repositories

pub mod assignments;
pub mod background_jobs;
pub mod campaign_contacts;
pub mod campaigns;
pub mod canned_responses;
pub mod interaction_steps;
pub mod messages;
pub mod organizations;
pub mod phone_numbers;
pub mod query;
pub mod schema;
pub mod sqlite_helpers;
pub mod users;

#[cfg(test)]
pub mod fixtures;

use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub use assignments::{AssignmentRecord, AssignmentRepository, AssignmentSummaryRecord};
pub use background_jobs::{BackgroundJobRecord, BackgroundJobRepository, JobType};
pub use campaign_contacts::{CampaignContactRecord, CampaignContactRepository};
pub use campaigns::{
    CampaignQueryResult, CampaignRecord, CampaignRepository, CampaignsFilter, Cursor, PageInfo,
    SortKey,
};
pub use canned_responses::{CannedResponseRecord, CannedResponseRepository};
pub use interaction_steps::{InteractionStepRecord, InteractionStepRepository};
pub use messages::MessageRepository;
pub use organizations::{OrganizationRecord, OrganizationRepository};
pub use phone_numbers::{AreaCodeCount, PhoneNumberRepository};
pub use users::{UserRecord, UserRepository};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(sqlite_helpers::connect_options(url)?)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new database connection pool, retrying every `retry_interval`
    /// until it succeeds
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        retry_interval: Duration,
    ) -> Self {
        loop {
            match Self::connect(url, max_connections).await {
                Ok(db) => return db,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = retry_interval.as_secs(),
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create any missing tables
    pub async fn bootstrap(&self) -> Result<()> {
        schema::bootstrap_schema(&self.pool).await?;
        Ok(())
    }

    pub fn campaigns(&self) -> CampaignRepository {
        CampaignRepository::new(self.pool.clone())
    }

    pub fn campaign_contacts(&self) -> CampaignContactRepository {
        CampaignContactRepository::new(self.pool.clone())
    }

    pub fn assignments(&self) -> AssignmentRepository {
        AssignmentRepository::new(self.pool.clone())
    }

    pub fn messages(&self) -> MessageRepository {
        MessageRepository::new(self.pool.clone())
    }

    pub fn organizations(&self) -> OrganizationRepository {
        OrganizationRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn background_jobs(&self) -> BackgroundJobRepository {
        BackgroundJobRepository::new(self.pool.clone())
    }

    pub fn interaction_steps(&self) -> InteractionStepRepository {
        InteractionStepRepository::new(self.pool.clone())
    }

    pub fn canned_responses(&self) -> CannedResponseRepository {
        CannedResponseRepository::new(self.pool.clone())
    }

    pub fn phone_numbers(&self) -> PhoneNumberRepository {
        PhoneNumberRepository::new(self.pool.clone())
    }

    /// Single-connection in-memory database with the schema bootstrapped.
    ///
    /// One connection keeps every query on the same `:memory:` database.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let db = Self::connect("sqlite::memory:", 1)
            .await
            .expect("open in-memory sqlite");
        db.bootstrap().await.expect("bootstrap schema");
        db
    }
}
