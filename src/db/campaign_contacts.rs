//! Campaign contact lookups: listings, counts and existence checks

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::query::{Column, OrderTerm, Predicate, SelectQuery};
use super::sqlite_helpers::{from_json, timestamp_column};

const CONTACT_TABLE: &str = "campaign_contact";
const ID: Column = Column::new(CONTACT_TABLE, "id");
const CAMPAIGN_ID: Column = Column::new(CONTACT_TABLE, "campaign_id");

#[derive(Debug, Clone)]
pub struct CampaignContactRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub assignment_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub zip: String,
    /// Raw JSON object text
    pub custom_fields: String,
    pub message_status: String,
    pub is_opted_out: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl sqlx::FromRow<'_, SqliteRow> for CampaignContactRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            campaign_id: row.try_get("campaign_id")?,
            assignment_id: row.try_get("assignment_id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            cell: row.try_get("cell")?,
            zip: row.try_get("zip")?,
            custom_fields: row.try_get("custom_fields")?,
            message_status: row.try_get("message_status")?,
            is_opted_out: row.try_get("is_opted_out")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

pub struct CampaignContactRepository {
    pool: SqlitePool,
}

impl CampaignContactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Contacts of a campaign in id order, optionally capped
    pub async fn list_for_campaign(
        &self,
        campaign_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<CampaignContactRecord>> {
        let mut query = SelectQuery::from(CONTACT_TABLE)
            .and_where(Predicate::eq(CAMPAIGN_ID, campaign_id))
            .order_by([OrderTerm::asc(ID)]);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        Ok(query.to_sql().fetch_all(&self.pool).await?)
    }

    pub async fn count_for_campaign(&self, campaign_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM "campaign_contact" WHERE campaign_id = ?"#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn opt_outs_count(&self, campaign_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM "campaign_contact" WHERE campaign_id = ? AND is_opted_out = 1"#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Whether any contact of the campaign has no assignment yet
    pub async fn has_unassigned(&self, campaign_id: i64) -> Result<bool> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"SELECT id FROM "campaign_contact"
               WHERE campaign_id = ? AND assignment_id IS NULL
               LIMIT 1"#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(!rows.is_empty())
    }

    /// Whether any reachable contact is still waiting for its first message
    pub async fn has_unsent_initial_messages(&self, campaign_id: i64) -> Result<bool> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"SELECT id FROM "campaign_contact"
               WHERE campaign_id = ? AND message_status = 'needsMessage' AND is_opted_out = 0
               LIMIT 1"#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(!rows.is_empty())
    }

    /// Custom field names, taken from the campaign's first contact
    pub async fn custom_field_keys(&self, campaign_id: i64) -> Result<Vec<String>> {
        let raw: Option<String> = sqlx::query_scalar(
            r#"SELECT custom_fields FROM "campaign_contact"
               WHERE campaign_id = ?
               ORDER BY id
               LIMIT 1"#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(Vec::new());
        };
        let fields: serde_json::Map<String, serde_json::Value> = from_json(&raw)?;
        Ok(fields.keys().cloned().collect())
    }
}
