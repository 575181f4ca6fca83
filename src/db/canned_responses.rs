//! Canned responses: campaign-wide, or owned by one texter

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

#[derive(Debug, Clone)]
pub struct CannedResponseRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub text: String,
}

impl sqlx::FromRow<'_, SqliteRow> for CannedResponseRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            campaign_id: row.try_get("campaign_id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            text: row.try_get("text")?,
        })
    }
}

pub struct CannedResponseRepository {
    pool: SqlitePool,
}

impl CannedResponseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Responses of one texter when `user_id` is given, otherwise the
    /// campaign-wide ones (no owner)
    pub async fn list_for_campaign(
        &self,
        campaign_id: i64,
        user_id: Option<i64>,
    ) -> Result<Vec<CannedResponseRecord>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, CannedResponseRecord>(
                    r#"SELECT * FROM "canned_response" WHERE campaign_id = ? AND user_id = ? ORDER BY id"#,
                )
                .bind(campaign_id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CannedResponseRecord>(
                    r#"SELECT * FROM "canned_response" WHERE campaign_id = ? AND user_id IS NULL ORDER BY id"#,
                )
                .bind(campaign_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}
