//! Campaign script tree (interaction steps)

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

#[derive(Debug, Clone)]
pub struct InteractionStepRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub question: String,
    pub script: String,
    pub answer_option: String,
    pub answer_actions: String,
    pub parent_interaction_id: Option<i64>,
}

impl sqlx::FromRow<'_, SqliteRow> for InteractionStepRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            campaign_id: row.try_get("campaign_id")?,
            question: row.try_get("question")?,
            script: row.try_get("script")?,
            answer_option: row.try_get("answer_option")?,
            answer_actions: row.try_get("answer_actions")?,
            parent_interaction_id: row.try_get("parent_interaction_id")?,
        })
    }
}

pub struct InteractionStepRepository {
    pool: SqlitePool,
}

impl InteractionStepRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Live steps of a campaign, parents before children
    pub async fn list_for_campaign(&self, campaign_id: i64) -> Result<Vec<InteractionStepRecord>> {
        let steps = sqlx::query_as::<_, InteractionStepRecord>(
            r#"
            SELECT * FROM "interaction_step"
            WHERE campaign_id = ? AND is_deleted = 0
            ORDER BY parent_interaction_id IS NOT NULL, id
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(steps)
    }
}
