//! Message counts for campaign statistics

use anyhow::Result;
use sqlx::SqlitePool;

pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Messages on the campaign's assignments, by direction
    pub async fn count_for_campaign(&self, campaign_id: i64, from_contact: bool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(m.id)
            FROM "assignment" a
            JOIN "message" m ON m.assignment_id = a.id
            WHERE a.campaign_id = ? AND m.is_from_contact = ?
            "#,
        )
        .bind(campaign_id)
        .bind(from_contact)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, fixtures};

    #[tokio::test]
    async fn test_counts_split_by_direction() {
        let db = Database::in_memory().await;
        let org = fixtures::organization(db.pool(), "Org", "{}").await;
        let campaign = fixtures::NewCampaign::new(org, "Stats").insert(db.pool()).await;
        let other = fixtures::NewCampaign::new(org, "Other").insert(db.pool()).await;
        let texter = fixtures::user(db.pool(), "Tex", false).await;
        let assignment = fixtures::assignment(db.pool(), texter, campaign).await;
        let elsewhere = fixtures::assignment(db.pool(), texter, other).await;

        fixtures::message(db.pool(), assignment, false).await;
        fixtures::message(db.pool(), assignment, false).await;
        fixtures::message(db.pool(), assignment, true).await;
        fixtures::message(db.pool(), elsewhere, true).await;

        let repo = db.messages();
        assert_eq!(repo.count_for_campaign(campaign, false).await.unwrap(), 2);
        assert_eq!(repo.count_for_campaign(campaign, true).await.unwrap(), 1);
    }
}
