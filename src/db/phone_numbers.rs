//! Owned phone number inventory

use anyhow::Result;
use sqlx::SqlitePool;

/// Numbers allocated to a campaign within one area code
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AreaCodeCount {
    pub area_code: String,
    pub count: i64,
}

pub struct PhoneNumberRepository {
    pool: SqlitePool,
}

impl PhoneNumberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count_by_area_code(&self, campaign_id: i64) -> Result<Vec<AreaCodeCount>> {
        let counts = sqlx::query_as::<_, AreaCodeCount>(
            r#"
            SELECT area_code, COUNT(*) AS count
            FROM "owned_phone_number"
            WHERE allocated_to = 'campaign' AND allocated_to_id = ?
            GROUP BY area_code
            ORDER BY area_code
            "#,
        )
        .bind(campaign_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}
