//! Users repository for authorization and campaign rosters

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::query::{Column, OrderTerm, Predicate, SelectQuery, SqlValue};
use super::sqlite_helpers::timestamp_column;

const USER_TABLE: &str = "user";
const ID: Column = Column::new(USER_TABLE, "id");

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub cell: String,
    pub email: String,
    pub is_superadmin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl sqlx::FromRow<'_, SqliteRow> for UserRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            cell: row.try_get("cell")?,
            email: row.try_get("email")?,
            is_superadmin: row.try_get("is_superadmin")?,
            created_at: timestamp_column(row, "created_at")?,
        })
    }
}

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch every user in `ids`, in id order; missing ids are skipped
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<UserRecord>> {
        let query = SelectQuery::from(USER_TABLE)
            .and_where(Predicate::In(
                ID.into(),
                ids.iter().copied().map(SqlValue::Int).collect(),
            ))
            .order_by([OrderTerm::asc(ID)])
            .to_sql();
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Users holding at least one assignment in the campaign
    pub async fn texters_for_campaign(&self, campaign_id: i64) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT DISTINCT u.*
            FROM "user" u
            JOIN "assignment" a ON a.user_id = u.id
            WHERE a.campaign_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Role names the user holds in an organization
    pub async fn roles_in_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> Result<Vec<String>> {
        let roles: Vec<String> = sqlx::query_scalar(
            r#"SELECT role FROM "user_organization" WHERE user_id = ? AND organization_id = ?"#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}
