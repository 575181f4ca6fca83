//! Organizations and organization features

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::query::{Column, Predicate, SelectQuery, SqlValue};
use super::sqlite_helpers::{from_json, json_truthy, timestamp_column};

const ORGANIZATION_TABLE: &str = "organization";
const ID: Column = Column::new(ORGANIZATION_TABLE, "id");

#[derive(Debug, Clone)]
pub struct OrganizationRecord {
    pub id: i64,
    pub name: String,
    /// Feature flags, a JSON object
    pub features: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrganizationRecord {
    /// Whether a feature flag is set to a truthy value
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.features.get(name).is_some_and(json_truthy)
    }
}

impl sqlx::FromRow<'_, SqliteRow> for OrganizationRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let features: Option<String> = row.try_get("features")?;
        let features = match features.as_deref().map(str::trim) {
            None | Some("") => serde_json::Value::Object(Default::default()),
            Some(raw) => from_json(raw).map_err(|e| sqlx::Error::ColumnDecode {
                index: "features".to_string(),
                source: e.into(),
            })?,
        };

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            features,
            created_at: timestamp_column(row, "created_at")?,
        })
    }
}

pub struct OrganizationRepository {
    pool: SqlitePool,
}

impl OrganizationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch every organization in `ids`; missing ids are skipped
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<OrganizationRecord>> {
        let query = SelectQuery::from(ORGANIZATION_TABLE)
            .and_where(Predicate::In(
                ID.into(),
                ids.iter().copied().map(SqlValue::Int).collect(),
            ))
            .to_sql();
        Ok(query.fetch_all(&self.pool).await?)
    }
}
