//! Texter assignments within a campaign

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::query::{Column, OrderTerm, Predicate, SelectQuery};
use super::sqlite_helpers::timestamp_column;

const ASSIGNMENT_TABLE: &str = "assignment";
const ID: Column = Column::new(ASSIGNMENT_TABLE, "id");
const CAMPAIGN_ID: Column = Column::new(ASSIGNMENT_TABLE, "campaign_id");
const USER_ID: Column = Column::new(ASSIGNMENT_TABLE, "user_id");

#[derive(Debug, Clone)]
pub struct AssignmentRecord {
    pub id: i64,
    pub user_id: i64,
    pub campaign_id: i64,
    pub max_contacts: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl sqlx::FromRow<'_, SqliteRow> for AssignmentRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            campaign_id: row.try_get("campaign_id")?,
            max_contacts: row.try_get("max_contacts")?,
            created_at: timestamp_column(row, "created_at")?,
        })
    }
}

/// Contact counts of one assignment, broken down by message status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSummaryRecord {
    pub assignment_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    /// `(message_status, contacts)` in status order; statuses without
    /// contacts are absent
    pub status_counts: Vec<(String, i64)>,
}

impl AssignmentSummaryRecord {
    pub fn contacts_count(&self) -> i64 {
        self.status_counts.iter().map(|(_, n)| n).sum()
    }
}

pub struct AssignmentRepository {
    pool: SqlitePool,
}

impl AssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Assignments of a campaign, optionally only those of one texter
    pub async fn list_for_campaign(
        &self,
        campaign_id: i64,
        texter_id: Option<i64>,
    ) -> Result<Vec<AssignmentRecord>> {
        let mut query = SelectQuery::from(ASSIGNMENT_TABLE)
            .and_where(Predicate::eq(CAMPAIGN_ID, campaign_id))
            .order_by([OrderTerm::asc(ID)]);
        if let Some(texter_id) = texter_id {
            query = query.and_where(Predicate::eq(USER_ID, texter_id));
        }
        Ok(query.to_sql().fetch_all(&self.pool).await?)
    }

    pub async fn summaries(&self, campaign_id: i64) -> Result<Vec<AssignmentSummaryRecord>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, Option<String>, i64)>(
            r#"
            SELECT a.id, a.user_id, u.first_name, u.last_name, cc.message_status, COUNT(cc.id)
            FROM "assignment" a
            JOIN "user" u ON u.id = a.user_id
            LEFT JOIN "campaign_contact" cc ON cc.assignment_id = a.id
            WHERE a.campaign_id = ?
            GROUP BY a.id, a.user_id, u.first_name, u.last_name, cc.message_status
            ORDER BY a.id, cc.message_status
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries: Vec<AssignmentSummaryRecord> = Vec::new();
        for (assignment_id, user_id, first_name, last_name, status, count) in rows {
            if summaries
                .last()
                .is_none_or(|last| last.assignment_id != assignment_id)
            {
                summaries.push(AssignmentSummaryRecord {
                    assignment_id,
                    user_id,
                    first_name,
                    last_name,
                    status_counts: Vec::new(),
                });
            }
            if let (Some(status), Some(summary)) = (status, summaries.last_mut()) {
                summary.status_counts.push((status, count));
            }
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, fixtures};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_filters_by_texter() {
        let db = Database::in_memory().await;
        let org = fixtures::organization(db.pool(), "Org", "{}").await;
        let campaign = fixtures::NewCampaign::new(org, "Assign").insert(db.pool()).await;
        let ann = fixtures::user(db.pool(), "Ann", false).await;
        let bob = fixtures::user(db.pool(), "Bob", false).await;
        fixtures::assignment(db.pool(), ann, campaign).await;
        let bobs = fixtures::assignment(db.pool(), bob, campaign).await;

        let repo = db.assignments();
        assert_eq!(repo.list_for_campaign(campaign, None).await.unwrap().len(), 2);
        let only_bob = repo.list_for_campaign(campaign, Some(bob)).await.unwrap();
        assert_eq!(only_bob.iter().map(|a| a.id).collect::<Vec<_>>(), vec![bobs]);
    }

    #[tokio::test]
    async fn test_summaries_group_by_status() {
        let db = Database::in_memory().await;
        let org = fixtures::organization(db.pool(), "Org", "{}").await;
        let campaign = fixtures::NewCampaign::new(org, "Summaries").insert(db.pool()).await;
        let ann = fixtures::user(db.pool(), "Ann", false).await;
        let bob = fixtures::user(db.pool(), "Bob", false).await;
        let anns = fixtures::assignment(db.pool(), ann, campaign).await;
        let bobs = fixtures::assignment(db.pool(), bob, campaign).await;

        fixtures::contact(db.pool(), campaign, Some(anns), "needsMessage", false).await;
        fixtures::contact(db.pool(), campaign, Some(anns), "needsMessage", false).await;
        fixtures::contact(db.pool(), campaign, Some(anns), "messaged", false).await;

        let summaries = db.assignments().summaries(campaign).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(
            summaries[0].status_counts,
            vec![("messaged".to_string(), 1), ("needsMessage".to_string(), 2)]
        );
        assert_eq!(summaries[0].contacts_count(), 3);
        assert_eq!(summaries[1].assignment_id, bobs);
        assert!(summaries[1].status_counts.is_empty());
    }
}
