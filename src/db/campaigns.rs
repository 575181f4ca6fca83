//! Campaign read queries
//!
//! Listing is organization scoped. A [CampaignsFilter] adds conjunctive
//! predicates, a [SortKey] picks the ORDER BY (and any computed column it
//! needs), and an optional [Cursor] switches the result to a page with a
//! total count.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;

use super::query::{Column, Expr, OrderTerm, Predicate, SelectQuery, SqlValue};
use super::sqlite_helpers::timestamp_column;

pub const CAMPAIGN_TABLE: &str = "campaign";

const ID: Column = Column::new(CAMPAIGN_TABLE, "id");
const ORGANIZATION_ID: Column = Column::new(CAMPAIGN_TABLE, "organization_id");
const TITLE: Column = Column::new(CAMPAIGN_TABLE, "title");
const STATUS: Column = Column::new(CAMPAIGN_TABLE, "status");
const DUE_BY: Column = Column::new(CAMPAIGN_TABLE, "due_by");

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone)]
pub struct CampaignRecord {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub description: String,
    pub is_started: bool,
    pub is_archived: bool,
    pub use_dynamic_assignment: bool,
    pub due_by: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub intro_html: Option<String>,
    pub primary_color: Option<String>,
    pub logo_image_url: Option<String>,
    pub override_organization_texting_hours: bool,
    pub texting_hours_enforced: bool,
    pub texting_hours_start: i64,
    pub texting_hours_end: i64,
    pub timezone: Option<String>,
    pub creator_id: Option<i64>,
    pub join_token: Option<String>,
    pub status: Option<String>,
    pub shifting_configuration: Option<String>,
    pub contact_file_name: Option<String>,
}

impl sqlx::FromRow<'_, SqliteRow> for CampaignRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let title: Option<String> = row.try_get("title")?;
        let description: Option<String> = row.try_get("description")?;

        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            title: title.unwrap_or_default(),
            description: description.unwrap_or_default(),
            is_started: row.try_get("is_started")?,
            is_archived: row.try_get("is_archived")?,
            use_dynamic_assignment: row.try_get("use_dynamic_assignment")?,
            due_by: timestamp_column(row, "due_by")?,
            created_at: timestamp_column(row, "created_at")?,
            started_at: timestamp_column(row, "started_at")?,
            intro_html: row.try_get("intro_html")?,
            primary_color: row.try_get("primary_color")?,
            logo_image_url: row.try_get("logo_image_url")?,
            override_organization_texting_hours: row
                .try_get("override_organization_texting_hours")?,
            texting_hours_enforced: row.try_get("texting_hours_enforced")?,
            texting_hours_start: row.try_get("texting_hours_start")?,
            texting_hours_end: row.try_get("texting_hours_end")?,
            timezone: row.try_get("timezone")?,
            creator_id: row.try_get("creator_id")?,
            join_token: row.try_get("join_token")?,
            status: row.try_get("status")?,
            shifting_configuration: row.try_get("shifting_configuration")?,
            contact_file_name: row.try_get("contact_file_name")?,
        })
    }
}

// ============================================================================
// Filter, sort and paging inputs
// ============================================================================

/// Campaign list filter. Ids arrive already parsed; input validation happens
/// where the GraphQL input is converted.
#[derive(Debug, Clone, Default)]
pub struct CampaignsFilter {
    pub status: Option<String>,
    pub campaign_id: Option<i64>,
    pub campaign_ids: Option<Vec<i64>>,
    pub search_string: Option<String>,
    pub list_size: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    DueDateAsc,
    DueDateDesc,
    Title,
    IdDesc,
    #[default]
    IdAsc,
}

impl SortKey {
    pub fn order_terms(self) -> Vec<OrderTerm> {
        match self {
            SortKey::DueDateAsc => vec![
                OrderTerm::asc(Expr::Timestamp(DUE_BY)),
                OrderTerm::asc(ID),
            ],
            SortKey::DueDateDesc => vec![
                OrderTerm::desc(Expr::Timestamp(DUE_BY)),
                OrderTerm::asc(ID),
            ],
            SortKey::Title => vec![OrderTerm::natural(Expr::Unicase(TITLE))],
            SortKey::IdDesc => vec![OrderTerm::desc(ID)],
            SortKey::IdAsc => vec![OrderTerm::asc(ID)],
        }
    }

    /// Computed column the ORDER BY refers to, if any.
    pub fn extra_select(self) -> Option<Expr> {
        match self {
            SortKey::Title => Some(Expr::Lower(TITLE)),
            SortKey::DueDateAsc | SortKey::DueDateDesc | SortKey::IdDesc | SortKey::IdAsc => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    /// Rows matching the filter, ignoring limit and offset
    pub total: i64,
}

/// Either every matching campaign, or one page of them with its metadata.
#[derive(Debug, Clone)]
pub enum CampaignQueryResult {
    List(Vec<CampaignRecord>),
    Page {
        campaigns: Vec<CampaignRecord>,
        page_info: PageInfo,
    },
}

// ============================================================================
// Query composition
// ============================================================================

/// AND the filter's predicates (and its list paging) onto `query`.
pub fn apply_campaigns_filter(mut query: SelectQuery, filter: Option<&CampaignsFilter>) -> SelectQuery {
    let Some(filter) = filter else {
        return query;
    };

    if let Some(status) = &filter.status {
        query = query.and_where(Predicate::eq(STATUS, status.as_str()));
    }

    // A single id wins over the id list
    if let Some(id) = filter.campaign_id {
        query = query.and_where(Predicate::eq(ID, id));
    } else if let Some(ids) = filter.campaign_ids.as_ref().filter(|ids| !ids.is_empty()) {
        query = query.and_where(Predicate::In(
            ID.into(),
            ids.iter().copied().map(SqlValue::Int).collect(),
        ));
    }

    if let Some(term) = filter.search_string.as_deref().filter(|s| !s.is_empty()) {
        query = query.and_where(Predicate::contains_ignore_case(TITLE, term));
    }

    let list_size = filter.list_size.filter(|n| *n > 0);
    let page_size = filter.page_size.filter(|n| *n > 0);
    match (list_size, page_size) {
        (Some(limit), None) => query = query.limit(limit),
        (Some(limit), Some(offset)) => query = query.limit(limit).offset(offset),
        (None, _) => {}
    }

    query
}

/// Organization-scoped campaign query with the filter applied.
pub fn build_campaign_query(
    query: SelectQuery,
    organization_id: i64,
    filter: Option<&CampaignsFilter>,
) -> SelectQuery {
    let query = query.and_where(Predicate::eq(ORGANIZATION_ID, organization_id));
    apply_campaigns_filter(query, filter)
}

fn select_clause(sort_by: SortKey) -> SelectQuery {
    let query = SelectQuery::from(CAMPAIGN_TABLE);
    match sort_by.extra_select() {
        Some(expr) => query.select_extra(expr),
        None => query,
    }
}

// ============================================================================
// Repository
// ============================================================================

pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List campaigns of an organization.
    ///
    /// With a cursor the cursor's limit and offset replace any list paging
    /// from the filter, and the total is counted with the same predicates.
    pub async fn get_campaigns(
        &self,
        organization_id: i64,
        cursor: Option<Cursor>,
        filter: Option<&CampaignsFilter>,
        sort_by: Option<SortKey>,
    ) -> Result<CampaignQueryResult> {
        let sort_by = sort_by.unwrap_or_default();
        let query = build_campaign_query(select_clause(sort_by), organization_id, filter)
            .order_by(sort_by.order_terms());

        let Some(cursor) = cursor else {
            let campaigns = query.to_sql().fetch_all(&self.pool).await?;
            return Ok(CampaignQueryResult::List(campaigns));
        };

        let rows = query.clone().limit(cursor.limit).offset(cursor.offset).to_sql();
        let count = query.to_count_sql();
        let (campaigns, total) =
            tokio::try_join!(rows.fetch_all(&self.pool), count.fetch_count(&self.pool))?;

        Ok(CampaignQueryResult::Page {
            campaigns,
            page_info: PageInfo {
                limit: cursor.limit,
                offset: cursor.offset,
                total,
            },
        })
    }

    /// Get a campaign by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<CampaignRecord>> {
        let query = SelectQuery::from(CAMPAIGN_TABLE)
            .and_where(Predicate::eq(ID, id))
            .limit(1)
            .to_sql();
        let mut rows: Vec<CampaignRecord> = query.fetch_all(&self.pool).await?;
        Ok(rows.pop())
    }
}
