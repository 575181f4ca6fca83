//! Typed SQL SELECT builder
//!
//! Column references, computed expressions, predicates and ORDER BY terms are
//! values of closed types, so every fragment that reaches the SQL string comes
//! from this module. Caller input only ever travels as a bound parameter.

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool};

use super::sqlite_helpers::UNICASE;

/// A fully qualified column reference, rendered as `"table"."column"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub table: &'static str,
    pub name: &'static str,
}

impl Column {
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self { table, name }
    }

    pub fn to_sql(&self) -> String {
        format!("\"{}\".\"{}\"", self.table, self.name)
    }
}

/// A column or a normalized expression over one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    Column(Column),
    /// `lower(column)`; folds ASCII only
    Lower(Column),
    /// The column under the Unicode case-folding collation, for ordering
    Unicase(Column),
    /// A timestamp column as a julian day number, whether it holds epoch
    /// millis or date text. Blank text is NULL.
    Timestamp(Column),
}

impl Expr {
    pub fn to_sql(&self) -> String {
        match self {
            Expr::Column(c) => c.to_sql(),
            Expr::Lower(c) => format!("lower({})", c.to_sql()),
            Expr::Unicase(c) => format!("{} COLLATE {}", c.to_sql(), UNICASE),
            Expr::Timestamp(c) => {
                let c = c.to_sql();
                format!(
                    "(CASE WHEN typeof({c}) IN ('integer', 'real') THEN {c} / 86400000.0 + 2440587.5 \
                     WHEN trim({c}) = '' THEN NULL \
                     WHEN {c} NOT GLOB '*[^0-9]*' THEN CAST({c} AS INTEGER) / 86400000.0 + 2440587.5 \
                     ELSE julianday({c}) END)"
                )
            }
        }
    }
}

impl From<Column> for Expr {
    fn from(c: Column) -> Self {
        Expr::Column(c)
    }
}

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

impl SqlValue {
    /// Bind this value to a sqlx query
    pub fn bind_to_query<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Null => query.bind(None::<String>),
        }
    }

    /// Bind this value to a scalar query (COUNT etc.)
    pub fn bind_to_scalar<'q, O>(
        &'q self,
        query: sqlx::query::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> sqlx::query::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>> {
        match self {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

/// A WHERE condition. Conditions on one query are joined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Expr, SqlValue),
    In(Expr, Vec<SqlValue>),
    /// `expr REGEXP pattern`; the pattern is bound, never inlined
    Matches(Expr, String),
}

impl Predicate {
    pub fn eq(expr: impl Into<Expr>, value: impl Into<SqlValue>) -> Self {
        Predicate::Eq(expr.into(), value.into())
    }

    /// Case-insensitive substring match, folding the full Unicode range
    pub fn contains_ignore_case(expr: impl Into<Expr>, term: &str) -> Self {
        Predicate::Matches(expr.into(), format!("(?i){}", regex::escape(term)))
    }

    fn render(&self, next_param: &mut usize, values: &mut Vec<SqlValue>) -> String {
        let mut placeholder = |value: SqlValue| {
            *next_param += 1;
            values.push(value);
            format!("?{}", next_param)
        };

        match self {
            Predicate::Eq(expr, value) => {
                format!("{} = {}", expr.to_sql(), placeholder(value.clone()))
            }
            Predicate::In(_, list) if list.is_empty() => "1=0".to_string(),
            Predicate::In(expr, list) => {
                let placeholders: Vec<String> =
                    list.iter().map(|v| placeholder(v.clone())).collect();
                format!("{} IN ({})", expr.to_sql(), placeholders.join(", "))
            }
            Predicate::Matches(expr, pattern) => {
                format!(
                    "{} REGEXP {}",
                    expr.to_sql(),
                    placeholder(SqlValue::Text(pattern.clone()))
                )
            }
        }
    }
}

/// Sort direction for ORDER BY clauses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY term. `direction: None` leaves the database default (ascending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
}

impl OrderTerm {
    pub fn asc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: Some(OrderDirection::Asc),
        }
    }

    pub fn desc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: Some(OrderDirection::Desc),
        }
    }

    pub fn natural(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: None,
        }
    }

    pub fn to_sql(&self) -> String {
        match self.direction {
            Some(dir) => format!("{} {}", self.expr.to_sql(), dir.to_sql()),
            None => self.expr.to_sql(),
        }
    }
}

/// SQL text plus the values to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl RenderedQuery {
    /// Execute and decode every row.
    pub async fn fetch_all<T>(&self, pool: &SqlitePool) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow>,
    {
        tracing::debug!(sql = %self.sql, binds = self.values.len(), "Executing select query");

        let mut query = sqlx::query(&self.sql);
        for value in &self.values {
            query = value.bind_to_query(query);
        }

        let rows = query.fetch_all(pool).await?;
        rows.iter().map(|row| T::from_row(row)).collect()
    }

    /// Execute a single-value COUNT query.
    pub async fn fetch_count(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        tracing::debug!(sql = %self.sql, binds = self.values.len(), "Executing count query");

        let mut query = sqlx::query_scalar::<_, i64>(&self.sql);
        for value in &self.values {
            query = value.bind_to_scalar(query);
        }

        query.fetch_one(pool).await
    }
}

/// A SELECT over one table: every native column, optional computed columns,
/// conjunctive predicates, ORDER BY and LIMIT/OFFSET.
///
/// Setting the limit or offset twice keeps the last value.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: &'static str,
    extra_columns: Vec<Expr>,
    predicates: Vec<Predicate>,
    order: Vec<OrderTerm>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            extra_columns: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Append a computed column after `"table".*`.
    pub fn select_extra(mut self, expr: Expr) -> Self {
        self.extra_columns.push(expr);
        self
    }

    /// Add a condition, ANDed with the existing ones.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, terms: impl IntoIterator<Item = OrderTerm>) -> Self {
        self.order.extend(terms);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    fn where_clause(&self, values: &mut Vec<SqlValue>) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let mut next_param = values.len();
        let conditions: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.render(&mut next_param, values))
            .collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }

    /// Render the row query.
    pub fn to_sql(&self) -> RenderedQuery {
        let mut values = Vec::new();

        let mut columns = vec![format!("\"{}\".*", self.table)];
        columns.extend(self.extra_columns.iter().map(Expr::to_sql));

        let mut sql = format!("SELECT {} FROM \"{}\"", columns.join(", "), self.table);
        sql.push_str(&self.where_clause(&mut values));

        if !self.order.is_empty() {
            let terms: Vec<String> = self.order.iter().map(OrderTerm::to_sql).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        RenderedQuery { sql, values }
    }

    /// Render a COUNT over the same predicates, without ordering or paging.
    pub fn to_count_sql(&self) -> RenderedQuery {
        let mut values = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);
        sql.push_str(&self.where_clause(&mut values));
        RenderedQuery { sql, values }
    }
}
