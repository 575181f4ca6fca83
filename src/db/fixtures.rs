//! Row builders shared by the repository and schema tests

use sqlx::SqlitePool;

pub async fn organization(pool: &SqlitePool, name: &str, features: &str) -> i64 {
    sqlx::query_scalar(r#"INSERT INTO "organization" (name, features) VALUES (?, ?) RETURNING id"#)
        .bind(name)
        .bind(features)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn user(pool: &SqlitePool, first_name: &str, is_superadmin: bool) -> i64 {
    sqlx::query_scalar(
        r#"INSERT INTO "user" (first_name, last_name, email, is_superadmin)
           VALUES (?, 'Tester', ?, ?) RETURNING id"#,
    )
    .bind(first_name)
    .bind(format!("{}@example.org", first_name.to_lowercase()))
    .bind(is_superadmin)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn membership(pool: &SqlitePool, user_id: i64, organization_id: i64, role: &str) {
    sqlx::query(r#"INSERT INTO "user_organization" (user_id, organization_id, role) VALUES (?, ?, ?)"#)
        .bind(user_id)
        .bind(organization_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

/// Campaign columns a test usually cares about; everything else takes the
/// table defaults.
#[derive(Debug, Clone)]
pub struct NewCampaign<'a> {
    pub organization_id: i64,
    pub title: &'a str,
    pub status: Option<&'a str>,
    pub due_by: Option<&'a str>,
    pub is_started: bool,
    pub is_archived: bool,
    pub use_dynamic_assignment: bool,
    pub creator_id: Option<i64>,
    pub join_token: Option<&'a str>,
}

impl<'a> NewCampaign<'a> {
    pub fn new(organization_id: i64, title: &'a str) -> Self {
        Self {
            organization_id,
            title,
            status: None,
            due_by: None,
            is_started: true,
            is_archived: false,
            use_dynamic_assignment: false,
            creator_id: None,
            join_token: None,
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> i64 {
        sqlx::query_scalar(
            r#"INSERT INTO "campaign"
               (organization_id, title, status, due_by, is_started, is_archived,
                use_dynamic_assignment, creator_id, join_token)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id"#,
        )
        .bind(self.organization_id)
        .bind(self.title)
        .bind(self.status)
        .bind(self.due_by)
        .bind(self.is_started)
        .bind(self.is_archived)
        .bind(self.use_dynamic_assignment)
        .bind(self.creator_id)
        .bind(self.join_token)
        .fetch_one(pool)
        .await
        .unwrap()
    }
}

pub async fn assignment(pool: &SqlitePool, user_id: i64, campaign_id: i64) -> i64 {
    sqlx::query_scalar(r#"INSERT INTO "assignment" (user_id, campaign_id) VALUES (?, ?) RETURNING id"#)
        .bind(user_id)
        .bind(campaign_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn contact(
    pool: &SqlitePool,
    campaign_id: i64,
    assignment_id: Option<i64>,
    message_status: &str,
    is_opted_out: bool,
) -> i64 {
    sqlx::query_scalar(
        r#"INSERT INTO "campaign_contact"
           (campaign_id, assignment_id, first_name, cell, message_status, is_opted_out)
           VALUES (?, ?, 'Contact', '+15555550100', ?, ?) RETURNING id"#,
    )
    .bind(campaign_id)
    .bind(assignment_id)
    .bind(message_status)
    .bind(is_opted_out)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn message(pool: &SqlitePool, assignment_id: i64, is_from_contact: bool) {
    sqlx::query(r#"INSERT INTO "message" (assignment_id, text, is_from_contact) VALUES (?, 'hi', ?)"#)
        .bind(assignment_id)
        .bind(is_from_contact)
        .execute(pool)
        .await
        .unwrap();
}
