//! Table bootstrap for the read model
//!
//! Campaign data is written by other services. On startup (and in tests) the
//! tables this service reads are created if they do not exist yet, so a fresh
//! database file is immediately queryable.

use sqlx::SqlitePool;
use tracing::{debug, info};

const TABLES: &[(&str, &str)] = &[
    (
        "organization",
        r#"
        CREATE TABLE IF NOT EXISTS "organization" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            features TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "user",
        r#"
        CREATE TABLE IF NOT EXISTS "user" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            cell TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            is_superadmin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "user_organization",
        r#"
        CREATE TABLE IF NOT EXISTS "user_organization" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES "user"(id),
            organization_id INTEGER NOT NULL REFERENCES "organization"(id),
            role TEXT NOT NULL
        )
        "#,
    ),
    (
        "campaign",
        r#"
        CREATE TABLE IF NOT EXISTS "campaign" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            organization_id INTEGER NOT NULL REFERENCES "organization"(id),
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            is_started INTEGER NOT NULL DEFAULT 0,
            is_archived INTEGER NOT NULL DEFAULT 0,
            use_dynamic_assignment INTEGER NOT NULL DEFAULT 0,
            due_by TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            started_at TEXT,
            intro_html TEXT,
            primary_color TEXT,
            logo_image_url TEXT,
            override_organization_texting_hours INTEGER NOT NULL DEFAULT 0,
            texting_hours_enforced INTEGER NOT NULL DEFAULT 1,
            texting_hours_start INTEGER NOT NULL DEFAULT 9,
            texting_hours_end INTEGER NOT NULL DEFAULT 21,
            timezone TEXT NOT NULL DEFAULT 'US/Eastern',
            creator_id INTEGER REFERENCES "user"(id),
            join_token TEXT,
            status TEXT,
            shifting_configuration TEXT,
            contact_file_name TEXT
        )
        "#,
    ),
    (
        "assignment",
        r#"
        CREATE TABLE IF NOT EXISTS "assignment" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES "user"(id),
            campaign_id INTEGER NOT NULL REFERENCES "campaign"(id),
            max_contacts INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "campaign_contact",
        r#"
        CREATE TABLE IF NOT EXISTS "campaign_contact" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER NOT NULL REFERENCES "campaign"(id),
            assignment_id INTEGER REFERENCES "assignment"(id),
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            cell TEXT NOT NULL DEFAULT '',
            zip TEXT NOT NULL DEFAULT '',
            custom_fields TEXT NOT NULL DEFAULT '{}',
            message_status TEXT NOT NULL DEFAULT 'needsMessage',
            is_opted_out INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "message",
        r#"
        CREATE TABLE IF NOT EXISTS "message" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            assignment_id INTEGER REFERENCES "assignment"(id),
            campaign_contact_id INTEGER REFERENCES "campaign_contact"(id),
            text TEXT NOT NULL DEFAULT '',
            is_from_contact INTEGER NOT NULL DEFAULT 0,
            send_status TEXT NOT NULL DEFAULT 'QUEUED',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "interaction_step",
        r#"
        CREATE TABLE IF NOT EXISTS "interaction_step" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER NOT NULL REFERENCES "campaign"(id),
            question TEXT NOT NULL DEFAULT '',
            script TEXT NOT NULL DEFAULT '',
            answer_option TEXT NOT NULL DEFAULT '',
            answer_actions TEXT NOT NULL DEFAULT '',
            parent_interaction_id INTEGER REFERENCES "interaction_step"(id),
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "canned_response",
        r#"
        CREATE TABLE IF NOT EXISTS "canned_response" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER NOT NULL REFERENCES "campaign"(id),
            user_id INTEGER REFERENCES "user"(id),
            title TEXT NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    ),
    (
        "background_job",
        r#"
        CREATE TABLE IF NOT EXISTS "background_job" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            campaign_id INTEGER REFERENCES "campaign"(id),
            job_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT '',
            result_message TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ),
    (
        "owned_phone_number",
        r#"
        CREATE TABLE IF NOT EXISTS "owned_phone_number" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            organization_id INTEGER NOT NULL REFERENCES "organization"(id),
            phone_number TEXT NOT NULL,
            area_code TEXT NOT NULL,
            allocated_to TEXT,
            allocated_to_id TEXT
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    r#"CREATE INDEX IF NOT EXISTS campaign_organization_id_index ON "campaign"(organization_id)"#,
    r#"CREATE INDEX IF NOT EXISTS user_organization_user_id_index ON "user_organization"(user_id, organization_id)"#,
    r#"CREATE INDEX IF NOT EXISTS assignment_campaign_id_index ON "assignment"(campaign_id)"#,
    r#"CREATE INDEX IF NOT EXISTS campaign_contact_campaign_id_index ON "campaign_contact"(campaign_id, assignment_id)"#,
    r#"CREATE INDEX IF NOT EXISTS message_assignment_id_index ON "message"(assignment_id)"#,
    r#"CREATE INDEX IF NOT EXISTS interaction_step_campaign_id_index ON "interaction_step"(campaign_id)"#,
    r#"CREATE INDEX IF NOT EXISTS canned_response_campaign_id_index ON "canned_response"(campaign_id, user_id)"#,
    r#"CREATE INDEX IF NOT EXISTS background_job_campaign_id_index ON "background_job"(campaign_id, job_type)"#,
    r#"CREATE INDEX IF NOT EXISTS owned_phone_number_allocation_index ON "owned_phone_number"(allocated_to, allocated_to_id)"#,
];

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Create every missing table and index. Returns the names of the tables that
/// were created.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<Vec<&'static str>, sqlx::Error> {
    let mut created = Vec::new();

    for &(table, ddl) in TABLES {
        if table_exists(pool, table).await? {
            continue;
        }
        debug!(table = %table, "Creating table");
        sqlx::query(ddl).execute(pool).await?;
        created.push(table);
    }

    for &ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    if !created.is_empty() {
        info!(tables = ?created, "Schema bootstrap created tables");
    }

    Ok(created)
}
