//! GraphQL DataLoaders for batching database queries
//!
//! Campaign lists resolve `organization` and `creator` for every row. The
//! loaders collect those ids within one request tick and fetch them with a
//! single `IN (...)` query. A fresh set is built per request so the memo
//! never outlives it.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::{DataLoader, HashMapCache, Loader};

use crate::db::{Database, OrganizationRecord, UserRecord};

pub struct OrganizationLoader {
    db: Database,
}

impl Loader<i64> for OrganizationLoader {
    type Value = OrganizationRecord;
    type Error = Arc<anyhow::Error>;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        tracing::debug!(count = keys.len(), "Batch loading organizations");
        let rows = self.db.organizations().get_many(keys).await.map_err(Arc::new)?;
        Ok(rows.into_iter().map(|o| (o.id, o)).collect())
    }
}

pub struct UserLoader {
    db: Database,
}

impl Loader<i64> for UserLoader {
    type Value = UserRecord;
    type Error = Arc<anyhow::Error>;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        tracing::debug!(count = keys.len(), "Batch loading users");
        let rows = self.db.users().get_many(keys).await.map_err(Arc::new)?;
        Ok(rows.into_iter().map(|u| (u.id, u)).collect())
    }
}

/// Request-scoped loaders, attached to each GraphQL request
pub struct Loaders {
    pub organization: DataLoader<OrganizationLoader, HashMapCache>,
    pub user: DataLoader<UserLoader, HashMapCache>,
}

impl Loaders {
    pub fn new(db: &Database) -> Self {
        Self {
            organization: DataLoader::with_cache(
                OrganizationLoader { db: db.clone() },
                tokio::spawn,
                HashMapCache::default(),
            ),
            user: DataLoader::with_cache(
                UserLoader { db: db.clone() },
                tokio::spawn,
                HashMapCache::default(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[tokio::test]
    async fn test_loads_many_and_skips_missing() {
        let db = Database::in_memory().await;
        let a = fixtures::organization(db.pool(), "A", "{}").await;
        let b = fixtures::organization(db.pool(), "B", "{}").await;
        let u = fixtures::user(db.pool(), "Una", false).await;

        let loaders = Loaders::new(&db);
        let orgs = loaders.organization.load_many([a, b, 404]).await.unwrap();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[&b].name, "B");

        let user = loaders.user.load_one(u).await.unwrap().unwrap();
        assert_eq!(user.first_name, "Una");
        assert!(loaders.user.load_one(u + 1).await.unwrap().is_none());
    }
}
