//! GraphQL schema definition
//!
//! Read-only: campaign listing and single campaign lookup. Every root field
//! requires an authenticated user with a role in the organization.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, ID, Object, Result, Schema};

use crate::config::Config;
use crate::db::{CampaignsFilter, Cursor, Database, SortKey};
use crate::error::{ApiError, IntoGqlResult};

use super::auth::{AccessPolicy, AuthExt, Role, access_required};
use super::cache::CampaignCache;
use super::filters::{CampaignsFilterInput, CursorInput, SortCampaignsBy};
use super::types::{Campaign, CampaignsReturn};

/// The GraphQL schema type
pub type SpokeSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Build the schema with its shared data. Request-scoped data (the
/// [AuthUser](super::auth::AuthUser) and [Loaders](super::loaders::Loaders)) is
/// attached per request by the HTTP handler.
pub fn build_schema(
    db: Database,
    config: Arc<Config>,
    policy: Arc<dyn AccessPolicy>,
    cache: Arc<CampaignCache>,
) -> SpokeSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(db)
        .data(config)
        .data(policy)
        .data(cache)
        .finish()
}

fn parse_id(id: &ID, what: &str) -> Result<i64, ApiError> {
    id.trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("Invalid {} id '{}'", what, id.as_str())))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Campaigns of an organization. Returns a page with totals when a
    /// cursor is given, a plain list otherwise.
    async fn campaigns(
        &self,
        ctx: &Context<'_>,
        organization_id: ID,
        cursor: Option<CursorInput>,
        campaigns_filter: Option<CampaignsFilterInput>,
        sort_by: Option<SortCampaignsBy>,
    ) -> Result<CampaignsReturn> {
        let organization_id = parse_id(&organization_id, "organization").into_gql()?;
        let policy = ctx.data::<Arc<dyn AccessPolicy>>()?;
        access_required(
            policy.as_ref(),
            ctx.try_auth_user(),
            organization_id,
            Role::Supervolunteer,
            true,
        )
        .await
        .into_gql()?;

        let cursor = cursor.map(Cursor::try_from).transpose().into_gql()?;
        let filter = campaigns_filter
            .map(CampaignsFilter::try_from)
            .transpose()
            .into_gql()?;

        let db = ctx.data_unchecked::<Database>();
        let result = db
            .campaigns()
            .get_campaigns(
                organization_id,
                cursor,
                filter.as_ref(),
                sort_by.map(SortKey::from),
            )
            .await
            .into_gql()?;
        Ok(result.into())
    }

    async fn campaign(&self, ctx: &Context<'_>, id: ID) -> Result<Campaign> {
        let id = parse_id(&id, "campaign").into_gql()?;
        let db = ctx.data_unchecked::<Database>();
        let record = db
            .campaigns()
            .get_by_id(id)
            .await
            .into_gql()?
            .ok_or(ApiError::CampaignNotFound(id))
            .into_gql()?;

        let policy = ctx.data::<Arc<dyn AccessPolicy>>()?;
        access_required(
            policy.as_ref(),
            ctx.try_auth_user(),
            record.organization_id,
            Role::Texter,
            true,
        )
        .await
        .into_gql()?;

        Ok(Campaign(record))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_graphql::{Request, Response, Value};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::db::fixtures::{self, NewCampaign};
    use crate::graphql::auth::AuthUser;
    use crate::graphql::auth::test_support::{StaticRoles, user};
    use crate::graphql::loaders::Loaders;

    struct Harness {
        db: Database,
        schema: SpokeSchema,
    }

    impl Harness {
        async fn new(policy: StaticRoles, config: Config) -> Self {
            let db = Database::in_memory().await;
            let schema = build_schema(
                db.clone(),
                Arc::new(config),
                Arc::new(policy),
                Arc::new(CampaignCache::new(Duration::from_secs(60))),
            );
            Self { db, schema }
        }

        async fn run(&self, as_user: Option<AuthUser>, query: &str) -> Response {
            let mut request = Request::new(query).data(Loaders::new(&self.db));
            if let Some(u) = as_user {
                request = request.data(u);
            }
            self.schema.execute(request).await
        }
    }

    fn codes(response: &Response) -> Vec<String> {
        response
            .errors
            .iter()
            .filter_map(|e| match e.extensions.as_ref()?.get("code")? {
                Value::String(code) => Some(code.clone()),
                _ => None,
            })
            .collect()
    }

    fn json(response: Response) -> serde_json::Value {
        response.data.into_json().unwrap()
    }

    #[tokio::test]
    async fn test_campaigns_without_cursor_is_a_list() {
        // Organization and user ids start at 1 in a fresh database
        let h = Harness::new(
            StaticRoles::default().with(1, 1, Role::Supervolunteer),
            Config::default(),
        )
        .await;
        let org = fixtures::organization(h.db.pool(), "Org", "{}").await;
        let member = fixtures::user(h.db.pool(), "Sam", false).await;
        assert_eq!((org, member), (1, 1));
        let spring = NewCampaign::new(org, "Spring Outreach").insert(h.db.pool()).await;
        NewCampaign::new(org, "Fall GOTV").insert(h.db.pool()).await;

        let response = h
            .run(
                Some(user(member)),
                r#"{
                    campaigns(organizationId: "1", campaignsFilter: { searchString: "SPRING" }) {
                        __typename
                        ... on CampaignsList { campaigns { id title } }
                    }
                }"#,
            )
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            json(response),
            json!({
                "campaigns": {
                    "__typename": "CampaignsList",
                    "campaigns": [{ "id": spring.to_string(), "title": "Spring Outreach" }]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_campaigns_with_cursor_is_paginated() {
        let h = Harness::new(StaticRoles::default().with(1, 1, Role::Admin), Config::default()).await;
        let org = fixtures::organization(h.db.pool(), "Org", "{}").await;
        let member = fixtures::user(h.db.pool(), "Sam", false).await;
        for title in ["A", "B", "C"] {
            NewCampaign::new(org, title).insert(h.db.pool()).await;
        }

        let response = h
            .run(
                Some(user(member)),
                r#"{
                    campaigns(organizationId: "1", cursor: { limit: 2, offset: 1 }, sortBy: TITLE) {
                        __typename
                        ... on PaginatedCampaigns {
                            campaigns { title }
                            pageInfo { limit offset total }
                        }
                    }
                }"#,
            )
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            json(response),
            json!({
                "campaigns": {
                    "__typename": "PaginatedCampaigns",
                    "campaigns": [{ "title": "B" }, { "title": "C" }],
                    "pageInfo": { "limit": 2, "offset": 1, "total": 3 }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_campaigns_requires_supervolunteer() {
        let h = Harness::new(StaticRoles::default().with(1, 1, Role::Texter), Config::default()).await;
        let org = fixtures::organization(h.db.pool(), "Org", "{}").await;
        let texter = fixtures::user(h.db.pool(), "Tex", false).await;
        NewCampaign::new(org, "Hidden").insert(h.db.pool()).await;

        let query = r#"{ campaigns(organizationId: "1") { __typename } }"#;
        let response = h.run(Some(user(texter)), query).await;
        assert_eq!(codes(&response), vec!["FORBIDDEN"]);

        let response = h.run(None, query).await;
        assert_eq!(codes(&response), vec!["UNAUTHORIZED"]);

        let response = h.run(Some(user(texter)), r#"{ campaigns(organizationId: "one") { __typename } }"#).await;
        assert_eq!(codes(&response), vec!["BAD_USER_INPUT"]);
    }

    #[tokio::test]
    async fn test_gated_field_fails_alone() {
        let h = Harness::new(StaticRoles::default().with(1, 1, Role::Texter), Config::default()).await;
        let org = fixtures::organization(h.db.pool(), "Org", "{}").await;
        let texter = fixtures::user(h.db.pool(), "Tex", false).await;
        let mut campaign = NewCampaign::new(org, "Door knock");
        campaign.join_token = Some("tok");
        let id = campaign.insert(h.db.pool()).await;

        let response = h
            .run(
                Some(user(texter)),
                &format!(r#"{{ campaign(id: "{}") {{ title joinUrl }} }}"#, id),
            )
            .await;

        assert_eq!(codes(&response), vec!["FORBIDDEN"]);
        assert_eq!(
            json(response),
            json!({ "campaign": { "title": "Door knock", "joinUrl": null } })
        );
    }

    #[tokio::test]
    async fn test_campaign_fields_for_supervolunteer() {
        let h = Harness::new(
            StaticRoles::default().with(1, 1, Role::Supervolunteer),
            Config::default(),
        )
        .await;
        let org = fixtures::organization(h.db.pool(), "Org", "{}").await;
        let sup = fixtures::user(h.db.pool(), "Sup", false).await;
        let mut campaign = NewCampaign::new(org, "Phonebank");
        campaign.join_token = Some("abc");
        campaign.creator_id = Some(sup);
        campaign.is_started = false;
        let id = campaign.insert(h.db.pool()).await;

        let assignment = fixtures::assignment(h.db.pool(), sup, id).await;
        fixtures::contact(h.db.pool(), id, Some(assignment), "needsMessage", false).await;
        fixtures::contact(h.db.pool(), id, None, "needsMessage", true).await;
        fixtures::message(h.db.pool(), assignment, false).await;

        let response = h
            .run(
                Some(user(sup)),
                &format!(
                    r#"{{ campaign(id: "{}") {{
                        status
                        joinUrl
                        contactsCount
                        hasUnassignedContacts
                        organization {{ name }}
                        creator {{ displayName }}
                        texters {{ firstName }}
                        stats {{ sentMessagesCount receivedMessagesCount optOutsCount }}
                        phoneNumbers {{ areaCode }}
                    }} }}"#,
                    id
                ),
            )
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            json(response),
            json!({
                "campaign": {
                    "status": "NOT_STARTED",
                    "joinUrl": "http://localhost:3000/join-campaign/abc",
                    "contactsCount": 2,
                    "hasUnassignedContacts": true,
                    "organization": { "name": "Org" },
                    "creator": { "displayName": "Sup Tester" },
                    "texters": [{ "firstName": "Sup" }],
                    "stats": { "sentMessagesCount": 1, "receivedMessagesCount": 0, "optOutsCount": 1 },
                    "phoneNumbers": null
                }
            })
        );
    }

    #[tokio::test]
    async fn test_missing_campaign_is_not_found() {
        let h = Harness::new(StaticRoles::default(), Config::default()).await;
        let response = h.run(Some(user(1)), r#"{ campaign(id: "99") { title } }"#).await;
        assert_eq!(codes(&response), vec!["NOT_FOUND"]);
    }
}
