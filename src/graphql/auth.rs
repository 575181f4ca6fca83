//! GraphQL authentication and authorization
//!
//! Tokens are HS256 JWTs whose `sub` is the numeric user id. Authorization is
//! organization scoped: a user holds a [Role] in each organization, roles are
//! ordered and every role implies the ones below it.
//!
//! Role-gated Campaign fields are listed once in [CampaignField::required_role].
//! Resolvers call [authorize] with their field and never inline role checks.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{ApiError, ApiResult};

/// User context extracted from JWT, available in GraphQL resolvers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: Option<String>,
    pub is_superadmin: bool,
}

#[derive(Debug, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    is_superadmin: bool,
    #[allow(dead_code)]
    exp: i64,
}

/// Verify a JWT token and extract user info
pub fn verify_token(token: &str, jwt_secret: &str) -> Result<AuthUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_aud = false;

    let token_data = decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.trim().as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT verification failed");
        async_graphql::Error::new(format!("Invalid token: {}", e))
            .extend_with(|_, e| e.set("code", "UNAUTHORIZED"))
    })?;

    let claims = token_data.claims;
    let user_id = claims.sub.parse::<i64>().map_err(|_| {
        async_graphql::Error::new("Invalid token subject")
            .extend_with(|_, e| e.set("code", "UNAUTHORIZED"))
    })?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
        is_superadmin: claims.is_superadmin,
    })
}

/// Extension trait to get authenticated user from GraphQL context
pub trait AuthExt {
    /// Get the authenticated user, or return an error if not authenticated
    fn auth_user(&self) -> Result<&AuthUser>;

    /// Get the authenticated user if present
    fn try_auth_user(&self) -> Option<&AuthUser>;
}

impl<'a> AuthExt for Context<'a> {
    fn auth_user(&self) -> Result<&AuthUser> {
        self.data_opt::<AuthUser>()
            .ok_or_else(|| ApiError::Unauthenticated.extend())
    }

    fn try_auth_user(&self) -> Option<&AuthUser> {
        self.data_opt::<AuthUser>()
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Organization role, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Suspended,
    Texter,
    Supervolunteer,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Suspended => "SUSPENDED",
            Role::Texter => "TEXTER",
            Role::Supervolunteer => "SUPERVOLUNTEER",
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SUSPENDED" => Ok(Role::Suspended),
            "TEXTER" => Ok(Role::Texter),
            "SUPERVOLUNTEER" => Ok(Role::Supervolunteer),
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            other => Err(anyhow::anyhow!("Unknown role '{}'", other)),
        }
    }
}

/// Source of organization memberships
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Highest role the user holds in the organization
    async fn role_in_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> anyhow::Result<Option<Role>>;
}

/// Memberships stored in the `user_organization` table
pub struct OrganizationRoles {
    db: Database,
}

impl OrganizationRoles {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessPolicy for OrganizationRoles {
    async fn role_in_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> anyhow::Result<Option<Role>> {
        let names = self
            .db
            .users()
            .roles_in_organization(user_id, organization_id)
            .await?;

        let mut highest = None;
        for name in names {
            match name.parse::<Role>() {
                Ok(role) => highest = highest.max(Some(role)),
                Err(e) => tracing::warn!(user_id, organization_id, error = %e, "Ignoring membership"),
            }
        }
        Ok(highest)
    }
}

/// Require `role` (or higher) in the organization.
///
/// Superadmins pass without a membership when `allow_superadmin` is set.
pub async fn access_required(
    policy: &dyn AccessPolicy,
    user: Option<&AuthUser>,
    organization_id: i64,
    role: Role,
    allow_superadmin: bool,
) -> ApiResult<()> {
    let Some(user) = user else {
        return Err(ApiError::Unauthenticated);
    };

    if allow_superadmin && user.is_superadmin {
        return Ok(());
    }

    let held = policy
        .role_in_organization(user.user_id, organization_id)
        .await?;

    match held {
        Some(held) if held >= role => Ok(()),
        _ => {
            tracing::debug!(
                user_id = user.user_id,
                organization_id,
                required = %role,
                held = ?held,
                "Access denied"
            );
            Err(ApiError::Forbidden {
                organization_id,
                required: role,
            })
        }
    }
}

// ============================================================================
// Campaign field gates
// ============================================================================

/// Every Campaign field with a resolver of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignField {
    Organization,
    Creator,
    DatawarehouseAvailable,
    Texters,
    Assignments,
    InteractionSteps,
    CannedResponses,
    Contacts,
    ContactsPreview,
    ContactsCount,
    HasUnassignedContactsForTexter,
    HasUnassignedContacts,
    HasUnsentInitialMessages,
    CustomFields,
    Editors,
    PhoneNumbers,
    JoinUrl,
    ContactImportJob,
    StartJob,
    Status,
    AssignmentSummaries,
    SentMessagesCount,
    ReceivedMessagesCount,
    OptOutsCount,
}

impl CampaignField {
    /// Minimum organization role needed to read the field
    pub fn required_role(self) -> Option<Role> {
        use CampaignField::*;

        match self {
            InteractionSteps | CannedResponses | HasUnassignedContactsForTexter => {
                Some(Role::Texter)
            }
            Texters | Assignments | ContactsCount | HasUnassignedContacts
            | HasUnsentInitialMessages | Editors | JoinUrl | AssignmentSummaries
            | SentMessagesCount | ReceivedMessagesCount | OptOutsCount => {
                Some(Role::Supervolunteer)
            }
            Contacts | ContactsPreview => Some(Role::Admin),
            Organization | Creator | DatawarehouseAvailable | CustomFields | PhoneNumbers
            | ContactImportJob | StartJob | Status => None,
        }
    }
}

/// Check the field's gate for the requesting user
pub async fn authorize(ctx: &Context<'_>, organization_id: i64, field: CampaignField) -> Result<()> {
    let Some(role) = field.required_role() else {
        return Ok(());
    };
    let policy = ctx.data::<Arc<dyn AccessPolicy>>()?;
    access_required(
        policy.as_ref(),
        ctx.try_auth_user(),
        organization_id,
        role,
        true,
    )
    .await
    .map_err(|e| e.extend())
}


#[cfg(test)]
mod tests {
    use super::test_support::{StaticRoles, user};
    use super::*;
    use crate::db::fixtures;
    use assert_matches::assert_matches;
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[test]
    fn test_roles_are_ordered() {
        assert!(Role::Suspended < Role::Texter);
        assert!(Role::Texter < Role::Supervolunteer);
        assert!(Role::Supervolunteer < Role::Admin);
        assert!(Role::Admin < Role::Owner);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_field_gates() {
        assert_eq!(CampaignField::Contacts.required_role(), Some(Role::Admin));
        assert_eq!(CampaignField::JoinUrl.required_role(), Some(Role::Supervolunteer));
        assert_eq!(CampaignField::CannedResponses.required_role(), Some(Role::Texter));
        assert_eq!(CampaignField::Status.required_role(), None);
    }

    #[tokio::test]
    async fn test_access_required() {
        let policy = StaticRoles::default()
            .with(1, 10, Role::Admin)
            .with(2, 10, Role::Texter);

        assert!(access_required(&policy, Some(&user(1)), 10, Role::Supervolunteer, true).await.is_ok());
        assert_matches!(
            access_required(&policy, Some(&user(2)), 10, Role::Supervolunteer, true).await,
            Err(ApiError::Forbidden { organization_id: 10, required: Role::Supervolunteer })
        );
        assert_matches!(
            access_required(&policy, Some(&user(1)), 11, Role::Texter, true).await,
            Err(ApiError::Forbidden { .. })
        );
        assert_matches!(
            access_required(&policy, None, 10, Role::Texter, true).await,
            Err(ApiError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_superadmin_bypass_is_optional() {
        let policy = StaticRoles::default();
        let admin = AuthUser {
            user_id: 9,
            email: None,
            is_superadmin: true,
        };

        assert!(access_required(&policy, Some(&admin), 10, Role::Owner, true).await.is_ok());
        assert_matches!(
            access_required(&policy, Some(&admin), 10, Role::Owner, false).await,
            Err(ApiError::Forbidden { .. })
        );
    }

    #[tokio::test]
    async fn test_organization_roles_picks_highest() {
        let db = Database::in_memory().await;
        let org = fixtures::organization(db.pool(), "Org", "{}").await;
        let member = fixtures::user(db.pool(), "Member", false).await;
        fixtures::membership(db.pool(), member, org, "TEXTER").await;
        fixtures::membership(db.pool(), member, org, "ADMIN").await;
        fixtures::membership(db.pool(), member, org, "bogus").await;

        let policy = OrganizationRoles::new(db);
        assert_eq!(
            policy.role_in_organization(member, org).await.unwrap(),
            Some(Role::Admin)
        );
        assert_eq!(policy.role_in_organization(member, org + 1).await.unwrap(), None);
    }

    #[test]
    fn test_verify_token() {
        #[derive(Serialize)]
        struct Claims<'a> {
            sub: &'a str,
            email: &'a str,
            is_superadmin: bool,
            exp: i64,
        }

        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims { sub: "42", email: "a@example.org", is_superadmin: true, exp },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let user = verify_token(&token, "secret").unwrap();
        assert_eq!(user.user_id, 42);
        assert!(user.is_superadmin);

        let err = verify_token(&token, "other").unwrap_err();
        assert_eq!(
            err.extensions.unwrap().get("code"),
            Some(&async_graphql::Value::from("UNAUTHORIZED"))
        );
    }
}
