//! API error type shared by resolvers
//!
//! Repositories return `anyhow::Result`. Access and input failures are raised as
//! [ApiError] and turned into `async_graphql::Error` with an `extensions.code`
//! through [ErrorExtensions].

use std::sync::Arc;

use async_graphql::ErrorExtensions;

use crate::graphql::auth::Role;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Role '{required}' required in organization {organization_id}")]
    Forbidden { organization_id: i64, required: Role },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Campaign {0} not found")]
    CampaignNotFound(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::InvalidInput(_) => "BAD_USER_INPUT",
            ApiError::CampaignNotFound(_) => "NOT_FOUND",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        if matches!(self, ApiError::Database(_) | ApiError::Internal(_)) {
            tracing::error!(error = %self, "Request failed");
        }
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

impl From<Arc<anyhow::Error>> for ApiError {
    fn from(e: Arc<anyhow::Error>) -> Self {
        ApiError::Internal(anyhow::anyhow!("{:#}", e))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Convert repository and loader failures into coded GraphQL errors
pub trait IntoGqlResult<T> {
    fn into_gql(self) -> async_graphql::Result<T>;
}

impl<T, E: Into<ApiError>> IntoGqlResult<T> for std::result::Result<T, E> {
    fn into_gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.into().extend())
    }
}
