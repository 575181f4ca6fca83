//! GraphQL API
//!
//! A read-only schema over campaigns. Authorization is organization scoped
//! and checked per field (see [auth]).

pub mod auth;
pub mod cache;
pub mod filters;
pub mod loaders;
pub mod pagination;
mod schema;
pub mod status;
pub mod types;

pub use auth::{OrganizationRoles, verify_token};
pub use cache::CampaignCache;
pub use loaders::Loaders;
pub use schema::{SpokeSchema, build_schema};
