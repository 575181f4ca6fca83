//! HTTP routes
//!
//! The API is GraphQL at /graphql; /health and /readyz report liveness and readiness.

pub mod graphql;
pub mod health;
