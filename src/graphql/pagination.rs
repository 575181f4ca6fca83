//! Offset pagination metadata

use async_graphql::SimpleObject;

use crate::db;

/// Where a page sits in the full result
#[derive(SimpleObject, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub limit: i32,
    pub offset: i32,
    /// Matching rows, ignoring limit and offset
    pub total: i32,
}

impl From<db::PageInfo> for PageInfo {
    fn from(p: db::PageInfo) -> Self {
        // Inputs arrive as i32; only the count can exceed it
        let clamp = |n: i64| n.clamp(0, i64::from(i32::MAX)) as i32;
        Self {
            limit: clamp(p.limit),
            offset: clamp(p.offset),
            total: clamp(p.total),
        }
    }
}
