//! GraphQL input types for campaign listing

use async_graphql::{Enum, ID, InputObject};

use crate::db::{CampaignsFilter, Cursor};
use crate::error::ApiError;

use super::status::CampaignStatus;

/// Filter for the campaigns query
#[derive(InputObject, Debug, Clone, Default)]
#[graphql(name = "CampaignsFilter")]
pub struct CampaignsFilterInput {
    pub status: Option<CampaignStatus>,
    /// Takes precedence over `campaignIds`
    pub campaign_id: Option<ID>,
    pub campaign_ids: Option<Vec<ID>>,
    /// Case-insensitive title substring
    pub search_string: Option<String>,
    pub list_size: Option<i32>,
    pub page_size: Option<i32>,
}

fn parse_id(id: &ID) -> Result<i64, ApiError> {
    id.trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("Invalid campaign id '{}'", id.as_str())))
}

impl TryFrom<CampaignsFilterInput> for CampaignsFilter {
    type Error = ApiError;

    fn try_from(input: CampaignsFilterInput) -> Result<Self, Self::Error> {
        let campaign_id = input.campaign_id.as_ref().map(parse_id).transpose()?;
        let campaign_ids = input
            .campaign_ids
            .map(|ids| ids.iter().map(parse_id).collect::<Result<Vec<_>, _>>())
            .transpose()?;

        Ok(Self {
            status: input.status.map(|s| s.as_str().to_string()),
            campaign_id,
            campaign_ids,
            search_string: input.search_string,
            list_size: input.list_size.map(i64::from),
            page_size: input.page_size.map(i64::from),
        })
    }
}

/// Limit/offset page request
#[derive(InputObject, Debug, Clone, Copy)]
#[graphql(name = "OffsetLimitCursor")]
pub struct CursorInput {
    pub limit: i32,
    #[graphql(default)]
    pub offset: i32,
}

impl TryFrom<CursorInput> for Cursor {
    type Error = ApiError;

    fn try_from(input: CursorInput) -> Result<Self, Self::Error> {
        if input.limit < 0 || input.offset < 0 {
            return Err(ApiError::InvalidInput(
                "Cursor limit and offset must not be negative".to_string(),
            ));
        }
        Ok(Self {
            limit: input.limit.into(),
            offset: input.offset.into(),
        })
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(name = "SortCampaignsBy", remote = "crate::db::SortKey")]
pub enum SortCampaignsBy {
    DueDateAsc,
    DueDateDesc,
    Title,
    IdDesc,
    IdAsc,
}

/// Narrow a campaign's assignments
#[derive(InputObject, Debug, Clone, Default)]
pub struct AssignmentsFilter {
    pub texter_id: Option<ID>,
}

impl AssignmentsFilter {
    pub fn texter_id(&self) -> Result<Option<i64>, ApiError> {
        self.texter_id
            .as_ref()
            .map(|id| {
                id.parse()
                    .map_err(|_| ApiError::InvalidInput(format!("Invalid texter id '{}'", id.as_str())))
            })
            .transpose()
    }
}
