//! GraphQL object types
//!
//! `Campaign` wraps the stored row and resolves derived fields on demand.
//! Gated fields call [authorize] first; the gate for each lives in
//! [CampaignField::required_role].

use std::sync::Arc;

use async_graphql::{Context, ID, Object, Result, SimpleObject, Union};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::{
    AreaCodeCount, AssignmentRecord, AssignmentSummaryRecord, BackgroundJobRecord,
    CampaignContactRecord, CampaignQueryResult, CampaignRecord, CannedResponseRecord, Database,
    InteractionStepRecord, JobType, OrganizationRecord, UserRecord,
};
use crate::error::{ApiError, IntoGqlResult};

use super::auth::{AuthExt, CampaignField, authorize};
use super::cache::CampaignCache;
use super::filters::AssignmentsFilter;
use super::loaders::Loaders;
use super::pagination::PageInfo;
use super::status::{CampaignStatus, StatusFacts, derive_status};

/// Organization feature flag that exposes per-campaign phone numbers
pub const CAMPAIGN_PHONE_NUMBERS_FEATURE: &str = "EXPERIMENTAL_CAMPAIGN_PHONE_NUMBERS";

fn db<'ctx>(ctx: &Context<'ctx>) -> &'ctx Database {
    ctx.data_unchecked::<Database>()
}

fn config<'ctx>(ctx: &Context<'ctx>) -> &'ctx Config {
    ctx.data_unchecked::<Arc<Config>>()
}

fn cache<'ctx>(ctx: &Context<'ctx>) -> &'ctx CampaignCache {
    ctx.data_unchecked::<Arc<CampaignCache>>()
}

fn clamp_i32(n: i64) -> i32 {
    n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ============================================================================
// Campaign
// ============================================================================

#[derive(Debug, Clone)]
pub struct Campaign(pub CampaignRecord);

impl Campaign {
    fn id(&self) -> i64 {
        self.0.id
    }

    fn organization_id(&self) -> i64 {
        self.0.organization_id
    }

    async fn load_organization(&self, ctx: &Context<'_>) -> Result<Option<OrganizationRecord>> {
        let loaders = ctx.data::<Loaders>()?;
        loaders
            .organization
            .load_one(self.organization_id())
            .await
            .into_gql()
    }
}

#[Object]
impl Campaign {
    #[graphql(name = "id")]
    async fn gql_id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn is_started(&self) -> bool {
        self.0.is_started
    }

    async fn is_archived(&self) -> bool {
        self.0.is_archived
    }

    async fn use_dynamic_assignment(&self) -> bool {
        self.0.use_dynamic_assignment
    }

    async fn intro_html(&self) -> Option<&str> {
        self.0.intro_html.as_deref()
    }

    async fn primary_color(&self) -> Option<&str> {
        self.0.primary_color.as_deref()
    }

    async fn logo_image_url(&self) -> Option<&str> {
        self.0.logo_image_url.as_deref()
    }

    async fn override_organization_texting_hours(&self) -> bool {
        self.0.override_organization_texting_hours
    }

    async fn texting_hours_enforced(&self) -> bool {
        self.0.texting_hours_enforced
    }

    async fn texting_hours_start(&self) -> i32 {
        clamp_i32(self.0.texting_hours_start)
    }

    async fn texting_hours_end(&self) -> i32 {
        clamp_i32(self.0.texting_hours_end)
    }

    async fn timezone(&self) -> Option<&str> {
        self.0.timezone.as_deref()
    }

    async fn shifting_configuration(&self) -> Option<&str> {
        self.0.shifting_configuration.as_deref()
    }

    async fn contact_file_name(&self) -> Option<&str> {
        self.0.contact_file_name.as_deref()
    }

    async fn due_by(&self) -> Option<DateTime<Utc>> {
        self.0.due_by
    }

    /// Falls back to the creation time for campaigns started before
    /// `started_at` was recorded
    async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.0.started_at.or(self.0.created_at)
    }

    async fn organization(&self, ctx: &Context<'_>) -> Result<Option<Organization>> {
        authorize(ctx, self.organization_id(), CampaignField::Organization).await?;
        Ok(self.load_organization(ctx).await?.map(Organization))
    }

    async fn creator(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        authorize(ctx, self.organization_id(), CampaignField::Creator).await?;
        let Some(creator_id) = self.0.creator_id else {
            return Ok(None);
        };
        let loaders = ctx.data::<Loaders>()?;
        Ok(loaders.user.load_one(creator_id).await.into_gql()?.map(User))
    }

    async fn datawarehouse_available(&self, ctx: &Context<'_>) -> Result<bool> {
        authorize(ctx, self.organization_id(), CampaignField::DatawarehouseAvailable).await?;
        let superadmin = ctx.try_auth_user().is_some_and(|u| u.is_superadmin);
        Ok(superadmin && config(ctx).warehouse_db_host.is_some())
    }

    async fn texters(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        authorize(ctx, self.organization_id(), CampaignField::Texters).await?;
        let users = db(ctx).users().texters_for_campaign(self.id()).await.into_gql()?;
        Ok(users.into_iter().map(User).collect())
    }

    async fn assignments(
        &self,
        ctx: &Context<'_>,
        assignments_filter: Option<AssignmentsFilter>,
    ) -> Result<Vec<Assignment>> {
        authorize(ctx, self.organization_id(), CampaignField::Assignments).await?;
        let texter_id = match &assignments_filter {
            Some(filter) => filter.texter_id().into_gql()?,
            None => None,
        };
        let rows = db(ctx)
            .assignments()
            .list_for_campaign(self.id(), texter_id)
            .await
            .into_gql()?;
        Ok(rows.into_iter().map(Assignment).collect())
    }

    async fn interaction_steps(&self, ctx: &Context<'_>) -> Result<Vec<InteractionStep>> {
        authorize(ctx, self.organization_id(), CampaignField::InteractionSteps).await?;
        let repo = db(ctx).interaction_steps();
        let steps = cache(ctx)
            .interaction_steps(self.id(), repo.list_for_campaign(self.id()))
            .await
            .into_gql()?;
        Ok(steps.into_iter().map(InteractionStep).collect())
    }

    /// A texter's own responses when `userId` is given, campaign-wide ones otherwise
    async fn canned_responses(
        &self,
        ctx: &Context<'_>,
        user_id: Option<ID>,
    ) -> Result<Vec<CannedResponse>> {
        authorize(ctx, self.organization_id(), CampaignField::CannedResponses).await?;
        let user_id = parse_optional_id(user_id.as_ref().map(|id| id.as_str())).into_gql()?;
        let repo = db(ctx).canned_responses();
        let rows = cache(ctx)
            .canned_responses(self.id(), user_id, repo.list_for_campaign(self.id(), user_id))
            .await
            .into_gql()?;
        Ok(rows.into_iter().map(CannedResponse).collect())
    }

    async fn contacts(&self, ctx: &Context<'_>) -> Result<Vec<CampaignContact>> {
        authorize(ctx, self.organization_id(), CampaignField::Contacts).await?;
        let rows = db(ctx)
            .campaign_contacts()
            .list_for_campaign(self.id(), None)
            .await
            .into_gql()?;
        Ok(rows.into_iter().map(CampaignContact).collect())
    }

    async fn contacts_preview(&self, ctx: &Context<'_>) -> Result<Vec<CampaignContact>> {
        authorize(ctx, self.organization_id(), CampaignField::ContactsPreview).await?;
        let rows = db(ctx)
            .campaign_contacts()
            .list_for_campaign(self.id(), Some(3))
            .await
            .into_gql()?;
        Ok(rows.into_iter().map(CampaignContact).collect())
    }

    async fn contacts_count(&self, ctx: &Context<'_>) -> Result<i32> {
        authorize(ctx, self.organization_id(), CampaignField::ContactsCount).await?;
        let count = db(ctx)
            .campaign_contacts()
            .count_for_campaign(self.id())
            .await
            .into_gql()?;
        Ok(clamp_i32(count))
    }

    /// Only dynamic-assignment campaigns that are not archived hand out
    /// contacts on demand
    async fn has_unassigned_contacts_for_texter(&self, ctx: &Context<'_>) -> Result<bool> {
        authorize(
            ctx,
            self.organization_id(),
            CampaignField::HasUnassignedContactsForTexter,
        )
        .await?;
        if !self.0.use_dynamic_assignment || self.0.is_archived {
            return Ok(false);
        }
        db(ctx)
            .campaign_contacts()
            .has_unassigned(self.id())
            .await
            .into_gql()
    }

    async fn has_unassigned_contacts(&self, ctx: &Context<'_>) -> Result<bool> {
        authorize(ctx, self.organization_id(), CampaignField::HasUnassignedContacts).await?;
        db(ctx)
            .campaign_contacts()
            .has_unassigned(self.id())
            .await
            .into_gql()
    }

    async fn has_unsent_initial_messages(&self, ctx: &Context<'_>) -> Result<bool> {
        authorize(ctx, self.organization_id(), CampaignField::HasUnsentInitialMessages).await?;
        db(ctx)
            .campaign_contacts()
            .has_unsent_initial_messages(self.id())
            .await
            .into_gql()
    }

    async fn custom_fields(&self, ctx: &Context<'_>) -> Result<Vec<String>> {
        authorize(ctx, self.organization_id(), CampaignField::CustomFields).await?;
        let repo = db(ctx).campaign_contacts();
        cache(ctx)
            .custom_fields(self.id(), repo.custom_field_keys(self.id()))
            .await
            .into_gql()
    }

    async fn stats(&self) -> CampaignStats {
        CampaignStats {
            campaign_id: self.id(),
            organization_id: self.organization_id(),
        }
    }

    /// Other users currently editing the campaign, comma separated
    async fn editors(&self, ctx: &Context<'_>) -> Result<String> {
        authorize(ctx, self.organization_id(), CampaignField::Editors).await?;
        if !config(ctx).editor_tracking {
            return Ok(String::new());
        }

        let user = ctx.auth_user()?;
        let loaders = ctx.data::<Loaders>()?;
        let name = match loaders.user.load_one(user.user_id).await.into_gql()? {
            Some(record) => record.display_name(),
            None => user.email.clone().unwrap_or_else(|| user.user_id.to_string()),
        };
        Ok(cache(ctx)
            .touch_editor(self.id(), user.user_id, &name)
            .join(", "))
    }

    /// Null unless campaign phone numbers are enabled for the organization
    async fn phone_numbers(&self, ctx: &Context<'_>) -> Result<Option<Vec<PhoneNumberCount>>> {
        authorize(ctx, self.organization_id(), CampaignField::PhoneNumbers).await?;
        let org_enabled = self
            .load_organization(ctx)
            .await?
            .is_some_and(|org| org.feature_enabled(CAMPAIGN_PHONE_NUMBERS_FEATURE));
        if !config(ctx).campaign_phone_numbers && !org_enabled {
            return Ok(None);
        }

        let counts = db(ctx)
            .phone_numbers()
            .count_by_area_code(self.id())
            .await
            .into_gql()?;
        Ok(Some(counts.into_iter().map(PhoneNumberCount).collect()))
    }

    async fn join_url(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        authorize(ctx, self.organization_id(), CampaignField::JoinUrl).await?;
        let Some(token) = self.0.join_token.as_deref() else {
            return Ok(None);
        };
        join_url(&config(ctx).base_url, token).map(Some).into_gql()
    }

    async fn contact_import_job(&self, ctx: &Context<'_>) -> Result<Option<JobRequest>> {
        authorize(ctx, self.organization_id(), CampaignField::ContactImportJob).await?;
        let job = db(ctx)
            .background_jobs()
            .latest_for_campaign(JobType::UploadContacts, self.id())
            .await
            .into_gql()?;
        Ok(job.map(JobRequest))
    }

    async fn start_job(&self, ctx: &Context<'_>) -> Result<Option<JobRequest>> {
        authorize(ctx, self.organization_id(), CampaignField::StartJob).await?;
        let job = db(ctx)
            .background_jobs()
            .latest_for_campaign(JobType::StartCampaign, self.id())
            .await
            .into_gql()?;
        Ok(job.map(JobRequest))
    }

    async fn status(&self, ctx: &Context<'_>) -> Result<CampaignStatus> {
        authorize(ctx, self.organization_id(), CampaignField::Status).await?;
        Ok(derive_status(&StatusFacts::from(&self.0), Utc::now()))
    }

    async fn assignment_summaries(&self, ctx: &Context<'_>) -> Result<Vec<AssignmentSummary>> {
        authorize(ctx, self.organization_id(), CampaignField::AssignmentSummaries).await?;
        let rows = db(ctx).assignments().summaries(self.id()).await.into_gql()?;
        Ok(rows.into_iter().map(AssignmentSummary).collect())
    }
}

/// Blank ids mean "not given"
fn parse_optional_id(raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::InvalidInput(format!("Invalid user id '{}'", raw))),
    }
}

/// `<base>/join-campaign/<token>`, tolerating a trailing slash on the base
fn join_url(base_url: &str, token: &str) -> anyhow::Result<String> {
    let mut url = url::Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("BASE_URL cannot be a base: {}", base_url))?
        .pop_if_empty()
        .push("join-campaign")
        .push(token);
    Ok(url.to_string())
}

// ============================================================================
// Campaign stats
// ============================================================================

pub struct CampaignStats {
    campaign_id: i64,
    organization_id: i64,
}

#[Object]
impl CampaignStats {
    async fn sent_messages_count(&self, ctx: &Context<'_>) -> Result<i32> {
        authorize(ctx, self.organization_id, CampaignField::SentMessagesCount).await?;
        let count = db(ctx)
            .messages()
            .count_for_campaign(self.campaign_id, false)
            .await
            .into_gql()?;
        Ok(clamp_i32(count))
    }

    async fn received_messages_count(&self, ctx: &Context<'_>) -> Result<i32> {
        authorize(ctx, self.organization_id, CampaignField::ReceivedMessagesCount).await?;
        let count = db(ctx)
            .messages()
            .count_for_campaign(self.campaign_id, true)
            .await
            .into_gql()?;
        Ok(clamp_i32(count))
    }

    async fn opt_outs_count(&self, ctx: &Context<'_>) -> Result<i32> {
        authorize(ctx, self.organization_id, CampaignField::OptOutsCount).await?;
        let count = db(ctx)
            .campaign_contacts()
            .opt_outs_count(self.campaign_id)
            .await
            .into_gql()?;
        Ok(clamp_i32(count))
    }
}

// ============================================================================
// Campaign list results
// ============================================================================

#[derive(SimpleObject)]
pub struct CampaignsList {
    pub campaigns: Vec<Campaign>,
}

#[derive(SimpleObject)]
pub struct PaginatedCampaigns {
    pub campaigns: Vec<Campaign>,
    pub page_info: PageInfo,
}

#[derive(Union)]
pub enum CampaignsReturn {
    CampaignsList(CampaignsList),
    PaginatedCampaigns(PaginatedCampaigns),
}

impl From<CampaignQueryResult> for CampaignsReturn {
    fn from(result: CampaignQueryResult) -> Self {
        let wrap = |rows: Vec<CampaignRecord>| -> Vec<Campaign> {
            rows.into_iter().map(Campaign).collect()
        };
        match result {
            CampaignQueryResult::List(rows) => {
                CampaignsReturn::CampaignsList(CampaignsList { campaigns: wrap(rows) })
            }
            CampaignQueryResult::Page {
                campaigns,
                page_info,
            } => CampaignsReturn::PaginatedCampaigns(PaginatedCampaigns {
                campaigns: wrap(campaigns),
                page_info: page_info.into(),
            }),
        }
    }
}

// ============================================================================
// Related entities
// ============================================================================

pub struct Organization(pub OrganizationRecord);

#[Object]
impl Organization {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn name(&self) -> &str {
        &self.0.name
    }
}

pub struct User(pub UserRecord);

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn first_name(&self) -> &str {
        &self.0.first_name
    }

    async fn last_name(&self) -> &str {
        &self.0.last_name
    }

    async fn display_name(&self) -> String {
        self.0.display_name()
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn cell(&self) -> &str {
        &self.0.cell
    }
}

pub struct Assignment(pub AssignmentRecord);

#[Object]
impl Assignment {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn texter(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let loaders = ctx.data::<Loaders>()?;
        Ok(loaders.user.load_one(self.0.user_id).await.into_gql()?.map(User))
    }

    async fn max_contacts(&self) -> Option<i32> {
        self.0.max_contacts.map(clamp_i32)
    }

    async fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0.created_at
    }
}

pub struct CampaignContact(pub CampaignContactRecord);

#[Object]
impl CampaignContact {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn first_name(&self) -> &str {
        &self.0.first_name
    }

    async fn last_name(&self) -> &str {
        &self.0.last_name
    }

    async fn cell(&self) -> &str {
        &self.0.cell
    }

    async fn zip(&self) -> &str {
        &self.0.zip
    }

    /// JSON object text
    async fn custom_fields(&self) -> &str {
        &self.0.custom_fields
    }

    async fn message_status(&self) -> &str {
        &self.0.message_status
    }

    async fn is_opted_out(&self) -> bool {
        self.0.is_opted_out
    }

    async fn assignment_id(&self) -> Option<ID> {
        self.0.assignment_id.map(ID::from)
    }

    async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.0.updated_at
    }
}

#[derive(Clone)]
pub struct InteractionStep(pub InteractionStepRecord);

#[Object]
impl InteractionStep {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn question(&self) -> &str {
        &self.0.question
    }

    async fn script(&self) -> &str {
        &self.0.script
    }

    async fn answer_option(&self) -> &str {
        &self.0.answer_option
    }

    async fn answer_actions(&self) -> &str {
        &self.0.answer_actions
    }

    async fn parent_interaction_id(&self) -> Option<ID> {
        self.0.parent_interaction_id.map(ID::from)
    }
}

pub struct CannedResponse(pub CannedResponseRecord);

#[Object]
impl CannedResponse {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn text(&self) -> &str {
        &self.0.text
    }

    async fn is_user_created(&self) -> bool {
        self.0.user_id.is_some()
    }
}

pub struct JobRequest(pub BackgroundJobRecord);

#[Object]
impl JobRequest {
    async fn id(&self) -> ID {
        ID::from(self.0.id)
    }

    async fn job_type(&self) -> &str {
        &self.0.job_type
    }

    async fn status(&self) -> &str {
        &self.0.status
    }

    async fn result_message(&self) -> &str {
        &self.0.result_message
    }

    async fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.0.updated_at
    }
}

pub struct PhoneNumberCount(pub AreaCodeCount);

#[Object]
impl PhoneNumberCount {
    async fn area_code(&self) -> &str {
        &self.0.area_code
    }

    async fn count(&self) -> i32 {
        clamp_i32(self.0.count)
    }
}

#[derive(SimpleObject)]
pub struct StatusCount {
    pub message_status: String,
    pub count: i32,
}

pub struct AssignmentSummary(pub AssignmentSummaryRecord);

#[Object]
impl AssignmentSummary {
    async fn id(&self) -> ID {
        ID::from(self.0.assignment_id)
    }

    async fn texter_id(&self) -> ID {
        ID::from(self.0.user_id)
    }

    async fn texter_name(&self) -> String {
        format!("{} {}", self.0.first_name, self.0.last_name)
            .trim()
            .to_string()
    }

    async fn contacts_count(&self) -> i32 {
        clamp_i32(self.0.contacts_count())
    }

    async fn status_counts(&self) -> Vec<StatusCount> {
        self.0
            .status_counts
            .iter()
            .map(|(status, count)| StatusCount {
                message_status: status.clone(),
                count: clamp_i32(*count),
            })
            .collect()
    }
}
