//! Upstream resource resolver: branches, staff and schedules.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::endpoints::{
    Endpoints, ALL_STAFF_SHAPES, BRANCH_SHAPES, BRANCH_STAFF_SHAPES, ROSTER_SHAPES,
};
use crate::error::UpstreamFailure;
use crate::normalize::{self, rules, NormalizedStaff, ScheduleRow};
use crate::query::{BranchesQuery, ScheduleQuery, StaffQuery, StaffTarget};
use crate::upstream::{attempt, fetch_first, Fetched, Upstream};
use crate::{Error, Result};

/// Which path produced a staff listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffSource {
    /// A branch-scoped endpoint answered
    Branch,
    /// Business-wide staff filtered by branch on our side
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffListing {
    pub ok: bool,
    pub branch_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub count: usize,
    pub source: StaffSource,
    /// Label of the endpoint shape that answered
    pub endpoint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub staff: Vec<NormalizedStaff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub rows: Vec<ScheduleRow>,
}

pub struct Resolver<U> {
    upstream: U,
    endpoints: Endpoints,
    staff_fallback: bool,
}

impl<U: Upstream> Resolver<U> {
    pub fn new(upstream: U, endpoints: Endpoints) -> Self {
        Self {
            upstream,
            endpoints,
            staff_fallback: true,
        }
    }

    /// Whether staff resolution falls back to the business-wide list after
    /// every branch-scoped candidate failed.
    pub fn with_staff_fallback(mut self, enabled: bool) -> Self {
        self.staff_fallback = enabled;
        self
    }

    async fn fetch_branches(&self) -> std::result::Result<Fetched, UpstreamFailure> {
        let candidates = self.endpoints.candidates(BRANCH_SHAPES, &());
        fetch_first(&self.upstream, "branches", &candidates).await
    }

    /// Branch list, normalized unless the raw upstream records were asked for.
    pub async fn resolve_branches(&self, query: &BranchesQuery) -> Result<Vec<Value>> {
        let fetched = self.fetch_branches().await?;
        info!(count = fetched.records.len(), endpoint = fetched.label, "Resolved branches");

        if query.raw {
            return Ok(fetched.records);
        }
        Ok(fetched.records.iter().map(normalize::normalize_branch).collect())
    }

    /// Find the branch whose account identifier matches.
    pub async fn branch_for_account(&self, account_id: &str) -> Result<String> {
        let fetched = self.fetch_branches().await?;

        fetched
            .records
            .iter()
            .find(|branch| rules::BRANCH_ACCOUNT_ID.text(branch).as_deref() == Some(account_id))
            .and_then(|branch| rules::BRANCH_ID.text(branch))
            .ok_or_else(|| Error::NotFound {
                message: format!("no branch for accountId {}", account_id),
                details: json!({
                    "accountId": account_id,
                    "branchesChecked": fetched.records.len(),
                }),
            })
    }

    pub async fn resolve_staff(&self, query: &StaffQuery) -> Result<StaffListing> {
        let (branch_id, account_id) = match &query.target {
            StaffTarget::Branch(branch_id) => (branch_id.clone(), None),
            StaffTarget::Account(account_id) => {
                let branch_id = self.branch_for_account(account_id).await?;
                info!(account_id = %account_id, branch_id = %branch_id, "Resolved account to branch");
                (branch_id, Some(account_id.clone()))
            }
        };

        let candidates = self
            .endpoints
            .candidates(BRANCH_STAFF_SHAPES, branch_id.as_str());
        let mut attempts = Vec::new();
        let mut answered_empty = false;

        for candidate in &candidates {
            match attempt(&self.upstream, candidate).await {
                Ok(fetched) => {
                    let staff: Vec<NormalizedStaff> = fetched
                        .records
                        .iter()
                        .filter(|s| query.include_inactive || normalize::is_active(s))
                        .map(|s| normalize::normalize_staff(s, &branch_id))
                        .collect();

                    if !staff.is_empty() || !query.try_all {
                        info!(branch_id = %branch_id, count = staff.len(), endpoint = fetched.label, "Resolved staff");
                        return Ok(listing(
                            branch_id,
                            account_id,
                            StaffSource::Branch,
                            fetched,
                            staff,
                            query.raw,
                        ));
                    }
                    answered_empty = true;
                }
                Err(failure) => attempts.push(failure),
            }
        }

        if !answered_empty && !self.staff_fallback {
            return Err(UpstreamFailure::new("staff", attempts).into());
        }

        warn!(
            branch_id = %branch_id,
            failed_attempts = attempts.len(),
            "Branch-scoped staff unavailable, falling back to all staff"
        );
        let fallback = self.endpoints.candidates(ALL_STAFF_SHAPES, &());
        let fetched = match fetch_first(&self.upstream, "staff", &fallback).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                attempts.extend(failure.attempts);
                return Err(UpstreamFailure::new("staff", attempts).into());
            }
        };

        let staff: Vec<NormalizedStaff> = fetched
            .records
            .iter()
            .filter(|s| normalize::include_staff(s, Some(branch_id.as_str()), query.include_inactive))
            .map(|s| normalize::normalize_staff(s, &branch_id))
            .collect();

        info!(branch_id = %branch_id, count = staff.len(), "Resolved staff from fallback");
        let mut result = listing(
            branch_id,
            account_id,
            StaffSource::Fallback,
            fetched,
            staff,
            query.raw,
        );
        result.note = Some("fallback: all-staff filtered by branchId".to_string());
        Ok(result)
    }

    /// One row per roster entry, in upstream order.
    pub async fn resolve_schedule(&self, query: &ScheduleQuery) -> Result<Schedule> {
        let candidates = self.endpoints.candidates(ROSTER_SHAPES, query);
        let fetched = fetch_first(&self.upstream, "schedule", &candidates).await?;

        let rows: Vec<ScheduleRow> = fetched.records.iter().map(normalize::schedule_row).collect();
        info!(
            branch_id = %query.branch_id,
            staff_id = %query.staff_id,
            count = rows.len(),
            "Resolved schedule"
        );
        Ok(Schedule { rows })
    }
}

fn listing(
    branch_id: String,
    account_id: Option<String>,
    source: StaffSource,
    fetched: Fetched,
    staff: Vec<NormalizedStaff>,
    include_raw: bool,
) -> StaffListing {
    StaffListing {
        ok: true,
        branch_id,
        account_id,
        count: staff.len(),
        source,
        endpoint: fetched.label,
        note: None,
        staff,
        raw: include_raw.then_some(fetched.body),
    }
}
