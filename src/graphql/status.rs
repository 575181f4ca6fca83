//! Campaign status derivation
//!
//! The reported status is the first tier that matches, in this order:
//! not started, archived, closed, overdue (closed for initial sends), then the
//! stored status or ACTIVE.

use async_graphql::Enum;
use chrono::{DateTime, NaiveTime, Utc};

use crate::db::CampaignRecord;

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    NotStarted,
    Active,
    Archived,
    Closed,
    ClosedForInitialSends,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::NotStarted => "NOT_STARTED",
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Archived => "ARCHIVED",
            CampaignStatus::Closed => "CLOSED",
            CampaignStatus::ClosedForInitialSends => "CLOSED_FOR_INITIAL_SENDS",
        }
    }

    /// Parse a stored status. Unknown values read as absent.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "NOT_STARTED" => Some(CampaignStatus::NotStarted),
            "ACTIVE" => Some(CampaignStatus::Active),
            "ARCHIVED" => Some(CampaignStatus::Archived),
            "CLOSED" => Some(CampaignStatus::Closed),
            "CLOSED_FOR_INITIAL_SENDS" => Some(CampaignStatus::ClosedForInitialSends),
            _ => None,
        }
    }
}

/// Inputs the status depends on
#[derive(Debug, Clone, Copy)]
pub struct StatusFacts {
    pub is_started: bool,
    pub is_archived: bool,
    pub stored: Option<CampaignStatus>,
    pub due_by: Option<DateTime<Utc>>,
}

impl From<&CampaignRecord> for StatusFacts {
    fn from(c: &CampaignRecord) -> Self {
        Self {
            is_started: c.is_started,
            is_archived: c.is_archived,
            stored: c.status.as_deref().and_then(CampaignStatus::from_stored),
            due_by: c.due_by,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusTier {
    NotStarted,
    Archived,
    Closed,
    Overdue,
    Fallback,
}

const TIERS: [StatusTier; 5] = [
    StatusTier::NotStarted,
    StatusTier::Archived,
    StatusTier::Closed,
    StatusTier::Overdue,
    StatusTier::Fallback,
];

impl StatusTier {
    fn evaluate(self, facts: &StatusFacts, now: DateTime<Utc>) -> Option<CampaignStatus> {
        use CampaignStatus as S;

        match self {
            StatusTier::NotStarted => {
                (!facts.is_started || facts.stored == Some(S::NotStarted)).then_some(S::NotStarted)
            }
            StatusTier::Archived => {
                (facts.is_archived || facts.stored == Some(S::Archived)).then_some(S::Archived)
            }
            StatusTier::Closed => (facts.stored == Some(S::Closed)).then_some(S::Closed),
            StatusTier::Overdue => {
                let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
                facts
                    .due_by
                    .is_some_and(|due| start_of_day > due)
                    .then_some(S::ClosedForInitialSends)
            }
            StatusTier::Fallback => Some(facts.stored.unwrap_or(S::Active)),
        }
    }
}

/// Status reported for a campaign at `now`
pub fn derive_status(facts: &StatusFacts, now: DateTime<Utc>) -> CampaignStatus {
    TIERS
        .iter()
        .find_map(|tier| tier.evaluate(facts, now))
        .unwrap_or(CampaignStatus::Active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 13, 0, 0).unwrap()
    }

    fn active() -> StatusFacts {
        StatusFacts {
            is_started: true,
            is_archived: false,
            stored: None,
            due_by: None,
        }
    }

    #[test]
    fn test_not_started_wins_over_stored_status() {
        let facts = StatusFacts {
            is_started: false,
            stored: Some(CampaignStatus::Active),
            ..active()
        };
        assert_eq!(derive_status(&facts, now()), CampaignStatus::NotStarted);
    }

    #[test]
    fn test_archived_wins_over_future_due_date() {
        let facts = StatusFacts {
            is_archived: true,
            due_by: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            ..active()
        };
        assert_eq!(derive_status(&facts, now()), CampaignStatus::Archived);

        let stored = StatusFacts {
            stored: Some(CampaignStatus::Archived),
            ..active()
        };
        assert_eq!(derive_status(&stored, now()), CampaignStatus::Archived);
    }

    #[test]
    fn test_stored_closed() {
        let facts = StatusFacts {
            stored: Some(CampaignStatus::Closed),
            due_by: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ..active()
        };
        assert_eq!(derive_status(&facts, now()), CampaignStatus::Closed);
    }

    #[test]
    fn test_overdue_compares_against_start_of_day() {
        let yesterday = StatusFacts {
            due_by: Some(Utc.with_ymd_and_hms(2024, 6, 14, 23, 59, 0).unwrap()),
            ..active()
        };
        assert_eq!(
            derive_status(&yesterday, now()),
            CampaignStatus::ClosedForInitialSends
        );

        // Due earlier today is not yet overdue
        let this_morning = StatusFacts {
            due_by: Some(Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap()),
            ..active()
        };
        assert_eq!(derive_status(&this_morning, now()), CampaignStatus::Active);
    }

    #[test]
    fn test_fallback() {
        assert_eq!(derive_status(&active(), now()), CampaignStatus::Active);
        assert_eq!(CampaignStatus::from_stored("PAUSED"), None);

        let stored = StatusFacts {
            stored: Some(CampaignStatus::ClosedForInitialSends),
            ..active()
        };
        assert_eq!(
            derive_status(&stored, now()),
            CampaignStatus::ClosedForInitialSends
        );
    }
}
