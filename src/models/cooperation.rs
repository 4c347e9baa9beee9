//! Cooperation relation between two agencies.
//!
//! `from_agency_id` requests access, `to_agency_id` owns the resources and
//! reviews the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooperationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Terminated,
}

text_enum!(CooperationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Expired => "expired",
    Terminated => "terminated",
});

impl CooperationStatus {
    /// Pending and approved relations block a new request for the same pair
    pub fn is_active(&self) -> bool {
        matches!(self, CooperationStatus::Pending | CooperationStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Allowed state machine edges
    pub fn can_transition_to(&self, next: CooperationStatus) -> bool {
        use CooperationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Expired) | (Approved, Terminated)
        )
    }
}

/// Role filter for listing relations from one agency's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooperationRole {
    /// I am `to_agency_id`
    Provider,
    /// I am `from_agency_id`
    Consumer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperationRelation {
    pub id: Uuid,
    pub from_agency_id: Uuid,
    pub to_agency_id: Uuid,
    pub status: CooperationStatus,
    pub request_message: Option<String>,
    pub response_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expired_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub reviewed_by: Option<Uuid>,
}

impl CooperationRelation {
    pub fn involves(&self, agency_id: Uuid) -> bool {
        self.from_agency_id == agency_id || self.to_agency_id == agency_id
    }

    /// The counterpart of `agency_id` in this relation
    pub fn other_party(&self, agency_id: Uuid) -> Uuid {
        if self.from_agency_id == agency_id {
            self.to_agency_id
        } else {
            self.from_agency_id
        }
    }

    pub fn visible_to(&self, agency_id: Uuid, role: Option<CooperationRole>) -> bool {
        match role {
            Some(CooperationRole::Provider) => self.to_agency_id == agency_id,
            Some(CooperationRole::Consumer) => self.from_agency_id == agency_id,
            None => self.involves(agency_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CooperationStatus::*;

    #[test]
    fn test_transitions_are_one_directional() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Terminated));

        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Terminated));
        for terminal in [Rejected, Expired, Terminated] {
            for next in [Pending, Approved, Rejected, Expired, Terminated] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_active_states() {
        assert!(Pending.is_active());
        assert!(Approved.is_active());
        assert!(Rejected.is_terminal());
        assert!(Expired.is_terminal());
        assert!(Terminated.is_terminal());
    }
}
