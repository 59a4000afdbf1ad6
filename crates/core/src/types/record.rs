//! Persisted case record, one per order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{CaseStatus, Guarantee};

/// Connector-side bookkeeping for a submitted case.
///
/// Keyed by the host order increment id. Created on the first submission
/// attempt and updated as guarantee decisions arrive; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    /// Host order increment id.
    pub id: String,
    pub signifyd_status: CaseStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub guarantee: Option<Guarantee>,
    /// Case id assigned by the risk service.
    pub code: Option<String>,
    pub entries_text: String,
}

impl CaseRecord {
    /// A fresh `PENDING` record for an order.
    #[must_use]
    pub fn pending(order_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: order_id.into(),
            signifyd_status: CaseStatus::Pending,
            created: now,
            updated: now,
            guarantee: None,
            code: None,
            entries_text: String::new(),
        }
    }

    /// Record a guarantee decision and bump `updated`.
    pub fn set_guarantee(&mut self, guarantee: Guarantee, now: DateTime<Utc>) {
        self.guarantee = Some(guarantee);
        self.updated = now;
    }
}
