//! Status enums for orders, cases, and guarantees.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status string does not name a known value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Channel an order was placed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChannel {
    /// Placed by the customer on the storefront.
    Web,
    /// Placed by staff in the back office, usually over the phone.
    Phone,
}

/// Processing status of a persisted case record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Record created, case submitted or about to be.
    #[default]
    Pending,
    /// The risk service opened an investigation.
    Open,
    /// The risk service finished reviewing the case.
    Completed,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open => write!(f, "OPEN"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "OPEN" => Ok(Self::Open),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(ParseStatusError::new("case status", s)),
        }
    }
}

/// Financial-liability decision on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Guarantee {
    Approved,
    Declined,
    Pending,
    InReview,
    Canceled,
    Unrequested,
    /// No guarantee applies to the case.
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Guarantee {
    /// Wire representation used by the risk service and the case table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Declined => "DECLINED",
            Self::Pending => "PENDING",
            Self::InReview => "IN_REVIEW",
            Self::Canceled => "CANCELED",
            Self::Unrequested => "UNREQUESTED",
            Self::NotApplicable => "N/A",
        }
    }

    /// Whether a cancellation request may be sent for this guarantee.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        !matches!(self, Self::Declined | Self::NotApplicable)
    }
}

impl std::fmt::Display for Guarantee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Guarantee {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(Self::Approved),
            "DECLINED" => Ok(Self::Declined),
            "PENDING" => Ok(Self::Pending),
            "IN_REVIEW" => Ok(Self::InReview),
            "CANCELED" => Ok(Self::Canceled),
            "UNREQUESTED" => Ok(Self::Unrequested),
            "N/A" => Ok(Self::NotApplicable),
            _ => Err(ParseStatusError::new("guarantee", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_guarantee_round_trips_through_str() {
        for guarantee in [
            Guarantee::Approved,
            Guarantee::Declined,
            Guarantee::Pending,
            Guarantee::InReview,
            Guarantee::Canceled,
            Guarantee::Unrequested,
            Guarantee::NotApplicable,
        ] {
            assert_eq!(guarantee.as_str().parse::<Guarantee>().unwrap(), guarantee);
        }
    }

    #[test]
    fn test_guarantee_not_applicable_serializes_as_na() {
        assert_eq!(
            serde_json::to_string(&Guarantee::NotApplicable).unwrap(),
            "\"N/A\""
        );
        assert_eq!(
            serde_json::to_string(&Guarantee::InReview).unwrap(),
            "\"IN_REVIEW\""
        );
    }

    #[test]
    fn test_guarantee_cancelable() {
        assert!(Guarantee::Approved.is_cancelable());
        assert!(Guarantee::Pending.is_cancelable());
        assert!(!Guarantee::Declined.is_cancelable());
        assert!(!Guarantee::NotApplicable.is_cancelable());
    }

    #[test]
    fn test_unknown_guarantee_is_rejected() {
        let err = "MAYBE".parse::<Guarantee>().unwrap_err();
        assert_eq!(err.to_string(), "invalid guarantee: MAYBE");
    }

    #[test]
    fn test_case_status_display_matches_parse() {
        for status in [CaseStatus::Pending, CaseStatus::Open, CaseStatus::Completed] {
            assert_eq!(status.to_string().parse::<CaseStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_order_channel_serialization() {
        assert_eq!(serde_json::to_string(&OrderChannel::Web).unwrap(), "\"WEB\"");
        assert_eq!(
            serde_json::to_string(&OrderChannel::Phone).unwrap(),
            "\"PHONE\""
        );
    }
}
