//! Date pivot resolution: which timestamp places an order inside a window.
//!
//! Stateless and free of I/O. When payments are not embedded in the order the
//! caller fetches them first and passes them in.

use crate::domain::{Order, Payment, TimeMs};
use std::fmt;
use std::str::FromStr;

/// Which timestamp decides window membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PivotMode {
    #[default]
    Created,
    Paid,
    /// Created or paid inside the window.
    Both,
}

impl PivotMode {
    /// Whether the upstream search must be widened to catch orders created
    /// before the window but paid inside it.
    pub fn needs_lookback(&self) -> bool {
        !matches!(self, PivotMode::Created)
    }
}

impl FromStr for PivotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(PivotMode::Created),
            "paid" => Ok(PivotMode::Paid),
            "both" => Ok(PivotMode::Both),
            other => Err(format!("must be created, paid, or both, got {}", other)),
        }
    }
}

impl fmt::Display for PivotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PivotMode::Created => write!(f, "created"),
            PivotMode::Paid => write!(f, "paid"),
            PivotMode::Both => write!(f, "both"),
        }
    }
}

/// Earliest settlement time across approved/accredited payments and the
/// order's closing time.
pub fn paid_timestamp(order: &Order, payments: &[Payment]) -> Option<TimeMs> {
    payments
        .iter()
        .filter(|p| p.is_settled())
        .filter_map(Payment::settled_at)
        .chain(order.closed_at())
        .min()
}

pub fn created_timestamp(order: &Order) -> Option<TimeMs> {
    order.created_at()
}

fn within(t: Option<TimeMs>, from: TimeMs, to: TimeMs) -> bool {
    t.is_some_and(|t| t >= from && t <= to)
}

/// Inclusive window check under the given mode.
pub fn is_in_range(
    order: &Order,
    payments: &[Payment],
    mode: PivotMode,
    from: TimeMs,
    to: TimeMs,
) -> bool {
    match mode {
        PivotMode::Created => within(created_timestamp(order), from, to),
        PivotMode::Paid => within(paid_timestamp(order, payments), from, to),
        PivotMode::Both => {
            within(created_timestamp(order), from, to)
                || within(paid_timestamp(order, payments), from, to)
        }
    }
}

/// Timestamp reported in the FECHA column.
pub fn pivot_timestamp(order: &Order, payments: &[Payment], mode: PivotMode) -> Option<TimeMs> {
    match mode {
        PivotMode::Created => created_timestamp(order),
        PivotMode::Paid | PivotMode::Both => {
            paid_timestamp(order, payments).or_else(|| created_timestamp(order))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(created: &str, closed: Option<&str>) -> Order {
        Order {
            id: Some(1),
            date_created: Some(created.to_string()),
            date_closed: closed.map(str::to_string),
            ..Default::default()
        }
    }

    fn payment(status: &str, approved: Option<&str>, created: Option<&str>) -> Payment {
        Payment {
            status: Some(status.to_string()),
            date_approved: approved.map(str::to_string),
            date_created: created.map(str::to_string),
            ..Default::default()
        }
    }

    fn ts(s: &str) -> TimeMs {
        TimeMs::parse_rfc3339(s).unwrap()
    }

    #[test]
    fn test_paid_timestamp_takes_minimum() {
        let o = order("2024-05-01T10:00:00Z", Some("2024-05-04T00:00:00Z"));
        let payments = vec![
            payment("approved", Some("2024-05-05T00:00:00Z"), None),
            payment("approved", None, Some("2024-05-03T00:00:00Z")),
            payment("rejected", Some("2024-05-02T00:00:00Z"), None),
        ];
        assert_eq!(paid_timestamp(&o, &payments), Some(ts("2024-05-03T00:00:00Z")));
    }

    #[test]
    fn test_paid_timestamp_uses_closing_time_alone() {
        let o = order("2024-05-01T10:00:00Z", Some("2024-05-02T00:00:00Z"));
        assert_eq!(paid_timestamp(&o, &[]), Some(ts("2024-05-02T00:00:00Z")));
        assert_eq!(paid_timestamp(&order("2024-05-01T10:00:00Z", None), &[]), None);
    }

    #[test]
    fn test_paid_mode_requires_resolved_payment() {
        let o = order("2024-05-01T10:00:00Z", None);
        let from = ts("2024-05-01T00:00:00Z");
        let to = ts("2024-05-01T23:59:59Z");
        assert!(is_in_range(&o, &[], PivotMode::Created, from, to));
        assert!(!is_in_range(&o, &[], PivotMode::Paid, from, to));
    }

    #[test]
    fn test_both_mode_excludes_window_between_creation_and_payment() {
        let o = order("2024-05-01T10:00:00Z", None);
        let payments = vec![payment("approved", Some("2024-05-05T10:00:00Z"), None)];
        let from = ts("2024-05-03T00:00:00Z");
        let to = ts("2024-05-03T23:59:59Z");
        assert!(!is_in_range(&o, &payments, PivotMode::Both, from, to));

        let first_day = ts("2024-05-01T00:00:00Z");
        assert!(is_in_range(&o, &payments, PivotMode::Both, first_day, from));
        assert!(is_in_range(&o, &payments, PivotMode::Both, to, ts("2024-05-05T23:59:59Z")));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let o = order("2024-05-01T10:00:00Z", None);
        let t = ts("2024-05-01T10:00:00Z");
        assert!(is_in_range(&o, &[], PivotMode::Created, t, t));
    }

    #[test]
    fn test_unparsable_created_is_out_of_range() {
        let o = order("not a date", None);
        assert!(!is_in_range(&o, &[], PivotMode::Created, TimeMs::new(0), TimeMs::new(i64::MAX)));
    }

    #[test]
    fn test_pivot_timestamp_prefers_paid() {
        let o = order("2024-05-01T10:00:00Z", None);
        let payments = vec![payment("approved", Some("2024-05-05T00:00:00Z"), None)];
        assert_eq!(
            pivot_timestamp(&o, &payments, PivotMode::Created),
            Some(ts("2024-05-01T10:00:00Z"))
        );
        assert_eq!(
            pivot_timestamp(&o, &payments, PivotMode::Both),
            Some(ts("2024-05-05T00:00:00Z"))
        );
        assert_eq!(
            pivot_timestamp(&o, &[], PivotMode::Paid),
            Some(ts("2024-05-01T10:00:00Z"))
        );
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("BOTH".parse::<PivotMode>(), Ok(PivotMode::Both));
        assert!("closed".parse::<PivotMode>().is_err());
        assert!(PivotMode::Paid.needs_lookback());
        assert!(!PivotMode::Created.needs_lookback());
    }
}
