use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::FilterError;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Lifecycle status of an order as reported by the Order Service.
///
/// `Hold`, `Refilled`, `Refill` and `Cancelled` only appear in filter option
/// lists; the eligibility rules never single them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Awaiting,
    Pending,
    InProgress,
    Processing,
    Completed,
    Partial,
    Canceled,
    OnRefill,
    Fail,
    Error,
    Hold,
    Refilled,
    Refill,
    Cancelled,
}

impl StatusCode {
    /// Statuses offered by the status filter bar, in display order.
    pub const FILTER_OPTIONS: [StatusCode; 14] = [
        StatusCode::Awaiting,
        StatusCode::Pending,
        StatusCode::InProgress,
        StatusCode::Processing,
        StatusCode::Completed,
        StatusCode::Partial,
        StatusCode::Canceled,
        StatusCode::OnRefill,
        StatusCode::Fail,
        StatusCode::Error,
        StatusCode::Hold,
        StatusCode::Refilled,
        StatusCode::Refill,
        StatusCode::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Awaiting => "AWAITING",
            StatusCode::Pending => "PENDING",
            StatusCode::InProgress => "IN_PROGRESS",
            StatusCode::Processing => "PROCESSING",
            StatusCode::Completed => "COMPLETED",
            StatusCode::Partial => "PARTIAL",
            StatusCode::Canceled => "CANCELED",
            StatusCode::OnRefill => "ON_REFILL",
            StatusCode::Fail => "FAIL",
            StatusCode::Error => "ERROR",
            StatusCode::Hold => "HOLD",
            StatusCode::Refilled => "REFILLED",
            StatusCode::Refill => "REFILL",
            StatusCode::Cancelled => "CANCELLED",
        }
    }

    /// CANCELED, FAIL, ERROR
    pub fn is_terminal_negative(&self) -> bool {
        matches!(self, StatusCode::Canceled | StatusCode::Fail | StatusCode::Error)
    }

    /// PARTIAL, PENDING, PROCESSING, IN_PROGRESS, COMPLETED
    pub fn is_active_lifecycle(&self) -> bool {
        matches!(
            self,
            StatusCode::Partial
                | StatusCode::Pending
                | StatusCode::Processing
                | StatusCode::InProgress
                | StatusCode::Completed
        )
    }

    /// Statuses that block a bulk manual status change.
    pub fn blocks_status_change(&self) -> bool {
        matches!(
            self,
            StatusCode::Awaiting | StatusCode::Canceled | StatusCode::Fail | StatusCode::Error
        )
    }

    /// Statuses that may never be cancelled and refunded.
    pub fn blocks_cancel_and_refund(&self) -> bool {
        self.is_terminal_negative()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target statuses offered by the manual status change dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManualStatus {
    Pending,
    Processing,
    InProgress,
    Completed,
}

impl From<ManualStatus> for StatusCode {
    fn from(status: ManualStatus) -> Self {
        match status {
            ManualStatus::Pending => StatusCode::Pending,
            ManualStatus::Processing => StatusCode::Processing,
            ManualStatus::InProgress => StatusCode::InProgress,
            ManualStatus::Completed => StatusCode::Completed,
        }
    }
}

/// Fulfilment mode of an order; `All` is the filter wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    #[default]
    All,
    Auto,
    Manual,
}

impl OrderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::All => "all",
            OrderMode::Auto => "auto",
            OrderMode::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    OrderAmount,
    TotalCost,
    Profit,
    Status,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::OrderAmount => "order_amount",
            SortColumn::TotalCost => "total_cost_thb",
            SortColumn::Profit => "profit_thb",
            SortColumn::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// Rows per page. Only the sizes offered by the pagination control are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const ALLOWED: [u32; 5] = [10, 20, 30, 50, 100];

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize(20)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = FilterError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(PageSize(value))
        } else {
            Err(FilterError::InvalidPageSize(value))
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_groups_are_disjoint() {
        for status in StatusCode::FILTER_OPTIONS {
            assert!(
                !(status.is_terminal_negative() && status.is_active_lifecycle()),
                "{status} belongs to both groups"
            );
        }
    }

    #[test]
    fn test_status_groups_membership() {
        let negative: Vec<_> = StatusCode::FILTER_OPTIONS
            .into_iter()
            .filter(StatusCode::is_terminal_negative)
            .collect();
        assert_eq!(negative, vec![StatusCode::Canceled, StatusCode::Fail, StatusCode::Error]);

        let active: Vec<_> = StatusCode::FILTER_OPTIONS
            .into_iter()
            .filter(StatusCode::is_active_lifecycle)
            .collect();
        assert_eq!(
            active,
            vec![
                StatusCode::Pending,
                StatusCode::InProgress,
                StatusCode::Processing,
                StatusCode::Completed,
                StatusCode::Partial,
            ]
        );

        assert!(!StatusCode::Awaiting.is_terminal_negative());
        assert!(!StatusCode::OnRefill.is_active_lifecycle());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&StatusCode::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");

        let status: StatusCode = serde_json::from_str("\"ON_REFILL\"").unwrap();
        assert_eq!(status, StatusCode::OnRefill);
        assert_eq!(status.to_string(), "ON_REFILL");
    }

    #[test]
    fn test_manual_status_maps_to_status_code() {
        assert_eq!(StatusCode::from(ManualStatus::InProgress), StatusCode::InProgress);
        assert_eq!(StatusCode::from(ManualStatus::Completed), StatusCode::Completed);
    }

    #[test]
    fn test_page_size_validation() {
        assert_eq!(PageSize::try_from(50).unwrap().get(), 50);
        assert!(matches!(PageSize::try_from(25), Err(FilterError::InvalidPageSize(25))));
        assert_eq!(PageSize::default().get(), 20);

        let size: Result<PageSize, _> = serde_json::from_str("7");
        assert!(size.is_err());
    }
}
