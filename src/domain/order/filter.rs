use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::value_objects::{OrderMode, PageSize, SortSpec, StatusCode};

// ============================================================================
// Filter State Store
// ============================================================================
//
// Holds the query the user is constructing. Every mutation goes through
// `FilterState::apply`, which also resets pagination. Whether a change is
// fetched immediately or after the search debounce is reported back to the
// caller as a `FilterEffect`.
//
// ============================================================================

/// Inclusive date bounds. Both must be present before the query is fetchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub date_range: DateRange,
    /// Empty means "all statuses".
    pub statuses: BTreeSet<StatusCode>,
    pub category_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub mode: OrderMode,
    pub source: Option<String>,
    pub sort: SortSpec,
    pub show_negative_profit: bool,
    pub page: u32,
    pub page_size: PageSize,
}

/// A single field update. This is the only way the filter changes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterField {
    Search(String),
    DateStart(Option<NaiveDate>),
    DateEnd(Option<NaiveDate>),
    /// `None` selects "All"; `Some` toggles that status.
    Status(Option<StatusCode>),
    Category(Option<Uuid>),
    Provider(Option<Uuid>),
    Service(Option<Uuid>),
    User(Option<Uuid>),
    Mode(OrderMode),
    Source(Option<String>),
    Sort(SortSpec),
    ShowNegativeProfit(bool),
    Page(u32),
    PageSize(PageSize),
}

impl FilterField {
    pub fn name(&self) -> &'static str {
        match self {
            FilterField::Search(_) => "search",
            FilterField::DateStart(_) => "date_start",
            FilterField::DateEnd(_) => "date_end",
            FilterField::Status(_) => "status",
            FilterField::Category(_) => "category",
            FilterField::Provider(_) => "provider",
            FilterField::Service(_) => "service",
            FilterField::User(_) => "user",
            FilterField::Mode(_) => "mode",
            FilterField::Source(_) => "source",
            FilterField::Sort(_) => "sort",
            FilterField::ShowNegativeProfit(_) => "show_negative_profit",
            FilterField::Page(_) => "page",
            FilterField::PageSize(_) => "page_size",
        }
    }
}

/// How a filter change propagates to the fetch orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEffect {
    Immediate,
    Debounced,
}

/// Knobs for the state a controller starts from and resets to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDefaults {
    pub lookback_months: u32,
    pub page_size: PageSize,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            lookback_months: 3,
            page_size: PageSize::default(),
        }
    }
}

impl FilterDefaults {
    pub fn build(&self, today: NaiveDate) -> FilterState {
        FilterState::defaults(today, self.lookback_months, self.page_size)
    }
}

impl FilterState {
    pub fn defaults(today: NaiveDate, lookback_months: u32, page_size: PageSize) -> Self {
        let start = today
            .checked_sub_months(Months::new(lookback_months))
            .unwrap_or(today);

        Self {
            search: String::new(),
            date_range: DateRange {
                start: Some(start_of_day(start)),
                end: Some(end_of_day(today)),
            },
            statuses: BTreeSet::new(),
            category_id: None,
            provider_id: None,
            service_id: None,
            user_id: None,
            mode: OrderMode::All,
            source: None,
            sort: SortSpec::default(),
            show_negative_profit: false,
            page: 1,
            page_size,
        }
    }

    /// Apply one field update.
    pub fn apply(&mut self, field: FilterField) -> FilterEffect {
        let effect = match field {
            FilterField::Search(_) => FilterEffect::Debounced,
            _ => FilterEffect::Immediate,
        };

        self.page = 1;

        match field {
            FilterField::Search(text) => self.search = text,
            FilterField::DateStart(date) => self.set_start(date),
            FilterField::DateEnd(date) => self.date_range.end = date.map(end_of_day),
            FilterField::Status(status) => self.toggle_status(status),
            FilterField::Category(id) => self.category_id = id,
            FilterField::Provider(id) => self.provider_id = id,
            FilterField::Service(id) => self.service_id = id,
            FilterField::User(id) => self.user_id = id,
            FilterField::Mode(mode) => self.mode = mode,
            FilterField::Source(source) => {
                self.source = source.filter(|s| !s.trim().is_empty());
            }
            FilterField::Sort(sort) => self.sort = sort,
            FilterField::ShowNegativeProfit(on) => self.show_negative_profit = on,
            FilterField::Page(page) => self.page = page.max(1),
            FilterField::PageSize(size) => self.page_size = size,
        }

        effect
    }

    fn set_start(&mut self, date: Option<NaiveDate>) {
        let Some(date) = date else {
            self.date_range.start = None;
            return;
        };

        let start = start_of_day(date);
        self.date_range.start = Some(start);

        if let Some(end) = self.date_range.end {
            if start > end {
                self.date_range.end = Some(end_of_day(date));
            }
        }
    }

    fn toggle_status(&mut self, status: Option<StatusCode>) {
        match status {
            None => self.statuses.clear(),
            Some(status) if self.statuses.contains(&status) => {
                self.statuses.remove(&status);
            }
            Some(status) => {
                self.statuses.clear();
                self.statuses.insert(status);
            }
        }
    }

    /// The query is fetchable only when both date bounds are set.
    pub fn is_ready(&self) -> bool {
        self.date_range.bounds().is_some()
    }

    /// True when the status filter holds exactly `status` and nothing else.
    pub fn status_filter_is_only(&self, status: StatusCode) -> bool {
        self.statuses.len() == 1 && self.statuses.contains(&status)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size.get())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
