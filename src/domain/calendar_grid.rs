use crate::domain::date_matcher::normalize;
use crate::domain::models::Task;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const GRID_WEEKS: usize = 5;
pub const GRID_CELLS: usize = GRID_WEEKS * 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(format!("invalid month: {year}-{month:02}"));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Result<NaiveDate, String> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| format!("invalid month: {}-{:02}", self.year, self.month))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn shift(&self, delta_months: i32) -> Result<Self, String> {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + delta_months as i64;
        let year = i32::try_from(index.div_euclid(12))
            .map_err(|_| format!("month shift out of range: {delta_months}"))?;
        let month = index.rem_euclid(12) as u32 + 1;
        Self::new(year, month)
    }

    /// Full heading such as "October 2026".
    pub fn label(&self) -> Result<String, String> {
        Ok(self.first_day()?.format("%B %Y").to_string())
    }

    /// Abbreviated month name such as "Oct".
    pub fn short_label(&self) -> Result<String, String> {
        Ok(self.first_day()?.format("%b").to_string())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCell {
    pub index: usize,
    pub day_of_month: u32,
    pub date_key: String,
    pub day_name: String,
    pub in_current_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub has_items: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarGrid {
    pub month: MonthRef,
    pub cells: Vec<CalendarCell>,
    pub selected_index: Option<usize>,
    pub selected_date: Option<String>,
}

impl CalendarGrid {
    pub fn selected_cell(&self) -> Option<&CalendarCell> {
        self.selected_index.and_then(|index| self.cells.get(index))
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Collects the canonical day keys of every task whose date normalizes.
pub fn item_date_keys(items: &[Task]) -> HashSet<String> {
    items.iter().filter_map(|task| normalize(&task.date)).collect()
}

/// First cell of the grid: the Sunday on or before the first of `month`.
pub fn display_start(month: MonthRef) -> Result<NaiveDate, String> {
    let first = month.first_day()?;
    let offset = u64::from(first.weekday().num_days_from_sunday());
    first
        .checked_sub_days(Days::new(offset))
        .ok_or_else(|| format!("grid start out of range for {}-{:02}", month.year, month.month))
}

pub fn build_grid(
    month: MonthRef,
    today: NaiveDate,
    item_keys: &HashSet<String>,
    selected_index: Option<usize>,
) -> Result<CalendarGrid, String> {
    let start = display_start(month)?;
    let dates = start
        .iter_days()
        .take(GRID_CELLS)
        .collect::<Vec<_>>();
    if dates.len() != GRID_CELLS {
        return Err(format!("grid end out of range for {}-{:02}", month.year, month.month));
    }

    let effective_selection = match selected_index {
        Some(index) if index < GRID_CELLS => Some(index),
        Some(_) => None,
        None if month.contains(today) => dates.iter().position(|date| *date == today),
        None => None,
    };

    let cells = dates
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let key = date_key(*date);
            let in_current_month = month.contains(*date);
            CalendarCell {
                index,
                day_of_month: date.day(),
                day_name: date.format("%a").to_string(),
                in_current_month,
                is_today: in_current_month && *date == today,
                is_selected: effective_selection == Some(index),
                has_items: item_keys.contains(&key),
                date_key: key,
            }
        })
        .collect::<Vec<_>>();

    let selected_date = effective_selection.map(|index| cells[index].date_key.clone());
    Ok(CalendarGrid {
        month,
        cells,
        selected_index: effective_selection,
        selected_date,
    })
}

/// Month and selection the calendar screen is showing.
///
/// Moving to another month always drops the selection, so a fresh grid for
/// that month falls back to auto-selecting today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarCursor {
    pub month: MonthRef,
    pub selected_index: Option<usize>,
}

impl CalendarCursor {
    pub fn new(month: MonthRef) -> Self {
        Self {
            month,
            selected_index: None,
        }
    }

    pub fn change_month(&self, delta_months: i32) -> Result<Self, String> {
        Ok(Self::new(self.month.shift(delta_months)?))
    }

    pub fn select(&self, index: usize) -> Self {
        Self {
            month: self.month,
            selected_index: Some(index),
        }
    }

    pub fn build(&self, today: NaiveDate, item_keys: &HashSet<String>) -> Result<CalendarGrid, String> {
        build_grid(self.month, today, item_keys, self.selected_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn month(year: i32, month: u32) -> MonthRef {
        MonthRef::new(year, month).expect("valid month")
    }

    #[test]
    fn grid_starts_on_sunday_before_first_of_month() {
        // October 2026 starts on a Thursday.
        let grid = build_grid(month(2026, 10), date("2026-10-17"), &HashSet::new(), None)
            .expect("build grid");
        assert_eq!(grid.cells.len(), GRID_CELLS);
        assert_eq!(grid.cells[0].date_key, "2026-09-27");
        assert_eq!(grid.cells[0].day_name, "Sun");
        assert!(!grid.cells[0].in_current_month);
        assert_eq!(grid.cells[4].date_key, "2026-10-01");
        assert!(grid.cells[4].in_current_month);
        assert_eq!(grid.cells[34].date_key, "2026-10-31");
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_days() {
        let grid = build_grid(month(2026, 2), date("2026-10-17"), &HashSet::new(), None)
            .expect("build grid");
        assert_eq!(grid.cells[0].date_key, "2026-02-01");
        assert!(grid.cells.iter().take(28).all(|cell| cell.in_current_month));
        assert!(grid.cells.iter().skip(28).all(|cell| !cell.in_current_month));
    }

    #[test]
    fn today_is_auto_selected_in_its_own_month() {
        let grid = build_grid(month(2026, 10), date("2026-10-17"), &HashSet::new(), None)
            .expect("build grid");
        let today_cell = grid.selected_cell().expect("today selected");
        assert_eq!(today_cell.date_key, "2026-10-17");
        assert!(today_cell.is_today);
        assert!(today_cell.is_selected);
        assert_eq!(grid.selected_date.as_deref(), Some("2026-10-17"));
        assert_eq!(grid.cells.iter().filter(|cell| cell.is_selected).count(), 1);
    }

    #[test]
    fn today_is_not_highlighted_or_selected_outside_its_month() {
        // 2026-09-28 is visible as a leading cell of the October grid.
        let grid = build_grid(month(2026, 10), date("2026-09-28"), &HashSet::new(), None)
            .expect("build grid");
        assert_eq!(grid.selected_index, None);
        assert!(grid.cells.iter().all(|cell| !cell.is_today));
    }

    #[test]
    fn explicit_selection_wins_over_today() {
        let grid = build_grid(month(2026, 10), date("2026-10-17"), &HashSet::new(), Some(3))
            .expect("build grid");
        assert_eq!(grid.selected_index, Some(3));
        assert_eq!(grid.selected_date.as_deref(), Some("2026-09-30"));
        let today = grid
            .cells
            .iter()
            .find(|cell| cell.is_today)
            .expect("today cell");
        assert!(!today.is_selected);
    }

    #[test]
    fn out_of_range_selection_selects_nothing() {
        let grid = build_grid(month(2026, 10), date("2026-10-17"), &HashSet::new(), Some(35))
            .expect("build grid");
        assert_eq!(grid.selected_index, None);
        assert!(grid.cells.iter().all(|cell| !cell.is_selected));
    }

    #[test]
    fn cells_flag_days_with_items() {
        let tasks = vec![
            Task {
                title: "Essay".to_string(),
                location: String::new(),
                date: "5/10/2026".to_string(),
                time: "10:00".to_string(),
                priority: Default::default(),
                completed: false,
            },
            Task {
                title: "Lab".to_string(),
                location: String::new(),
                date: "2026-09-28".to_string(),
                time: "14:00".to_string(),
                priority: Default::default(),
                completed: true,
            },
            Task {
                title: "Broken".to_string(),
                location: String::new(),
                date: "next week".to_string(),
                time: "14:00".to_string(),
                priority: Default::default(),
                completed: false,
            },
        ];
        let keys = item_date_keys(&tasks);
        assert_eq!(keys.len(), 2);

        let grid = build_grid(month(2026, 10), date("2026-10-17"), &keys, None).expect("build grid");
        let marked = grid
            .cells
            .iter()
            .filter(|cell| cell.has_items)
            .map(|cell| cell.date_key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(marked, vec!["2026-09-28", "2026-10-05"]);
    }

    #[test]
    fn month_shift_rolls_over_years() {
        assert_eq!(month(2026, 12).shift(1), Ok(month(2027, 1)));
        assert_eq!(month(2026, 1).shift(-1), Ok(month(2025, 12)));
        assert_eq!(month(2026, 10).shift(-22), Ok(month(2024, 12)));
        assert!(MonthRef::new(2026, 13).is_err());
    }

    #[test]
    fn month_labels() {
        assert_eq!(month(2026, 10).label().as_deref(), Ok("October 2026"));
        assert_eq!(month(2026, 9).short_label().as_deref(), Ok("Sep"));
    }

    #[test]
    fn changing_month_clears_selection() {
        let cursor = CalendarCursor::new(month(2026, 10)).select(12);
        let grid = cursor
            .build(date("2026-10-17"), &HashSet::new())
            .expect("build grid");
        assert_eq!(grid.selected_index, Some(12));

        let next = cursor.change_month(1).expect("next month");
        assert_eq!(next.month, month(2026, 11));
        assert_eq!(next.selected_index, None);

        let back = next.change_month(-1).expect("previous month");
        let grid = back
            .build(date("2026-10-17"), &HashSet::new())
            .expect("build grid");
        assert_eq!(grid.selected_date.as_deref(), Some("2026-10-17"));
    }

    #[test]
    fn repeated_builds_do_not_accumulate_selection() {
        let cursor = CalendarCursor::new(month(2026, 10));
        let today = date("2026-10-17");
        let first = cursor.build(today, &HashSet::new()).expect("first build");
        let second = cursor.build(today, &HashSet::new()).expect("second build");
        assert_eq!(first, second);
        assert_eq!(cursor.selected_index, None);
    }

    // Feature: studentcal, Property 1: grid has 35 strictly consecutive days
    proptest! {
        #[test]
        fn property1_grid_has_35_consecutive_days(year in 1970i32..2100i32, month_number in 1u32..=12u32) {
            let grid = build_grid(month(year, month_number), date("2026-10-17"), &HashSet::new(), None)
                .expect("build grid");
            prop_assert_eq!(grid.cells.len(), GRID_CELLS);
            for pair in grid.cells.windows(2) {
                let previous = date(&pair[0].date_key);
                let next = date(&pair[1].date_key);
                prop_assert_eq!(next - previous, chrono::Duration::days(1));
            }
            prop_assert!(grid.cells.iter().any(|cell| cell.in_current_month && cell.day_of_month == 1));
        }
    }

    // Feature: studentcal, Property 2: first cell weekday is the same for every month
    proptest! {
        #[test]
        fn property2_first_cell_weekday_is_invariant(
            first_year in 1970i32..2100i32,
            first_month in 1u32..=12u32,
            second_year in 1970i32..2100i32,
            second_month in 1u32..=12u32
        ) {
            let first = display_start(month(first_year, first_month)).expect("first start");
            let second = display_start(month(second_year, second_month)).expect("second start");
            prop_assert_eq!(first.weekday(), second.weekday());
            prop_assert_eq!(first.weekday(), Weekday::Sun);
        }
    }
}
