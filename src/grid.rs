//! Contribution grid: a sparse habit log laid out as week columns.
//!
//! Column 0 always starts on a Sunday. The final week is padded to seven
//! cells; padding after the window end is flagged as future and carries no
//! value, so every grid holds exactly `total_weeks * 7` cells.

use crate::models::HabitLog;
use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GridWindow {
    #[serde(rename = "full-year")]
    FullYear,
    #[default]
    #[serde(rename = "first-half")]
    FirstHalf,
    #[serde(rename = "second-half")]
    SecondHalf,
    #[serde(rename = "trailing-6-months", alias = "6-months")]
    TrailingSixMonths,
}

impl GridWindow {
    pub const ALL: [GridWindow; 4] = [
        GridWindow::FullYear,
        GridWindow::FirstHalf,
        GridWindow::SecondHalf,
        GridWindow::TrailingSixMonths,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GridWindow::FullYear => "full-year",
            GridWindow::FirstHalf => "first-half",
            GridWindow::SecondHalf => "second-half",
            GridWindow::TrailingSixMonths => "trailing-6-months",
        }
    }

    /// Concrete inclusive `[start, end]` for the window as seen on `today`.
    pub fn resolve(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let year = today.year();
        match self {
            GridWindow::FullYear => (ymd(year, 1, 1), ymd(year, 12, 31)),
            GridWindow::FirstHalf => (ymd(year, 1, 1), ymd(year, 6, 30)),
            GridWindow::SecondHalf => (ymd(year, 7, 1), ymd(year, 12, 31)),
            GridWindow::TrailingSixMonths => {
                let first_of_month = ymd(year, today.month(), 1);
                let start = first_of_month
                    .checked_sub_months(Months::new(6))
                    .unwrap_or(first_of_month);
                (start, today)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub date: NaiveDate,
    pub value: u64,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub week_index: usize,
    pub is_future: bool,
    /// False for the alignment cells before `start` and the padding after `end`.
    pub in_window: bool,
    pub display_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLabel {
    pub label: String,
    pub week_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cells: Vec<GridCell>,
    pub total_weeks: usize,
    pub month_labels: Vec<MonthLabel>,
}

impl Grid {
    /// Cells grouped into week columns, each exactly seven long.
    pub fn weeks(&self) -> impl Iterator<Item = &[GridCell]> {
        self.cells.chunks(7)
    }
}

pub fn generate_grid_now(log: &HabitLog, window: GridWindow) -> Grid {
    generate_grid(log, window, Local::now().date_naive())
}

pub fn generate_grid(log: &HabitLog, window: GridWindow, today: NaiveDate) -> Grid {
    let (start, end) = window.resolve(today);
    generate_grid_between(log, start, end, today)
}

pub fn generate_grid_between(
    log: &HabitLog,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Grid {
    let aligned_start = week_aligned(start);
    let span_days = (end - aligned_start).num_days().max(0) as usize + 1;
    let total_weeks = span_days.div_ceil(7);

    let mut cells = Vec::with_capacity(total_weeks * 7);
    for offset in 0..total_weeks * 7 {
        let date = aligned_start + Duration::days(offset as i64);
        let padding = date > end;
        cells.push(GridCell {
            date,
            value: if padding {
                0
            } else {
                log.get(&date).copied().unwrap_or(0)
            },
            day_of_week: (offset % 7) as u8,
            week_index: offset / 7,
            is_future: padding || date > today,
            in_window: date >= start && !padding,
            display_date: date.format("%A, %B %-d, %Y").to_string(),
        });
    }

    Grid {
        start,
        end,
        cells,
        total_weeks,
        month_labels: month_labels(start, end),
    }
}

/// One label per month with at least one day in `[start, end]`, centred on
/// the weeks that month occupies inside the window.
pub fn month_labels(start: NaiveDate, end: NaiveDate) -> Vec<MonthLabel> {
    let aligned_start = week_aligned(start);
    let week_of = |date: NaiveDate| ((date - aligned_start).num_days() / 7) as usize;

    let mut labels = Vec::new();
    let mut month_start = ymd(start.year(), start.month(), 1);
    while month_start <= end {
        let Some(next_month) = month_start.checked_add_months(Months::new(1)) else {
            break;
        };
        let month_end = next_month - Duration::days(1);
        let visible_start = month_start.max(start);
        let visible_end = month_end.min(end);
        if visible_start <= visible_end {
            let first_week = week_of(visible_start);
            let last_week = week_of(visible_end);
            labels.push(MonthLabel {
                label: month_start.format("%b").to_string(),
                week_index: first_week + (last_week - first_week) / 2,
            });
        }
        month_start = next_month;
    }
    labels
}

fn week_aligned(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
