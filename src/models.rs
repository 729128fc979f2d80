use crate::aggregate::UpsertMode;
use crate::errors::StoreError;
use crate::grid::{GridCell, GridWindow, MonthLabel};
use crate::intensity::{Tier, classify_cell};
use crate::timer::{FocusTimer, TimerStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Date-indexed log of one habit, at most one value per calendar date.
pub type HabitLog = BTreeMap<NaiveDate, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub date: NaiveDate,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Levels {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            low: 30,
            medium: 60,
            high: 120,
        }
    }
}

impl Levels {
    pub fn validate(&self) -> Result<(), StoreError> {
        if 0 < self.low && self.low < self.medium && self.medium < self.high {
            Ok(())
        } else {
            Err(StoreError::InvalidLevels {
                low: self.low,
                medium: self.medium,
                high: self.high,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub use_timer: bool,
    #[serde(default)]
    pub levels: Levels,
    #[serde(default, alias = "data", deserialize_with = "deserialize_log")]
    pub log: HabitLog,
}

/// Files written by older versions store the log as `[{date, value}]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LogRepr {
    Map(HabitLog),
    Entries(Vec<LogEntry>),
}

fn deserialize_log<'de, D>(deserializer: D) -> Result<HabitLog, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LogRepr::deserialize(deserializer)? {
        LogRepr::Map(log) => log,
        LogRepr::Entries(entries) => {
            let mut log = HabitLog::new();
            for entry in entries {
                log.entry(entry.date).or_insert(entry.value);
            }
            log
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    Dashboard,
    #[default]
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Grid,
    History,
}

/// Cosmetic unlock carried through storage and export untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedPlant {
    #[serde(rename = "type")]
    pub kind: String,
    pub level: u32,
    pub max_level: u32,
    pub name: String,
    pub price: u64,
}

/// In-memory application state owned by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppData {
    pub habits: Vec<Habit>,
    pub active_habit_id: Option<String>,
    pub active_view: ActiveView,
    pub active_tab: ActiveTab,
    pub theme: Option<String>,
    pub coins: Option<u64>,
    pub owned_plants: Option<Vec<OwnedPlant>>,
    pub timer: FocusTimer,
}

impl AppData {
    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn habit_mut(&mut self, id: &str) -> Result<&mut Habit, StoreError> {
        self.habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or_else(|| StoreError::HabitNotFound(id.to_string()))
    }

    pub fn active_habit(&self) -> Option<&Habit> {
        self.active_habit_id.as_deref().and_then(|id| self.habit(id))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub use_timer: bool,
    #[serde(default)]
    pub levels: Levels,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub use_timer: Option<bool>,
    pub levels: Option<Levels>,
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub date: Option<NaiveDate>,
    pub value: serde_json::Value,
    #[serde(default)]
    pub mode: UpsertMode,
}

#[derive(Debug, Deserialize)]
pub struct EditEntryRequest {
    pub date: Option<NaiveDate>,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub minutes: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub active_habit_id: Option<String>,
    pub active_view: Option<ActiveView>,
    pub active_tab: Option<ActiveTab>,
    pub theme: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    #[serde(default)]
    pub window: GridWindow,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub window: Option<GridWindow>,
    pub habit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HabitForm {
    pub name: String,
    pub unit: String,
    pub use_timer: Option<String>,
    pub low: String,
    pub medium: String,
    pub high: String,
}

#[derive(Debug, Deserialize)]
pub struct LogForm {
    pub date: NaiveDate,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub habit_id: String,
    pub date: NaiveDate,
    pub value: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResponse {
    pub status: TimerStatus,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub target_minutes: u32,
    pub start_epoch_millis: Option<i64>,
    pub logged_minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCell {
    pub date: NaiveDate,
    pub value: u64,
    pub day_of_week: u8,
    pub week_index: usize,
    pub is_future: bool,
    pub in_window: bool,
    pub display_date: String,
    pub tier: Tier,
    pub intensity: f64,
}

impl ClassifiedCell {
    pub fn new(cell: &GridCell, levels: &Levels) -> Self {
        let intensity = classify_cell(cell.value, cell.is_future, levels);
        Self {
            date: cell.date,
            value: cell.value,
            day_of_week: cell.day_of_week,
            week_index: cell.week_index,
            is_future: cell.is_future,
            in_window: cell.in_window,
            display_date: cell.display_date.clone(),
            tier: intensity.tier,
            intensity: intensity.level,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    pub habit_id: String,
    pub window: GridWindow,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_weeks: usize,
    pub month_labels: Vec<MonthLabel>,
    pub cells: Vec<ClassifiedCell>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub habits: usize,
    pub active_habit_id: Option<String>,
}
