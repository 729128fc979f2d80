//! Export document and import shape detection.

use crate::errors::TransferError;
use crate::models::{ActiveTab, ActiveView, AppData, Habit, OwnedPlant};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXPORT_FILE_NAME: &str = "habits-all-data.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub habits: Vec<Habit>,
    #[serde(default, alias = "activeHabit")]
    pub active_habit_id: Option<String>,
    #[serde(default)]
    pub active_view: Option<ActiveView>,
    #[serde(default)]
    pub active_tab: Option<ActiveTab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_plants: Option<Vec<OwnedPlant>>,
}

/// The two file shapes accepted on import.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    /// A full export document.
    Document(ExportDocument),
    /// A bare habit array, as written by the first versions of the app.
    Legacy(Vec<Habit>),
}

impl ImportPayload {
    pub fn habit_count(&self) -> usize {
        match self {
            ImportPayload::Document(doc) => doc.habits.len(),
            ImportPayload::Legacy(habits) => habits.len(),
        }
    }

    /// Replaces the habit list and copies over whichever optional fields the
    /// payload carries.
    pub fn apply(self, data: &mut AppData) {
        match self {
            ImportPayload::Legacy(habits) => data.habits = habits,
            ImportPayload::Document(doc) => {
                data.habits = doc.habits;
                if let Some(id) = doc.active_habit_id.filter(|id| !id.is_empty()) {
                    data.active_habit_id = Some(id);
                }
                if let Some(view) = doc.active_view {
                    data.active_view = view;
                }
                if let Some(tab) = doc.active_tab {
                    data.active_tab = tab;
                }
                if doc.coins.is_some() {
                    data.coins = doc.coins;
                }
                if doc.owned_plants.is_some() {
                    data.owned_plants = doc.owned_plants;
                }
            }
        }
    }
}

pub fn export(data: &AppData) -> ExportDocument {
    ExportDocument {
        habits: data.habits.clone(),
        active_habit_id: data.active_habit_id.clone(),
        active_view: Some(data.active_view),
        active_tab: Some(data.active_tab),
        coins: data.coins,
        owned_plants: data.owned_plants.clone(),
    }
}

pub fn export_json(data: &AppData) -> Result<String, TransferError> {
    serde_json::to_string_pretty(&export(data)).map_err(TransferError::Serialize)
}

pub fn parse_import(text: &str) -> Result<ImportPayload, TransferError> {
    let value: Value = serde_json::from_str(text).map_err(TransferError::Malformed)?;
    let is_document = value
        .as_object()
        .is_some_and(|fields| fields.contains_key("habits"));
    if value.is_array() {
        serde_json::from_value(value)
            .map(ImportPayload::Legacy)
            .map_err(TransferError::Malformed)
    } else if is_document {
        serde_json::from_value(value)
            .map(ImportPayload::Document)
            .map_err(TransferError::Malformed)
    } else {
        Err(TransferError::UnrecognizedShape)
    }
}
