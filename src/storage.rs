use crate::errors::AppError;
use crate::models::{ActiveTab, ActiveView, AppData, Habit, OwnedPlant};
use crate::timer::{FocusTimer, TimerSession};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// On-disk layout of the state file, one key per stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_plants: Option<Vec<OwnedPlant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_state: Option<TimerSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_habit_id: Option<String>,
    #[serde(default)]
    pub active_view: ActiveView,
    #[serde(default)]
    pub active_tab: ActiveTab,
}

impl PersistedState {
    pub fn capture(data: &AppData) -> Self {
        Self {
            habits: data.habits.clone(),
            coins: data.coins,
            owned_plants: data.owned_plants.clone(),
            timer_state: data.timer.session(),
            theme: data.theme.clone(),
            active_habit_id: data.active_habit_id.clone(),
            active_view: data.active_view,
            active_tab: data.active_tab,
        }
    }

    /// A stored timer session comes back running; the first tick catches it
    /// up against the wall clock.
    pub fn restore(self) -> AppData {
        AppData {
            habits: self.habits,
            active_habit_id: self.active_habit_id,
            active_view: self.active_view,
            active_tab: self.active_tab,
            theme: self.theme,
            coins: self.coins,
            owned_plants: self.owned_plants,
            timer: self.timer_state.map(FocusTimer::resume).unwrap_or_default(),
        }
    }
}

pub async fn load_data(path: &Path) -> PersistedState {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                PersistedState::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no data file at {}, starting empty", path.display());
            PersistedState::default()
        }
        Err(err) => {
            error!("failed to read data file: {err}");
            PersistedState::default()
        }
    }
}

/// Writes through a sibling temp file so a crash mid-write never truncates
/// the previous state.
pub async fn persist_data(path: &Path, data: &PersistedState) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    let staging = staging_path(path);
    fs::write(&staging, payload).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

/// Store listener that hands every committed change to a background writer
/// for `path`. Only the newest snapshot is kept, so a burst of changes costs
/// one write. The writer exits once the listener is dropped and the last
/// snapshot is on disk.
pub fn file_sink(path: PathBuf) -> (impl Fn(&AppData) + Send + Sync + 'static, JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);
    let writer = tokio::spawn(write_snapshots(path, rx));
    let listener = move |data: &AppData| {
        tx.send_replace(Some(PersistedState::capture(data)));
    };
    (listener, writer)
}

async fn write_snapshots(path: PathBuf, mut rx: watch::Receiver<Option<PersistedState>>) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if let Some(state) = snapshot {
            if let Err(err) = persist_data(&path, &state).await {
                error!("failed to persist data file: {}", err.message);
            }
        }
    }
    debug!("state writer finished");
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::UpsertMode;
    use crate::models::{Levels, NewHabit};
    use crate::store::{Action, Applied, HabitStore};
    use chrono::NaiveDate;

    fn scratch_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "habit_tracker_{tag}_{}_{nanos}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_loads_empty() {
        let path = scratch_path("missing");
        assert_eq!(load_data(&path).await, PersistedState::default());

        std::fs::write(&path, b"{ definitely not json").unwrap();
        assert_eq!(load_data(&path).await, PersistedState::default());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn persisted_state_reloads() {
        let path = scratch_path("reload");
        let mut data = AppData::default();
        data.habits.push(Habit {
            id: "h1".into(),
            name: "Focus".into(),
            unit: "minutes".into(),
            use_timer: true,
            levels: Levels::default(),
            log: [(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 25)].into(),
        });
        data.theme = Some("dark".into());
        data.timer.start(1_700_000_000_000);

        persist_data(&path, &PersistedState::capture(&data))
            .await
            .unwrap();
        let loaded = load_data(&path).await;
        assert_eq!(loaded.habits, data.habits);
        assert_eq!(loaded.theme.as_deref(), Some("dark"));
        assert_eq!(
            loaded.timer_state.map(|s| s.start_epoch_millis),
            Some(1_700_000_000_000)
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["timerState"]["targetMinutes"], 25);
        assert!(raw.get("coins").is_none());

        let restored = loaded.restore();
        assert!(restored.timer.is_running());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn writer_flushes_last_dispatch() {
        let path = scratch_path("writer");
        let (sink, writer) = file_sink(path.clone());
        let mut store = HabitStore::new(AppData::default());
        store.subscribe(sink);

        let id = match store
            .dispatch(Action::CreateHabit(NewHabit {
                name: "Focus".into(),
                unit: "minutes".into(),
                use_timer: true,
                levels: Levels::default(),
            }))
            .unwrap()
        {
            Applied::HabitCreated(id) => id,
            other => panic!("unexpected {other:?}"),
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for value in [10, 5, 7] {
            store
                .dispatch(Action::LogEntry {
                    habit_id: id.clone(),
                    date,
                    value,
                    mode: UpsertMode::Accumulate,
                })
                .unwrap();
        }

        store.unsubscribe_all();
        writer.await.unwrap();

        let loaded = load_data(&path).await;
        assert_eq!(loaded.habits.len(), 1);
        assert_eq!(loaded.habits[0].log.get(&date), Some(&22));
        assert!(!staging_path(&path).exists());
        let _ = std::fs::remove_file(&path);
    }
}
