//! Single source of truth for habits, selection and timer state.
//!
//! `dispatch` applies an [`Action`] to a copy of the state and only swaps it
//! in when the reducer succeeds. Listeners (the state file writer among
//! them) run after every committed change.

use crate::aggregate::{self, UpsertMode};
use crate::errors::StoreError;
use crate::models::{ActiveTab, ActiveView, AppData, Habit, HabitChanges, NewHabit};
use crate::transfer::ImportPayload;
use chrono::{DateTime, Local, NaiveDate};
use uuid::Uuid;

pub type Listener = Box<dyn Fn(&AppData) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum Action {
    CreateHabit(NewHabit),
    UpdateHabit {
        id: String,
        changes: HabitChanges,
    },
    DeleteHabit {
        id: String,
    },
    LogEntry {
        habit_id: String,
        date: NaiveDate,
        value: u64,
        mode: UpsertMode,
    },
    EditEntry {
        habit_id: String,
        original: NaiveDate,
        date: NaiveDate,
        value: u64,
    },
    RemoveEntry {
        habit_id: String,
        date: NaiveDate,
    },
    SelectHabit {
        id: String,
    },
    SetView(ActiveView),
    SetTab(ActiveTab),
    SetTheme(String),
    TimerStart {
        now: DateTime<Local>,
    },
    TimerPause {
        now: DateTime<Local>,
    },
    TimerTick {
        now: DateTime<Local>,
    },
    TimerReset,
    TimerLog {
        now: DateTime<Local>,
    },
    TimerSetTarget {
        minutes: u64,
    },
    Import(ImportPayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Done,
    HabitCreated(String),
    EntryWritten {
        habit_id: String,
        date: NaiveDate,
        value: u64,
    },
    /// Timer minutes routed to the active habit; `habit_id` is `None` when
    /// there was no habit to receive them.
    TimerLogged {
        habit_id: Option<String>,
        date: NaiveDate,
        minutes: u64,
    },
}

pub struct HabitStore {
    data: AppData,
    listeners: Vec<Listener>,
}

impl HabitStore {
    pub fn new(mut data: AppData) -> Self {
        normalize_selection(&mut data);
        Self {
            data,
            listeners: Vec::new(),
        }
    }

    pub fn get(&self) -> &AppData {
        &self.data
    }

    pub fn subscribe(&mut self, listener: impl Fn(&AppData) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Drops every listener, letting background writers finish.
    pub fn unsubscribe_all(&mut self) {
        self.listeners.clear();
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Applied, StoreError> {
        let mut next = self.data.clone();
        let applied = reduce(&mut next, action)?;
        normalize_selection(&mut next);

        if next != self.data {
            self.data = next;
            for listener in &self.listeners {
                listener(&self.data);
            }
        }
        Ok(applied)
    }
}

fn reduce(data: &mut AppData, action: Action) -> Result<Applied, StoreError> {
    match action {
        Action::CreateHabit(new) => {
            let name = required(new.name, "name")?;
            let unit = required(new.unit, "unit")?;
            new.levels.validate()?;
            let id = Uuid::new_v4().to_string();
            data.habits.push(Habit {
                id: id.clone(),
                name,
                unit,
                use_timer: new.use_timer,
                levels: new.levels,
                log: Default::default(),
            });
            Ok(Applied::HabitCreated(id))
        }
        Action::UpdateHabit { id, changes } => {
            let habit = data.habit_mut(&id)?;
            if let Some(levels) = changes.levels {
                levels.validate()?;
                habit.levels = levels;
            }
            if let Some(name) = changes.name {
                habit.name = required(name, "name")?;
            }
            if let Some(unit) = changes.unit {
                habit.unit = required(unit, "unit")?;
            }
            if let Some(use_timer) = changes.use_timer {
                habit.use_timer = use_timer;
            }
            Ok(Applied::Done)
        }
        Action::DeleteHabit { id } => {
            let before = data.habits.len();
            data.habits.retain(|habit| habit.id != id);
            if data.habits.len() == before {
                return Err(StoreError::HabitNotFound(id));
            }
            if data.active_habit_id.as_deref() == Some(id.as_str()) {
                data.active_habit_id = None;
            }
            Ok(Applied::Done)
        }
        Action::LogEntry {
            habit_id,
            date,
            value,
            mode,
        } => {
            let habit = data.habit_mut(&habit_id)?;
            habit.log = aggregate::upsert(&habit.log, date, value, mode);
            let value = habit.log.get(&date).copied().unwrap_or(value);
            Ok(Applied::EntryWritten {
                habit_id,
                date,
                value,
            })
        }
        Action::EditEntry {
            habit_id,
            original,
            date,
            value,
        } => {
            let habit = data.habit_mut(&habit_id)?;
            habit.log = aggregate::edit_entry(&habit.log, original, date, value).ok_or(
                StoreError::EntryNotFound {
                    habit_id: habit_id.clone(),
                    date: original,
                },
            )?;
            Ok(Applied::EntryWritten {
                habit_id,
                date,
                value,
            })
        }
        Action::RemoveEntry { habit_id, date } => {
            let habit = data.habit_mut(&habit_id)?;
            habit.log = aggregate::remove(&habit.log, date);
            Ok(Applied::Done)
        }
        Action::SelectHabit { id } => {
            if data.habit(&id).is_none() {
                return Err(StoreError::HabitNotFound(id));
            }
            data.active_habit_id = Some(id);
            Ok(Applied::Done)
        }
        Action::SetView(view) => {
            data.active_view = view;
            Ok(Applied::Done)
        }
        Action::SetTab(tab) => {
            data.active_tab = tab;
            Ok(Applied::Done)
        }
        Action::SetTheme(theme) => {
            data.theme = Some(theme);
            Ok(Applied::Done)
        }
        Action::TimerStart { now } => {
            data.timer.start(now.timestamp_millis());
            Ok(Applied::Done)
        }
        Action::TimerPause { now } => {
            data.timer.pause(now.timestamp_millis());
            Ok(Applied::Done)
        }
        Action::TimerTick { now } => match data.timer.tick(now.timestamp_millis()) {
            Some(completion) => Ok(log_timer_minutes(
                data,
                now.date_naive(),
                completion.minutes,
            )),
            None => Ok(Applied::Done),
        },
        Action::TimerReset => {
            data.timer.reset();
            Ok(Applied::Done)
        }
        Action::TimerLog { now } => {
            let minutes = data.timer.take_manual_log().ok_or(StoreError::NothingToLog)?;
            Ok(log_timer_minutes(data, now.date_naive(), minutes))
        }
        Action::TimerSetTarget { minutes } => {
            data.timer.set_target_minutes(minutes);
            Ok(Applied::Done)
        }
        Action::Import(payload) => {
            payload.apply(data);
            Ok(Applied::Done)
        }
    }
}

/// Timer minutes always accumulate onto the active habit's entry for `date`.
fn log_timer_minutes(data: &mut AppData, date: NaiveDate, minutes: u64) -> Applied {
    let target = data.active_habit().map(|habit| habit.id.clone());
    if let Some(id) = target.as_deref().filter(|_| minutes > 0) {
        if let Ok(habit) = data.habit_mut(id) {
            habit.log = aggregate::upsert(&habit.log, date, minutes, UpsertMode::Accumulate);
        }
    }
    Applied::TimerLogged {
        habit_id: target,
        date,
        minutes,
    }
}

/// Keeps the active selection pointing at an existing habit, falling back to
/// the first one.
fn normalize_selection(data: &mut AppData) {
    let valid = data
        .active_habit_id
        .as_deref()
        .is_some_and(|id| data.habit(id).is_some());
    if !valid {
        data.active_habit_id = data.habits.first().map(|habit| habit.id.clone());
    }
}

fn required(value: String, field: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StoreError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Levels;
    use crate::timer::{FocusTimer, TimerSession};
    use crate::transfer::ExportDocument;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).single().unwrap()
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.into(),
            unit: "minutes".into(),
            use_timer: true,
            levels: Levels::default(),
        }
    }

    fn create(store: &mut HabitStore, name: &str) -> String {
        match store.dispatch(Action::CreateHabit(new_habit(name))).unwrap() {
            Applied::HabitCreated(id) => id,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_habit_becomes_active() {
        let mut store = HabitStore::new(AppData::default());
        let first = create(&mut store, "Focus");
        let _second = create(&mut store, "Reading");
        assert_eq!(store.get().active_habit_id.as_deref(), Some(first.as_str()));
        assert_eq!(store.get().habits.len(), 2);
        assert!(store.get().habits[0].log.is_empty());
    }

    #[test]
    fn invalid_levels_are_rejected_at_creation() {
        let mut store = HabitStore::new(AppData::default());
        let mut habit = new_habit("Focus");
        habit.levels = Levels { low: 60, medium: 30, high: 120 };
        let err = store.dispatch(Action::CreateHabit(habit)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidLevels { .. }));
        assert!(store.get().habits.is_empty());

        let blank = NewHabit { name: "  ".into(), ..new_habit("x") };
        assert_eq!(
            store.dispatch(Action::CreateHabit(blank)).unwrap_err(),
            StoreError::EmptyField("name")
        );
    }

    #[test]
    fn deleting_active_habit_moves_selection() {
        let mut store = HabitStore::new(AppData::default());
        let first = create(&mut store, "Focus");
        let second = create(&mut store, "Reading");

        store.dispatch(Action::DeleteHabit { id: first.clone() }).unwrap();
        assert_eq!(store.get().active_habit_id.as_deref(), Some(second.as_str()));

        store.dispatch(Action::DeleteHabit { id: second }).unwrap();
        assert_eq!(store.get().active_habit_id, None);

        assert_eq!(
            store.dispatch(Action::DeleteHabit { id: first.clone() }),
            Err(StoreError::HabitNotFound(first))
        );
    }

    #[test]
    fn log_entries_accumulate_and_replace() {
        let mut store = HabitStore::new(AppData::default());
        let id = create(&mut store, "Focus");
        let date = day(2024, 1, 1);
        let log = |store: &mut HabitStore, value: u64, mode: UpsertMode| {
            store
                .dispatch(Action::LogEntry {
                    habit_id: id.clone(),
                    date,
                    value,
                    mode,
                })
                .unwrap()
        };

        log(&mut store, 10, UpsertMode::Accumulate);
        let written = log(&mut store, 5, UpsertMode::Accumulate);
        assert_eq!(
            written,
            Applied::EntryWritten { habit_id: id.clone(), date, value: 15 }
        );
        log(&mut store, 3, UpsertMode::Replace);
        assert_eq!(store.get().habit(&id).unwrap().log.get(&date), Some(&3));
    }

    #[test]
    fn failed_actions_leave_state_untouched() {
        let mut store = HabitStore::new(AppData::default());
        let id = create(&mut store, "Focus");
        let snapshot = store.get().clone();

        let err = store
            .dispatch(Action::EditEntry {
                habit_id: id.clone(),
                original: day(2024, 1, 1),
                date: day(2024, 1, 2),
                value: 4,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::EntryNotFound { .. }));

        let err = store
            .dispatch(Action::UpdateHabit {
                id,
                changes: HabitChanges {
                    name: Some("Renamed".into()),
                    levels: Some(Levels { low: 0, medium: 1, high: 2 }),
                    ..HabitChanges::default()
                },
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidLevels { .. }));
        assert_eq!(store.get(), &snapshot);
    }

    #[test]
    fn listeners_run_only_on_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = HabitStore::new(AppData::default());
        let seen = Arc::clone(&calls);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let id = create(&mut store, "Focus");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.dispatch(Action::SelectHabit { id }).unwrap();
        store.dispatch(Action::TimerTick { now: Local::now() }).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.dispatch(Action::SetView(ActiveView::Dashboard)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn completed_timer_logs_target_minutes_to_active_habit() {
        let mut store = HabitStore::new(AppData::default());
        let id = create(&mut store, "Focus");
        let start = at(2024, 3, 15, 9, 0, 0);

        store.dispatch(Action::TimerStart { now: start }).unwrap();
        let early = store
            .dispatch(Action::TimerTick { now: at(2024, 3, 15, 9, 10, 0) })
            .unwrap();
        assert_eq!(early, Applied::Done);

        let done = store
            .dispatch(Action::TimerTick { now: at(2024, 3, 15, 9, 25, 0) })
            .unwrap();
        assert_eq!(
            done,
            Applied::TimerLogged {
                habit_id: Some(id.clone()),
                date: day(2024, 3, 15),
                minutes: 25,
            }
        );
        assert_eq!(
            store.get().habit(&id).unwrap().log.get(&day(2024, 3, 15)),
            Some(&25)
        );
        assert!(!store.get().timer.is_running());
    }

    #[test]
    fn manual_timer_log_accumulates_rounded_minutes() {
        let mut store = HabitStore::new(AppData::default());
        let id = create(&mut store, "Focus");
        store
            .dispatch(Action::LogEntry {
                habit_id: id.clone(),
                date: day(2024, 3, 15),
                value: 10,
                mode: UpsertMode::Accumulate,
            })
            .unwrap();

        store.dispatch(Action::TimerStart { now: at(2024, 3, 15, 9, 0, 0) }).unwrap();
        store.dispatch(Action::TimerPause { now: at(2024, 3, 15, 9, 4, 1) }).unwrap();
        let logged = store
            .dispatch(Action::TimerLog { now: at(2024, 3, 15, 9, 5, 0) })
            .unwrap();
        assert!(matches!(logged, Applied::TimerLogged { minutes: 5, .. }));
        assert_eq!(
            store.get().habit(&id).unwrap().log.get(&day(2024, 3, 15)),
            Some(&15)
        );
        assert_eq!(
            store.dispatch(Action::TimerLog { now: at(2024, 3, 15, 9, 6, 0) }),
            Err(StoreError::NothingToLog)
        );
    }

    #[test]
    fn expired_session_completes_on_first_tick() {
        let start = at(2024, 3, 15, 9, 0, 0);
        let mut data = AppData::default();
        data.timer = FocusTimer::resume(TimerSession {
            start_epoch_millis: start.timestamp_millis(),
            target_minutes: 30,
        });
        let mut store = HabitStore::new(data);
        let id = create(&mut store, "Focus");

        let applied = store
            .dispatch(Action::TimerTick { now: at(2024, 3, 15, 11, 0, 0) })
            .unwrap();
        assert_eq!(
            applied,
            Applied::TimerLogged {
                habit_id: Some(id.clone()),
                date: day(2024, 3, 15),
                minutes: 30,
            }
        );
        assert_eq!(
            store.get().habit(&id).unwrap().log.get(&day(2024, 3, 15)),
            Some(&30)
        );
    }

    #[test]
    fn import_replaces_habits_and_fixes_selection() {
        let mut store = HabitStore::new(AppData::default());
        create(&mut store, "Focus");
        let imported = Habit {
            id: "imported".into(),
            name: "Walk".into(),
            unit: "steps".into(),
            use_timer: false,
            levels: Levels::default(),
            log: Default::default(),
        };
        let payload = ImportPayload::Document(ExportDocument {
            habits: vec![imported],
            active_habit_id: Some("missing".into()),
            active_view: None,
            active_tab: Some(ActiveTab::History),
            coins: None,
            owned_plants: None,
        });
        store.dispatch(Action::Import(payload)).unwrap();
        assert_eq!(store.get().habits.len(), 1);
        assert_eq!(store.get().active_habit_id.as_deref(), Some("imported"));
        assert_eq!(store.get().active_tab, ActiveTab::History);
    }
}
