//! Background recompute of a running focus timer.
//!
//! At most one ticker task exists. It is aborted whenever the timer stops
//! running and on shutdown, so no repeating task outlives the timer.

use crate::state::AppState;
use crate::store::{Action, Applied, HabitStore};
use chrono::Local;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct Ticker {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    pub fn cancel(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = handle.take() {
            task.abort();
            debug!("timer ticker cancelled");
        }
    }

    /// Empties the slot if it still holds task `id`.
    fn release(&self, id: task::Id) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|task| task.id() == id) {
            *handle = None;
        }
    }
}

/// Starts the ticker unless one is already live.
pub fn ensure_running(state: &AppState) {
    let mut handle = state
        .ticker
        .handle
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if handle.as_ref().is_some_and(|task| !task.is_finished()) {
        return;
    }
    *handle = Some(tokio::spawn(run(state.clone())));
    debug!("timer ticker started");
}

/// Matches the ticker to the timer: running timers get one, stopped timers
/// lose theirs.
pub fn sync(state: &AppState, running: bool) {
    if running {
        ensure_running(state);
    } else {
        state.ticker.cancel();
    }
}

/// Catches the timer up against the wall clock right away.
pub fn refresh(store: &mut HabitStore) -> Option<Applied> {
    match store.dispatch(Action::TimerTick { now: Local::now() }) {
        Ok(applied) => {
            report(&applied);
            Some(applied)
        }
        Err(err) => {
            warn!("timer tick rejected: {err}");
            None
        }
    }
}

pub fn report(applied: &Applied) {
    match applied {
        Applied::TimerLogged {
            habit_id: Some(habit_id),
            date,
            minutes,
        } => info!("logged {minutes} timer minutes to habit {habit_id} on {date}"),
        Applied::TimerLogged {
            habit_id: None,
            minutes,
            ..
        } => warn!("dropped {minutes} timer minutes: no active habit"),
        _ => {}
    }
}

async fn run(state: AppState) {
    let mut interval = tokio::time::interval(TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let mut store = state.store.lock().await;
        refresh(&mut store);
        if !store.get().timer.is_running() {
            // Still under the store lock: a start that lands after this sees
            // an empty slot and spawns a new ticker.
            state.ticker.release(task::id());
            break;
        }
    }
    debug!("timer ticker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppData;

    fn slot_taken(state: &AppState) -> bool {
        state.ticker.handle.lock().unwrap().is_some()
    }

    #[tokio::test]
    async fn stopped_ticker_frees_its_slot_for_the_next_start() {
        let state = AppState::new(HabitStore::new(AppData::default()));
        state
            .store
            .lock()
            .await
            .dispatch(Action::TimerStart { now: Local::now() })
            .unwrap();
        ensure_running(&state);
        assert!(slot_taken(&state));

        // Paused without going through `sync`, so only the task itself can
        // notice the timer stopped.
        state
            .store
            .lock()
            .await
            .dispatch(Action::TimerPause { now: Local::now() })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!slot_taken(&state));

        state
            .store
            .lock()
            .await
            .dispatch(Action::TimerStart { now: Local::now() })
            .unwrap();
        ensure_running(&state);
        assert!(slot_taken(&state));
        state.ticker.cancel();
        assert!(!slot_taken(&state));
    }
}
