//! Focus timer that derives elapsed time from the wall clock.
//!
//! No internal thread: elapsed seconds are recomputed from the stored start
//! epoch on every query, so a suspended process or a slow ticker never loses
//! time. The caller drives completion by calling `tick()`.
//!
//! ```text
//! Idle -> Running -> Idle (paused, elapsed kept)
//!                 -> Idle (completed, elapsed cleared)
//! ```

use crate::aggregate::elapsed_minutes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
}

/// What survives a restart: only a running timer is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub start_epoch_millis: i64,
    pub target_minutes: u32,
}

/// A finished countdown, ready to be logged against a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCompletion {
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    target_minutes: u32,
    /// Elapsed seconds while idle; ignored while running.
    paused_secs: u64,
    /// Epoch milliseconds the countdown effectively began, offset by any
    /// time accumulated before a pause.
    start_epoch_ms: Option<i64>,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self {
            target_minutes: DEFAULT_TARGET_MINUTES,
            paused_secs: 0,
            start_epoch_ms: None,
        }
    }
}

impl FocusTimer {
    /// Rebuilds a running timer from a persisted session. Elapsed time is
    /// caught up on the next query against the wall clock.
    pub fn resume(session: TimerSession) -> Self {
        Self {
            target_minutes: session.target_minutes.max(1),
            paused_secs: 0,
            start_epoch_ms: Some(session.start_epoch_millis),
        }
    }

    pub fn status(&self) -> TimerStatus {
        if self.start_epoch_ms.is_some() {
            TimerStatus::Running
        } else {
            TimerStatus::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.start_epoch_ms.is_some()
    }

    pub fn target_minutes(&self) -> u32 {
        self.target_minutes
    }

    pub fn target_secs(&self) -> u64 {
        u64::from(self.target_minutes) * 60
    }

    pub fn start_epoch_ms(&self) -> Option<i64> {
        self.start_epoch_ms
    }

    pub fn elapsed_secs(&self, now_ms: i64) -> u64 {
        match self.start_epoch_ms {
            Some(start) => (now_ms.saturating_sub(start).max(0) / 1000) as u64,
            None => self.paused_secs,
        }
    }

    pub fn remaining_secs(&self, now_ms: i64) -> u64 {
        self.target_secs().saturating_sub(self.elapsed_secs(now_ms))
    }

    pub fn session(&self) -> Option<TimerSession> {
        self.start_epoch_ms.map(|start| TimerSession {
            start_epoch_millis: start,
            target_minutes: self.target_minutes,
        })
    }

    /// Returns false when already running.
    pub fn start(&mut self, now_ms: i64) -> bool {
        if self.is_running() {
            return false;
        }
        let offset_ms = i64::try_from(self.paused_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.start_epoch_ms = Some(now_ms.saturating_sub(offset_ms));
        true
    }

    /// Returns false when not running.
    pub fn pause(&mut self, now_ms: i64) -> bool {
        if !self.is_running() {
            return false;
        }
        self.paused_secs = self.elapsed_secs(now_ms);
        self.start_epoch_ms = None;
        true
    }

    pub fn tick(&mut self, now_ms: i64) -> Option<TimerCompletion> {
        if !self.is_running() || self.elapsed_secs(now_ms) < self.target_secs() {
            return None;
        }
        let minutes = u64::from(self.target_minutes);
        self.reset();
        Some(TimerCompletion { minutes })
    }

    /// Hands out the paused time as whole minutes (rounded up) and clears it.
    /// Only an idle timer with time on it has anything to log.
    pub fn take_manual_log(&mut self) -> Option<u64> {
        if self.is_running() || self.paused_secs == 0 {
            return None;
        }
        let minutes = elapsed_minutes(self.paused_secs);
        self.paused_secs = 0;
        Some(minutes)
    }

    pub fn reset(&mut self) {
        self.paused_secs = 0;
        self.start_epoch_ms = None;
    }

    pub fn set_target_minutes(&mut self, minutes: u64) {
        self.target_minutes = u32::try_from(minutes).unwrap_or(u32::MAX).max(1);
    }
}
