//! Timer engine implementation.
//!
//! The timer engine is a pure state machine. It does not own a clock -- the
//! caller (normally [`TimerController`](super::TimerController)) invokes
//! `tick()` once per second while the engine is running.
//!
//! ## State transitions
//!
//! ```text
//! Stopped -> Running -> Paused -> Running -> ...
//! ```
//!
//! A completed phase pauses the engine rather than chaining into the next
//! phase: each phase requires an acknowledgement (another `start()`) before
//! ticking resumes.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::profile::{NotificationType, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

/// Whether the engine is currently counting down work or break time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

/// Result of a phase running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The reminder chosen for this completion.
    pub notification: NotificationType,
    /// The phase just entered.
    pub phase: Phase,
    /// Duration of the entered phase in seconds.
    pub duration_seconds: u32,
}

/// Core timer state machine.
///
/// Work and break durations are denormalized copies of the active profile,
/// kept in sync by the caller through [`apply_profile`](Self::apply_profile)
/// and the individual setters. All operations are total; range validation
/// happens at the registry before values reach the engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    work_minutes: u32,
    break_minutes: u32,
    remaining_seconds: u32,
    current_cycle: u32,
    pomodoro_mode: bool,
    current_notification: NotificationType,
    /// Value snapshot of the active profile's enabled reminder set.
    enabled_notifications: BTreeSet<NotificationType>,
}

impl TimerEngine {
    pub fn new() -> Self {
        let mut enabled = BTreeSet::new();
        enabled.insert(NotificationType::Rest);
        Self {
            state: TimerState::Stopped,
            work_minutes: 25,
            break_minutes: 5,
            remaining_seconds: 25 * 60,
            current_cycle: 0,
            pomodoro_mode: true,
            current_notification: NotificationType::Rest,
            enabled_notifications: enabled,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    pub fn pomodoro_mode(&self) -> bool {
        self.pomodoro_mode
    }

    pub fn current_notification(&self) -> NotificationType {
        self.current_notification
    }

    /// Even cycles count down work; odd cycles count down break, but only
    /// when pomodoro mode alternates phases at all.
    pub fn phase(&self) -> Phase {
        if !self.pomodoro_mode || self.current_cycle % 2 == 0 {
            Phase::Work
        } else {
            Phase::Break
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_time(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Transition to Running. Returns false when already running.
    pub fn start(&mut self) -> bool {
        if self.state == TimerState::Running {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Transition to Paused. Returns false unless currently running.
    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    /// Force Stopped and reset to the top of a work phase.
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.reset();
    }

    /// Rewind to a fresh work phase without touching `state`.
    pub fn reset(&mut self) {
        self.remaining_seconds = self.work_minutes * 60;
        self.current_cycle = 0;
    }

    /// Advance one second. Returns the completion record when the phase ran
    /// out; the engine is then Paused awaiting acknowledgement.
    pub fn tick(&mut self) -> Option<Completion> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            return Some(self.complete_phase());
        }
        None
    }

    fn complete_phase(&mut self) -> Completion {
        self.state = TimerState::Paused;
        self.current_cycle += 1;

        let phase = self.phase();
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::Break => self.break_minutes,
        };
        self.remaining_seconds = minutes * 60;

        // Entering a break (or completing any phase outside pomodoro mode)
        // picks a random enabled reminder; returning to work always reminds
        // with Rest.
        self.current_notification = if phase == Phase::Break || !self.pomodoro_mode {
            self.random_enabled_notification()
        } else {
            NotificationType::Rest
        };

        Completion {
            notification: self.current_notification,
            phase,
            duration_seconds: self.remaining_seconds,
        }
    }

    fn random_enabled_notification(&self) -> NotificationType {
        let enabled: Vec<NotificationType> =
            self.enabled_notifications.iter().copied().collect();
        enabled
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(NotificationType::Rest)
    }

    // ── Setters ──────────────────────────────────────────────────────

    /// Change the work duration. While Stopped the remaining time is
    /// recomputed immediately; returns true in that case so the caller can
    /// republish a tick. While Running/Paused the change only affects future
    /// resets and completions.
    pub fn set_work_minutes(&mut self, minutes: u32) -> bool {
        self.work_minutes = minutes;
        if self.state == TimerState::Stopped {
            self.remaining_seconds = minutes * 60;
            return true;
        }
        false
    }

    pub fn set_break_minutes(&mut self, minutes: u32) {
        self.break_minutes = minutes;
    }

    pub fn set_pomodoro_mode(&mut self, enabled: bool) {
        self.pomodoro_mode = enabled;
    }

    pub fn set_enabled_notifications(&mut self, enabled: BTreeSet<NotificationType>) {
        self.enabled_notifications = enabled;
    }

    /// Sync durations, mode, and the reminder snapshot from a profile.
    /// Returns true when the remaining time was recomputed.
    pub fn apply_profile(&mut self, profile: &Profile) -> bool {
        self.set_break_minutes(profile.break_minutes);
        self.set_pomodoro_mode(profile.pomodoro_mode);
        self.set_enabled_notifications(profile.enabled_notifications.clone());
        self.set_work_minutes(profile.work_minutes)
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}
