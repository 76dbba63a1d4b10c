//! Timer controller: owns the engine and its 1-second tick source.
//!
//! The engine itself is a pure state machine; this controller drives it from
//! a background tokio task and publishes the resulting events. Cancellation
//! is synchronous: once `pause()` or `stop()` returns, no further tick can be
//! observed, not even one already in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use super::engine::{Phase, TimerEngine, TimerState};
use crate::events::{Event, EventBus};
use crate::profile::Profile;

/// Cadence of the background tick source.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Value snapshot of the engine for observers and the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub formatted_time: String,
    pub current_cycle: u32,
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub pomodoro_mode: bool,
}

/// Drives a [`TimerEngine`] with a periodic tokio task.
///
/// `start()` must be called from within a tokio runtime. `pause()` and
/// `stop()` block until any in-flight tick has fully delivered, so they must
/// not be invoked from inside a handler that the tick task itself is
/// currently running.
pub struct TimerController {
    engine: Arc<Mutex<TimerEngine>>,
    bus: Arc<EventBus>,
    /// Bumped on every cancellation; tick iterations carrying a stale
    /// generation drop their work under the engine lock.
    generation: Arc<AtomicU64>,
    /// Held by the tick task across one tick-and-publish iteration.
    in_flight: Arc<Mutex<()>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerController {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(TimerEngine::new())),
            bus,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(Mutex::new(())),
            ticker: Mutex::new(None),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin (or resume) ticking. No-op when already running.
    pub fn start(&self) {
        let started = lock(&self.engine).start();
        if !started {
            return;
        }
        self.publish_state(TimerState::Running);

        let generation = self.generation.load(Ordering::SeqCst);
        let task = tick_task(
            Arc::clone(&self.engine),
            Arc::clone(&self.bus),
            Arc::clone(&self.generation),
            Arc::clone(&self.in_flight),
            generation,
        );
        *lock(&self.ticker) = Some(tokio::spawn(task));
    }

    /// Halt ticking. After this returns the tick source is fully cancelled;
    /// a late tick arriving afterwards would be a correctness bug.
    pub fn pause(&self) {
        self.cancel_ticker();
        let paused = lock(&self.engine).pause();
        if paused {
            self.publish_state(TimerState::Paused);
        }
    }

    /// Force Stopped and rewind to a fresh work phase.
    pub fn stop(&self) {
        self.cancel_ticker();
        let remaining = {
            let mut engine = lock(&self.engine);
            engine.stop();
            engine.remaining_seconds()
        };
        self.publish_state(TimerState::Stopped);
        self.publish_tick(remaining);
    }

    /// Rewind without changing the run state. Observers get a fresh tick so
    /// they redraw immediately.
    pub fn reset(&self) {
        let remaining = {
            let mut engine = lock(&self.engine);
            engine.reset();
            engine.remaining_seconds()
        };
        self.publish_tick(remaining);
    }

    // ── Profile sync ─────────────────────────────────────────────────

    /// Sync durations, mode, and the reminder snapshot from a profile.
    pub fn apply_profile(&self, profile: &Profile) {
        debug!(profile = %profile.name, "applying profile to timer");
        let recomputed = lock(&self.engine).apply_profile(profile);
        if recomputed {
            self.publish_tick(lock(&self.engine).remaining_seconds());
        }
    }

    pub fn set_work_minutes(&self, minutes: u32) {
        let recomputed = lock(&self.engine).set_work_minutes(minutes);
        if recomputed {
            self.publish_tick(lock(&self.engine).remaining_seconds());
        }
    }

    pub fn set_break_minutes(&self, minutes: u32) {
        lock(&self.engine).set_break_minutes(minutes);
    }

    pub fn set_pomodoro_mode(&self, enabled: bool) {
        lock(&self.engine).set_pomodoro_mode(enabled);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        lock(&self.engine).state()
    }

    pub fn remaining_seconds(&self) -> u32 {
        lock(&self.engine).remaining_seconds()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let engine = lock(&self.engine);
        TimerSnapshot {
            state: engine.state(),
            phase: engine.phase(),
            remaining_seconds: engine.remaining_seconds(),
            formatted_time: engine.formatted_time(),
            current_cycle: engine.current_cycle(),
            work_minutes: engine.work_minutes(),
            break_minutes: engine.break_minutes(),
            pomodoro_mode: engine.pomodoro_mode(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Invalidate the current generation, abort the task, then wait out any
    /// iteration that was already past its generation check.
    fn cancel_ticker(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
        drop(lock(&self.in_flight));
    }

    fn publish_state(&self, state: TimerState) {
        self.bus.publish(Event::TimerStateChanged {
            state,
            at: Utc::now(),
        });
    }

    fn publish_tick(&self, remaining_seconds: u32) {
        self.bus.publish(Event::TimerTick {
            remaining_seconds,
            at: Utc::now(),
        });
    }
}

async fn tick_task(
    engine: Arc<Mutex<TimerEngine>>,
    bus: Arc<EventBus>,
    generation: Arc<AtomicU64>,
    in_flight: Arc<Mutex<()>>,
    my_generation: u64,
) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick completes immediately; the countdown starts
    // one full period later.
    interval.tick().await;

    loop {
        interval.tick().await;

        let guard = lock(&in_flight);
        let (remaining, completion) = {
            let mut engine = lock(&engine);
            if generation.load(Ordering::SeqCst) != my_generation
                || engine.state() != TimerState::Running
            {
                return;
            }
            let completion = engine.tick();
            (engine.remaining_seconds(), completion)
        };

        bus.publish(Event::TimerTick {
            remaining_seconds: remaining,
            at: Utc::now(),
        });

        if let Some(completion) = completion {
            // The engine paused itself; acknowledgement (another start)
            // resumes with the next phase.
            bus.publish(Event::TimerStateChanged {
                state: TimerState::Paused,
                at: Utc::now(),
            });
            bus.publish(Event::TimerCompleted {
                notification: completion.notification,
                phase: completion.phase,
                duration_seconds: completion.duration_seconds,
                at: Utc::now(),
            });
            return;
        }
        drop(guard);
    }
}

// A poisoned lock still holds mutually consistent timer state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::atomic::AtomicUsize;

    fn tick_counter(bus: &EventBus) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.subscribe(EventKind::TimerTick, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn running_timer_emits_one_tick_per_second() {
        let bus = Arc::new(EventBus::new());
        let ticks = tick_counter(&bus);
        let controller = TimerController::new(Arc::clone(&bus));

        controller.start();
        assert_eq!(controller.state(), TimerState::Running);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(controller.remaining_seconds(), 25 * 60 - 3);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn pause_produces_no_further_ticks() {
        let bus = Arc::new(EventBus::new());
        let ticks = tick_counter(&bus);
        let controller = TimerController::new(Arc::clone(&bus));

        controller.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        controller.pause();
        assert_eq!(controller.state(), TimerState::Paused);

        let before = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn completion_pauses_and_publishes_completion_event() {
        let bus = Arc::new(EventBus::new());
        let completions = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&completions);
        bus.subscribe(EventKind::TimerCompleted, move |event| {
            if let Event::TimerCompleted { phase, .. } = event {
                assert_eq!(*phase, Phase::Break);
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        let controller = TimerController::new(Arc::clone(&bus));
        let mut profile = Profile::new("one-minute");
        profile.work_minutes = 1;
        profile.break_minutes = 1;
        controller.apply_profile(&profile);

        controller.start();
        tokio::time::sleep(Duration::from_millis(60_500)).await;

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), TimerState::Paused);
        assert_eq!(controller.remaining_seconds(), 60);

        // No ticking without acknowledgement.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.remaining_seconds(), 60);

        // Acknowledge: the break phase counts down.
        controller.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(controller.remaining_seconds(), 58);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn stop_rewinds_and_republishes() {
        let bus = Arc::new(EventBus::new());
        let ticks = tick_counter(&bus);
        let controller = TimerController::new(Arc::clone(&bus));

        controller.start();
        tokio::time::sleep(Duration::from_millis(4500)).await;
        controller.stop();

        assert_eq!(controller.state(), TimerState::Stopped);
        assert_eq!(controller.remaining_seconds(), 25 * 60);
        // Four countdown ticks plus the redraw tick from the reset.
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn duration_edits_do_not_disturb_a_running_countdown() {
        let bus = Arc::new(EventBus::new());
        let controller = TimerController::new(Arc::clone(&bus));

        controller.set_work_minutes(50);
        assert_eq!(controller.remaining_seconds(), 50 * 60);

        controller.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        controller.set_work_minutes(10);
        assert_eq!(controller.remaining_seconds(), 50 * 60 - 1);

        controller.stop();
        assert_eq!(controller.remaining_seconds(), 10 * 60);
    }
}
