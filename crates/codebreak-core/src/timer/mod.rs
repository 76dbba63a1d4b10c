mod controller;
mod engine;

pub use controller::{TimerController, TimerSnapshot, TICK_INTERVAL};
pub use engine::{Completion, Phase, TimerEngine, TimerState};
