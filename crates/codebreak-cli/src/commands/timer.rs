use std::sync::Arc;

use clap::Subcommand;
use tracing::debug;

use codebreak_core::{
    Event, EventBus, EventKind, LogChannel, NoProbe, NotificationRouter, TimerController,
};

use super::AppContext;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print the timer state as JSON
    Status,
    /// Run phases in the foreground, printing each tick
    Run {
        /// Override the work duration in minutes
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=180))]
        work: Option<u32>,
        /// Override the break duration in minutes
        #[arg(long = "break", value_parser = clap::value_parser!(u32).range(1..=60))]
        break_minutes: Option<u32>,
        /// How many phases to run before exiting; phases after the first are
        /// acknowledged automatically
        #[arg(long, default_value = "1")]
        phases: u32,
    },
}

pub async fn run(action: TimerAction, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Status => status(ctx),
        TimerAction::Run {
            work,
            break_minutes,
            phases,
        } => run_phases(ctx, work, break_minutes, phases).await,
    }
}

fn controller_for(ctx: &AppContext) -> TimerController {
    let controller = TimerController::new(Arc::clone(&ctx.bus));
    let registry = ctx.registry.lock().expect("registry lock");
    controller.apply_profile(registry.current_with_pending());
    controller
}

fn status(ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    let controller = controller_for(ctx);
    let profile = ctx
        .registry
        .lock()
        .expect("registry lock")
        .current_profile()
        .name
        .clone();

    let mut json = serde_json::to_value(controller.snapshot())?;
    json["profile"] = serde_json::Value::String(profile);
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn run_phases(
    ctx: &AppContext,
    work: Option<u32>,
    break_minutes: Option<u32>,
    phases: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = controller_for(ctx);
    if let Some(minutes) = work {
        controller.set_work_minutes(minutes);
    }
    if let Some(minutes) = break_minutes {
        controller.set_break_minutes(minutes);
    }

    // Completions route through the same notification pipeline the desktop
    // shell uses, just with the log channel as the only sink.
    let router = NotificationRouter::new(vec![Box::new(LogChannel)], Box::new(NoProbe));
    router.set_profile(Some(
        ctx.registry
            .lock()
            .expect("registry lock")
            .current_with_pending()
            .clone(),
    ));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    wire_printer(&ctx.bus, tx, Arc::clone(&router));

    for phase in 0..phases {
        if phase > 0 {
            println!("acknowledged, continuing with the next phase");
        }
        controller.start();
        let completion = rx.recv().await.ok_or("tick source ended unexpectedly")?;
        debug!(?completion, "phase complete");
    }

    let snapshot = controller.snapshot();
    println!(
        "{} phase(s) done; paused at {} awaiting acknowledgement",
        phases, snapshot.formatted_time
    );
    Ok(())
}

/// Print ticks and completions as they are published; forward completions to
/// the waiting run loop.
fn wire_printer(
    bus: &Arc<EventBus>,
    completions: tokio::sync::mpsc::UnboundedSender<codebreak_core::NotificationType>,
    router: Arc<NotificationRouter>,
) {
    bus.subscribe(EventKind::TimerTick, |event| {
        if let Event::TimerTick {
            remaining_seconds, ..
        } = event
        {
            println!("{:02}:{:02}", remaining_seconds / 60, remaining_seconds % 60);
        }
    });

    bus.subscribe(EventKind::TimerCompleted, move |event| {
        if let Event::TimerCompleted {
            notification,
            phase,
            ..
        } = event
        {
            println!("phase complete, next up: {phase:?}");
            router.dispatch(*notification);
            let _ = completions.send(*notification);
        }
    });
}
