use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

use commands::AppContext;

#[derive(Parser)]
#[command(name = "codebreak", version, about = "Code Break productivity timer")]
struct Cli {
    /// Start minimized (recorded in the application settings)
    #[arg(short = 'm', long)]
    minimized: bool,

    /// Disable the system tray icon (recorded in the application settings)
    #[arg(long)]
    no_tray: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Select the named profile at startup (case-insensitive)
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Start the timer immediately instead of printing its status
    #[arg(long)]
    auto_start: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile management
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Application settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = AppContext::init()?;
    apply_startup_flags(&cli, &ctx);

    match cli.command {
        Some(Commands::Profile { action }) => commands::profile::run(action, &ctx)?,
        Some(Commands::Config { action }) => commands::config::run(action, &ctx)?,
        Some(Commands::Timer { action }) => commands::timer::run(action, &ctx).await?,
        None => {
            // Bare invocation: honor --auto-start, otherwise show the timer.
            let action = if cli.auto_start {
                commands::timer::TimerAction::Run {
                    work: None,
                    break_minutes: None,
                    phases: 1,
                }
            } else {
                commands::timer::TimerAction::Status
            };
            commands::timer::run(action, &ctx).await?;
        }
    }

    if ctx.scheduler.has_unsaved_changes() {
        ctx.scheduler.force_save()?;
    }
    ctx.scheduler.shutdown();
    Ok(())
}

/// Seed registry and settings state from the one-shot startup flags.
fn apply_startup_flags(cli: &Cli, ctx: &AppContext) {
    let mut registry = ctx.registry.lock().expect("registry lock");

    if cli.minimized {
        registry.settings_mut().start_minimized = true;
    }
    if cli.no_tray {
        registry.settings_mut().disable_tray = true;
    }

    if let Some(ref wanted) = cli.profile {
        let found = registry.find_ignore_case(wanted).map(|p| p.name.clone());
        match found {
            Some(name) => {
                debug!(profile = %name, "startup profile selected");
                registry.set_current_profile(&name);
            }
            None => eprintln!("warning: no profile matching '{wanted}', keeping current"),
        }
    }
}
