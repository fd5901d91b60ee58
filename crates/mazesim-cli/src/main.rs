//! `mazesim-cli` – headless maze exploration runner.
//!
//! 1. Initialises tracing (optionally exporting spans over OTLP).
//! 2. Loads `~/.mazesim/config.toml`, writing defaults on first run.
//! 3. Loads an arena layout: the descriptor named on the command line, else
//!    the persisted one, else an empty arena.  The layout is written back to
//!    the persisted descriptor path.
//! 4. Places the robot, runs one exploration and streams status, coverage
//!    and countdown events to the console.
//! 5. **Ctrl-C** aborts the run; the final map is printed either way.
//!
//! ```text
//! mazesim [DESCRIPTOR]
//! ```

mod config;
mod render;

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use mazesim_middleware::{BusSink, DisplaySink, EventBus, Topic};
use mazesim_perception::ArenaLayout;
use mazesim_runtime::{Explorer, Orchestrator, OrchestratorConfig, Session, SweepExplorer};
use mazesim_types::{ArenaDims, Cell, SimError};

use config::Config;

fn main() -> ExitCode {
    let telemetry = mazesim_runtime::init_tracing("mazesim");

    print_banner();
    if telemetry.is_exporting() {
        println!("  {} OTLP span export enabled", "✓".green().bold());
    }

    let cfg = match config::load_or_init() {
        Ok((cfg, source)) => {
            let path = config::config_path().display().to_string();
            match source {
                config::Source::File => println!("  Config loaded from {}", path.bold()),
                config::Source::WroteDefaults => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.bold()
                ),
                config::Source::Unsaved(e) => {
                    println!("{}: {}", "Error saving config".red(), e)
                }
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let source = std::env::args().nth(1).map(PathBuf::from);
    match runtime.block_on(run(cfg, source)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("  {} {}", "✗".red().bold(), e.to_string().red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config, source: Option<PathBuf>) -> Result<(), SimError> {
    let dims = ArenaDims::default();
    let bus = EventBus::default();
    spawn_printers(&bus);

    let sink: Arc<dyn DisplaySink> = Arc::new(BusSink::new(bus.clone(), "mazesim-cli"));
    let explorer = Arc::new(SweepExplorer::new(dims));
    let session = Session::new(explorer.maze_ref(), explorer.landmarks(), sink);
    let mut orchestrator = Orchestrator::new(
        session.clone(),
        explorer,
        OrchestratorConfig {
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            ..OrchestratorConfig::default()
        },
    );

    let descriptor = cfg.descriptor_or(config::default_descriptor_path());
    let layout = choose_layout(source.as_deref(), &descriptor, dims)?;
    session.load_map(layout, Some(&descriptor))?;

    orchestrator.configure_speed(cfg.speed)?;
    if let Err(e) = orchestrator.configure_target_coverage(cfg.target_coverage) {
        warn!(error = %e, "keeping default target coverage");
    }
    orchestrator.configure_time_limit(cfg.time_limit_secs)?;
    session.place_robot(Cell::new(cfg.start_col, cfg.start_row))?;

    let stop = orchestrator.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – aborting exploration …".yellow().bold());
        stop.stop();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the run cannot be aborted early");
    }

    let params = orchestrator.params();
    println!(
        "  Exploring: speed {} steps/s, target {}%, limit {}s\n",
        params.speed.to_string().bold(),
        params.target_coverage.to_string().bold(),
        params.time_limit_secs.to_string().bold()
    );
    let reason = orchestrator.start()?.wait().await?;
    // Let the printers drain what is already queued.
    tokio::time::sleep(Duration::from_millis(50)).await;

    info!(%reason, "exploration finished");
    render::print_map(&session.grid());
    Ok(())
}

/// Command-line descriptor first, then the persisted one, then an empty
/// arena.  A missing persisted file is not an error.
fn choose_layout(
    source: Option<&Path>,
    persisted: &Path,
    dims: ArenaDims,
) -> Result<ArenaLayout, SimError> {
    if let Some(path) = source {
        println!("  Reading arena from {}", path.display().to_string().bold());
        return ArenaLayout::read_descriptor(path, dims);
    }
    if persisted.exists() {
        println!("  Reading arena from {}", persisted.display().to_string().bold());
        return ArenaLayout::read_descriptor(persisted, dims);
    }
    println!("  No arena descriptor found; exploring an empty arena.");
    Ok(ArenaLayout::empty(dims))
}

fn spawn_printers(bus: &EventBus) {
    for topic in [Topic::Status, Topic::Telemetry, Topic::Timer] {
        let mut rx = bus.subscribe_to(topic);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                render::print_event(&event.payload);
            }
        });
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"  ┌┬┐┌─┐┌─┐┌─┐┌─┐┬┌┬┐"#.bold().cyan());
    println!("{}", r#"  │││├─┤┌─┘├┤ └─┐││││"#.bold().cyan());
    println!("{}", r#"  ┴ ┴┴ ┴└─┘└─┘└─┘┴┴ ┴"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "mazesim".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot maze exploration simulator");
    println!();
}
