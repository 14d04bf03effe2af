//! vmctld - lifecycle scheduler for virtual machines and containers.
//!
//! Reads control commands from stdin, one per line, until end of input or
//! a termination signal, then stops the scheduler.

use std::io;

use clap::Parser;
use tokio::io::BufReader;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmctld_control::{serve, ControlService};
use vmctld_driver::DriverConfig;
use vmctld_scheduler::{Planner, Registry, Scheduler, SchedulerConfig};

/// vmctld - lifecycle scheduler for virtual machines and containers.
#[derive(Parser, Debug)]
#[command(name = "vmctld")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Program controlling virtual machines [env: VMCTLD_QM_PROGRAM, default: qm].
    #[arg(long)]
    qm: Option<String>,

    /// Program controlling containers [env: VMCTLD_PCT_PROGRAM, default: pct].
    #[arg(long)]
    pct: Option<String>,

    /// Log transitions without running them [env: VMCTLD_DRY_RUN].
    #[arg(long)]
    dry_run: bool,

    /// Log filter directives.
    #[arg(long, env = "RUST_LOG", default_value = "info,vmctld=debug")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries command output, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&args.log_filter)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Flags override the environment
    let mut drivers = DriverConfig::from_env();
    if let Some(qm) = args.qm {
        drivers.qm_program = qm;
    }
    if let Some(pct) = args.pct {
        drivers.pct_program = pct;
    }
    let mut config = SchedulerConfig::from_env();
    config.dry_run |= args.dry_run;

    tracing::info!(
        qm = %drivers.qm_program,
        pct = %drivers.pct_program,
        dry_run = config.dry_run,
        "Starting vmctld"
    );

    let scheduler = Scheduler::spawn(config);
    let control = ControlService::new(Planner::new(Registry::from_config(&drivers)), scheduler);

    let result = run(&control).await;

    control.shutdown().await;
    tracing::info!("vmctld shut down");
    result
}

/// Serve stdin until end of input, SIGINT or SIGTERM.
async fn run(control: &ControlService) -> anyhow::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let terminated = async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT, initiating shutdown"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, initiating shutdown"),
        }
    };

    serve(
        control,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        terminated,
    )
    .await?;
    Ok(())
}
