//! # tally-bridge
//!
//! Runs the switcher→camera tally bridge, or pokes the gateway by hand.
//!
//! ```text
//! tally-bridge [--config PATH] [--debug] [run]
//! tally-bridge once
//! tally-bridge send --unit XCU-08 --red on
//! tally-bridge send --session PH3XQD --green off --yellow on
//! tally-bridge list-units
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use tally_core::{CoreError, LampState, SessionId, TallyColor, UnitId};
use tally_sync::{
    build_scheduler, BridgeConfig, TallyCommand, TallyCommandSender, TallyProtocolClient,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tally-bridge", version, about = "Switcher to camera tally bridge")]
struct Args {
    /// Configuration file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose bridge logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Poll the switcher and drive the lamps until interrupted.
    Run,
    /// Run a single cycle and print the resulting status as JSON.
    Once,
    /// Send lamp commands to one unit or session.
    Send(SendArgs),
    /// Print the configured units, their sessions and mapped sources.
    ListUnits,
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["unit", "session"])))]
#[command(group(ArgGroup::new("lamps").required(true).multiple(true).args(["red", "green", "yellow"])))]
struct SendArgs {
    /// Camera unit, resolved to a session through the configuration.
    #[arg(long)]
    unit: Option<String>,

    /// Gateway session id, used as given.
    #[arg(long)]
    session: Option<String>,

    #[arg(long, value_parser = parse_lamp)]
    red: Option<LampState>,

    #[arg(long, value_parser = parse_lamp)]
    green: Option<LampState>,

    #[arg(long, value_parser = parse_lamp)]
    yellow: Option<LampState>,

    /// Gateway host override.
    #[arg(long)]
    host: Option<String>,

    /// Gateway port override.
    #[arg(long)]
    port: Option<u16>,
}

fn parse_lamp(value: &str) -> Result<LampState, CoreError> {
    value.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = BridgeConfig::load(args.config.clone()).context("loading configuration")?;

    match args.cmd.unwrap_or(Cmd::Run) {
        Cmd::Run => run(&config).await?,
        Cmd::Once => once(&config).await?,
        Cmd::Send(send_args) => return send(config, send_args).await,
        Cmd::ListUnits => list_units(&config)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(debug: bool) {
    let default = if debug { "info,tally=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: &BridgeConfig) -> anyhow::Result<()> {
    let scheduler = build_scheduler(config).context("building scheduler")?;
    info!(
        switcher = %config.switcher.base_url,
        gateway = %config.gateway_config().address(),
        interval_ms = config.sync.interval_ms,
        "Tally bridge starting"
    );

    let handle = scheduler.spawn();
    shutdown_signal().await;

    info!("Shutting down");
    handle.shutdown().await.context("stopping scheduler")?;
    Ok(())
}

async fn once(config: &BridgeConfig) -> anyhow::Result<()> {
    let scheduler = build_scheduler(config).context("building scheduler")?;
    let status = scheduler.run_once().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn send(mut config: BridgeConfig, args: SendArgs) -> anyhow::Result<ExitCode> {
    if let Some(host) = args.host {
        config.gateway.host = host;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    let sessions = config.sessions().context("reading gateway sessions")?;
    let client = TallyProtocolClient::new(config.gateway_config());

    let lamps = [
        (TallyColor::Red, args.red),
        (TallyColor::Green, args.green),
        (TallyColor::Yellow, args.yellow),
    ];

    let mut failed = 0usize;
    for (color, lamp) in lamps {
        let Some(lamp) = lamp else { continue };

        let command = match (&args.unit, &args.session) {
            (Some(unit), _) => {
                let unit = UnitId::new(unit).context("invalid unit id")?;
                TallyCommand::for_unit(&unit, color, lamp, &sessions)
            }
            (None, Some(session)) => {
                TallyCommand::for_session(SessionId::new(session.as_str()), color, lamp)
            }
            (None, None) => unreachable!("clap requires --unit or --session"),
        };

        match client.send(&command).await {
            Ok(outcome) => println!("{} {} {}: {:?}", command.target(), color, lamp, outcome),
            Err(e) => {
                failed += 1;
                error!(error = %e, "{} {} {} failed", command.target(), color, lamp);
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_units(config: &BridgeConfig) -> anyhow::Result<()> {
    let mapping = config.camera_mapping().context("reading camera mapping")?;
    let sessions = config.sessions().context("reading gateway sessions")?;

    let mut units = mapping.units();
    units.extend(sessions.iter().map(|(unit, _)| unit.clone()));

    if units.is_empty() {
        println!("No units configured");
        return Ok(());
    }

    for unit in &units {
        let session = sessions.resolve(unit);
        let session = if session.is_unresolved() {
            "(no session)"
        } else {
            session.session_id()
        };
        let sources: Vec<String> = mapping
            .sources_for(unit)
            .iter()
            .map(|source| source.to_string())
            .collect();

        println!("{:<12} {session:<12} {}", unit.as_str(), sources.join(", "));
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
