//! Wormhole fault-injection runner.
//!
//! Loads a TOML topology, binds the wormhole between the configured node
//! pair, then toggles it on the configured period, re-analyzing the
//! propagation edges after every flip, until the cycle limit is reached
//! or ctrl-c stops the loop. `--fast` applies the toggles in virtual time
//! for scripted runs.

use std::net::SocketAddr;
use std::path::PathBuf;

use aether_sim::config::SimConfig;
use aether_sim::driver::{SimDriver, SimEvent};
use aether_sim::faults::WormholeFault;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Drive a scripted wormhole toggle against a simulated radio medium.
#[derive(Parser, Debug)]
#[command(name = "aether-run", about = "Scripted wormhole fault injection")]
struct Cli {
    /// Simulation config (TOML).
    #[arg(long)]
    config: PathBuf,

    /// Apply the toggles in virtual time and exit.
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// Override the configured cycle count.
    #[arg(long)]
    cycles: Option<u64>,

    /// UDP destination for per-toggle JSON stats.
    #[arg(long)]
    stats_dest: Option<SocketAddr>,
}

/// Cycle count used by `--fast` when neither the CLI nor the config caps
/// the run.
const DEFAULT_FAST_CYCLES: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("read config {}", cli.config.display()))?;
    let config = SimConfig::from_toml_str(&raw).map_err(anyhow::Error::msg)?;

    let medium = config.build_medium()?;
    tracing::info!(medium = %medium, seed = config.seed, "attached radio medium");

    let mut driver = SimDriver::new(medium);
    let fault = WormholeFault::bind(
        driver.medium(),
        config.wormhole.node_a,
        config.wormhole.node_b,
    )?
    .with_ratios(config.wormhole.tunnel_ratio, config.wormhole.severed_ratio);

    let cycles = cli.cycles.or(config.wormhole.cycles);

    // Stats relay: drains toggle events in a blocking thread and forwards
    // them as JSON datagrams.
    let stats_handle = cli.stats_dest.map(|dest| {
        let events = driver.events_rx.clone();
        std::thread::spawn(move || relay_stats(dest, events))
    });

    let done = if cli.fast {
        let n = cycles.unwrap_or(DEFAULT_FAST_CYCLES);
        for _ in 0..n {
            driver.toggle_wormhole(&fault)?;
        }
        n
    } else {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(true);
        });
        driver
            .run_wormhole_paced(&fault, config.wormhole.period, cycles, shutdown_rx)
            .await?
    };

    let stats = driver.medium().stats();
    tracing::info!(
        cycles = done,
        analyses = stats.analyses,
        analysis_requests = stats.analysis_requests,
        "wormhole run complete"
    );

    // Dropping the driver closes the event channel, letting the relay exit.
    drop(driver);
    if let Some(handle) = stats_handle {
        let _ = handle.join();
    }
    Ok(())
}

fn relay_stats(dest: SocketAddr, events: crossbeam_channel::Receiver<SimEvent>) {
    let socket = match std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| s.connect(dest).map(|_| s))
    {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("stats socket unavailable: {e}");
            return;
        }
    };

    while let Ok(event) = events.recv() {
        let SimEvent::WormholeToggled {
            cycle,
            state,
            reachable_a,
            reachable_b,
        } = event
        else {
            continue;
        };
        let json = serde_json::json!({
            "timestamp_ms": std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_millis(),
            "cycle": cycle,
            "state": state.to_string(),
            "reachable_a": reachable_a,
            "reachable_b": reachable_b,
        });
        if let Ok(line) = serde_json::to_string(&json) {
            let _ = socket.send(line.as_bytes());
        }
    }
}
