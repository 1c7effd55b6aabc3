use anyhow::{bail, Result};
use clap::Parser;
use dv_netsim::{Network, TopologyConfig};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "dv-netsim", about = "Distance-vector routing over emulated links")]
struct Cli {
    /// Topology file (JSON). Without it a line of routers is simulated.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Routers in the built-in line topology.
    #[arg(long, default_value_t = 3)]
    routers: usize,

    /// How long the concurrent run lasts before it is cancelled.
    #[arg(long, default_value_t = 2000)]
    duration_ms: u64,

    /// Run in deterministic lock-step rounds instead of concurrent tasks.
    #[arg(long)]
    stepped: bool,

    #[arg(long, default_value_t = 10_000)]
    max_rounds: usize,

    /// Write the topology in use to this file and exit.
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match &cli.config {
        Some(path) => TopologyConfig::load(path)?,
        None => TopologyConfig::line(cli.routers),
    };

    if let Some(path) = &cli.write_config {
        config.save(path)?;
        println!("Topology written to {}", path.display());
        return Ok(());
    }

    let network = Network::from_config(&config)?;

    let network = if cli.stepped {
        run_stepped(network, cli.max_rounds)?
    } else {
        let rt = Builder::new_multi_thread().enable_all().build()?;
        rt.block_on(run_concurrent(network, Duration::from_millis(cli.duration_ms)))?
    };

    let report = network.report();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for router in network.routers() {
            println!("{}", router.dump_routing_table());
        }
        for host in network.hosts() {
            for packet in host.inbox() {
                println!("{} received \"{}\"", host, String::from_utf8_lossy(packet.payload()));
            }
        }
        println!(
            "sent {} delivered {} forwarded {} dropped {} updates {}/{}",
            report.totals.packets_sent,
            report.totals.packets_delivered,
            report.totals.packets_forwarded,
            report.totals.packets_dropped,
            report.totals.updates_sent,
            report.totals.updates_received,
        );
    }

    if report.mismatches.is_empty() {
        info!("all routing tables match the shortest paths");
    } else {
        for m in &report.mismatches {
            warn!(
                "{}: route to {} has cost {:?}, shortest path is {:?}",
                m.router, m.destination, m.actual, m.expected
            );
        }
    }

    Ok(())
}

/// Converges the routing tables first, then sends the configured traffic.
fn run_stepped(mut network: Network, max_rounds: usize) -> Result<Network> {
    network.broadcast_routes();
    let Some(rounds) = network.run_until_quiet(max_rounds) else {
        bail!("routing did not settle within {} rounds", max_rounds);
    };
    info!("routing settled after {} rounds", rounds);

    network.inject_traffic()?;
    if network.run_until_quiet(max_rounds).is_none() {
        bail!("traffic still in flight after {} rounds", max_rounds);
    }
    Ok(network)
}

async fn run_concurrent(network: Network, duration: Duration) -> Result<Network> {
    let token = CancellationToken::new();

    let stopper = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = tokio::signal::ctrl_c() => warn!("interrupted"),
            }
            token.cancel();
        })
    };

    let network = network.run(token).await?;
    stopper.await?;
    Ok(network)
}
