use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use sim_metrics::collector::{Collector, ModInfo};
use sim_metrics::config::load_config;
use sim_metrics::demo::DemoHost;
use sim_metrics::handlers::AppState;
use sim_metrics::hooks::HostHooks;
use sim_metrics::init_tracing;
use sim_metrics::server::MetricsServer;

#[derive(Parser)]
#[command(name = "sim-metrics", version, about = "Simulation telemetry exporter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exporter against the built-in demo host
    Run {
        /// Override the configured bind address (host:port)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bind } => run(bind).await,
        Commands::CheckConfig => {
            let config = load_config()?;
            println!(
                "configuration ok: bind {}:{}, load period {}ms, grace {}ms",
                config.server.host,
                config.server.port,
                config.sampler.load_period_ms,
                config.server.shutdown_grace_ms
            );
            Ok(())
        }
    }
}

async fn run(bind_override: Option<SocketAddr>) -> Result<()> {
    let config = load_config()?;
    let addr = match bind_override {
        Some(addr) => addr,
        None => SocketAddr::new(config.server.host.parse()?, config.server.port),
    };

    let host = DemoHost::start();
    let mut collector = Collector::attach(host.clone(), &config);

    let state = AppState {
        provider: collector.provider(),
        core: collector.core(),
        sync_read_timeout: Duration::from_millis(config.snapshot.sync_read_timeout_ms),
    };
    let server = MetricsServer::new(&config);
    server.start(addr, state).await?;

    // Scripted host activity so every endpoint has something to report.
    let activity = tokio::spawn(demo_activity(collector.hooks()));

    info!("running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    activity.abort();
    server.stop().await?;
    collector.detach().await;
    host.shutdown();
    Ok(())
}

async fn demo_activity(hooks: HostHooks) {
    hooks.mods_changed(&[
        ModInfo { id: 1_207_000_001, name: "Conveyor Tweaks".into() },
        ModInfo { id: 1_207_000_002, name: "Speed Mod".into() },
    ]);
    hooks.script_block_added(84_100_001, true);
    hooks.script_block_added(84_100_002, false);

    let mut player = 76_561_198_000_000_010u64;
    loop {
        hooks.player_joined(player);
        hooks.identity_created(player);
        tokio::time::sleep(Duration::from_secs(20)).await;

        hooks.save_started();
        tokio::time::sleep(Duration::from_millis(150)).await;
        hooks.save_finished();

        hooks.gc_approaching();
        tokio::time::sleep(Duration::from_millis(50)).await;
        hooks.gc_completed(Duration::from_millis(45));

        hooks.player_left(player);
        player += 1;
        tokio::time::sleep(Duration::from_secs(10)).await;
    }
}
