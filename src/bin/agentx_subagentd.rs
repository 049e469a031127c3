//! `agentx-subagentd`: an RFC 2741 AgentX subagent serving IF-MIB interface
//! counters, the IP-MIB ARP table, and the Q-BRIDGE-MIB forwarding database
//! against a Redis-backed operational database.
//!
//! Process surface per spec.md §6.5: a Unix-domain socket to the master
//! agent, a Unix-domain socket to the database, an update-frequency flag,
//! repeatable verbosity, and graceful shutdown on SIGINT/SIGTERM with exit
//! code 0, or 1 on an unhandled startup failure.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use agentx_subagent::agent::Supervisor;
use agentx_subagent::cli::Args;
use agentx_subagent::db::RedisDbAdapter;
use agentx_subagent::mib::MibBuilder;
use agentx_subagent::mibs::arp::ArpMib;
use agentx_subagent::mibs::fdb::FdbMib;
use agentx_subagent::mibs::interfaces::{IfEntryView, IfNumberView, IfXEntryView, InterfacesMib};
use agentx_subagent::session::SessionConfig;
use agentx_subagent::updater::UpdaterConfig;
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "agentx-subagentd exited with an unhandled error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> agentx_subagent::Result<()> {
    tracing::info!(
        agentx_socket = %args.agentx_socket.display(),
        db_socket = %args.db_socket,
        update_frequency = args.update_frequency,
        "starting agentx-subagentd"
    );

    let db = Arc::new(RedisDbAdapter::connect(&args.db_socket).await?);

    let interfaces = Arc::new(InterfacesMib::new(db.clone()));
    let arp = Arc::new(ArpMib::new(db.clone()));
    let fdb = Arc::new(FdbMib::new(db.clone()));

    let mib = MibBuilder::new()
        .scalar(IfNumberView::<RedisDbAdapter>::oid(), Arc::new(interfaces.if_number()))?
        .subtree(IfEntryView::<RedisDbAdapter>::base_oid(), Arc::new(interfaces.if_entry()))?
        .subtree(IfXEntryView::<RedisDbAdapter>::base_oid(), Arc::new(interfaces.if_x_entry()))?
        .subtree(ArpMib::<RedisDbAdapter>::base_oid(), arp.clone())?
        .subtree(FdbMib::<RedisDbAdapter>::base_oid(), fdb.clone())?
        .build();

    let session_config = SessionConfig {
        socket_path: args.agentx_socket.clone(),
        description: format!("agentx-subagentd {}", env!("CARGO_PKG_VERSION")),
        ..Default::default()
    };

    let mut supervisor = Supervisor::new(session_config, Arc::new(mib));
    let updater_config = UpdaterConfig {
        frequency: Duration::from_secs(args.update_frequency),
        reinit_rate: Duration::from_secs(args.update_frequency * 12),
    };
    supervisor.add_updater(interfaces, updater_config);
    supervisor.add_updater(arp, updater_config);
    supervisor.add_updater(fdb, updater_config);

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, stopping agentx-subagentd");
        signal_shutdown.cancel();
    });

    supervisor.run(shutdown).await;
    Ok(())
}

/// Resolves on SIGINT (Ctrl-C) or SIGTERM, whichever arrives first.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
