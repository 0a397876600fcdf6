//! Assembles the running system: live source → relay actor → hub → server.
//!
//! Everything lives under one [`ActorSystem`]; ctrl-c signals the shared
//! shutdown channel, which drains the relay mailbox and stops the server's
//! accept loop before the process exits.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tally_actors::actor::{spawn_actor_with_shutdown, ActorHandle};
use tally_actors::system::ActorSystem;
use tally_actors::{OverlayHub, RelayActor};
use tally_config::TallyConfig;
use tally_live::{DisabledSource, LiveSource, WebcastSource};
use tally_server::AppState;
use tally_social::tiktok::{AggregatorClient, ProfileScraper};
use tally_social::FollowerLookup;

const RELAY_MAILBOX: usize = 1024;

fn live_source(cfg: &TallyConfig) -> Result<Arc<dyn LiveSource>> {
    match &cfg.live.gateway {
        Some(gateway) => {
            let source = WebcastSource::new(
                gateway,
                Duration::from_secs(cfg.live.connect_timeout_secs),
                cfg.live.event_buffer,
            )?;
            Ok(Arc::new(source))
        }
        None => {
            tracing::warn!("no live gateway configured; follow relaying is disabled");
            Ok(Arc::new(DisabledSource))
        }
    }
}

fn follower_lookup(cfg: &TallyConfig) -> Result<FollowerLookup> {
    let aggregator = AggregatorClient::new(
        &cfg.aggregator.endpoint,
        Duration::from_secs(cfg.aggregator.timeout_secs),
    )?;
    let scraper = ProfileScraper::new(
        &cfg.profile.endpoint,
        Duration::from_secs(cfg.profile.timeout_secs),
        &cfg.profile.accept_language,
    )?;
    Ok(FollowerLookup::new(
        aggregator,
        scraper,
        Duration::from_secs(cfg.cache.ttl_secs),
    ))
}

pub async fn run(cfg: TallyConfig, port_override: Option<u16>) -> Result<()> {
    let mut system = ActorSystem::new();
    let hub = OverlayHub::new();

    let ActorHandle { addr: relay, task } = spawn_actor_with_shutdown(
        RelayActor::new(live_source(&cfg)?, hub.clone()),
        RELAY_MAILBOX,
        Some(system.shutdown_notifier()),
    );
    system.track(async move {
        task.await??;
        Ok(())
    });

    let state = Arc::new(AppState::new(follower_lookup(&cfg)?, hub, relay));

    let port = port_override.unwrap_or(cfg.server.port);
    let addr: SocketAddr = format!("{}:{}", cfg.server.bind, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.server.bind, port))?;

    let server_shutdown = system.shutdown_notifier();
    system.track(async move { tally_server::serve(addr, state, server_shutdown).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("ctrl-c received; shutting down");
    system.graceful_shutdown().await
}
