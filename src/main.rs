use herald::campaigns::{AgingSweep, MicromarketDigest, spawn_daily};
use herald::events::EventService;
use herald::notify::MulticastNotifier;
use herald::push::{FcmTransport, PushTransport};
use herald::server::{HeraldState, cors_layer, herald_router};
use herald::store::{self, DocumentStore};
use mimalloc::MiMalloc;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &herald::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        key_guard = !cfg.basic.herald_key.is_empty(),
        project_id = %cfg.fcm.project_id,
        proxy = %cfg.fcm.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        send_timeout_ms = cfg.notify.send_timeout_ms,
        "Herald starting"
    );

    let store: Arc<dyn DocumentStore> = Arc::new(store::spawn(&cfg.basic.database_url).await?);
    let transport: Arc<dyn PushTransport> = Arc::new(FcmTransport::new(&cfg.fcm)?);
    let notifier = MulticastNotifier::new(store, transport, &cfg.collections.agents)
        .with_send_timeout(cfg.notify.send_timeout());

    let events = EventService::new(notifier.clone(), cfg.collections.clone())
        .with_credit_charging(cfg.notify.charge_enquiry_credits);
    let aging = AgingSweep::new(notifier.clone(), &cfg.collections.listings)
        .with_page_size(cfg.campaigns.page_size())
        .with_age_persistence(cfg.campaigns.persist_ages);
    let digest = MicromarketDigest::new(
        notifier,
        &cfg.collections.agents,
        &cfg.collections.listings,
    )
    .with_page_size(cfg.campaigns.page_size());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut schedulers = Vec::new();
    if cfg.campaigns.aging_enabled {
        let at = cfg.campaigns.aging_at()?;
        let sweep = aging.clone();
        schedulers.push(spawn_daily("aging", at, shutdown_rx.clone(), move || {
            let sweep = sweep.clone();
            async move {
                if let Err(e) = sweep.run().await {
                    error!(error = %e, "Scheduled aging sweep failed");
                }
            }
        }));
    }
    if cfg.campaigns.digest_enabled {
        let at = cfg.campaigns.digest_at()?;
        let job = digest.clone();
        schedulers.push(spawn_daily("digest", at, shutdown_rx.clone(), move || {
            let job = job.clone();
            async move {
                if let Err(e) = job.run().await {
                    error!(error = %e, "Scheduled micromarket digest failed");
                }
            }
        }));
    }
    drop(shutdown_rx);

    let state = HeraldState::new(events, aging, digest, Arc::from(cfg.basic.herald_key.as_str()));
    let mut app = herald_router(state);
    if let Some(origin) = cfg.basic.cors_origin.as_deref().filter(|o| !o.is_empty()) {
        app = app.layer(cors_layer(origin)?);
        info!(origin = %origin, "CORS enabled");
    }

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let a campaign that is mid-run finish its dispatches.
    let _ = shutdown_tx.send(true);
    for handle in schedulers {
        if let Err(e) = handle.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
    }
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
