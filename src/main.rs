use std::sync::Arc;

use anyhow::Result;
use autoflex::{
    cfg::Config,
    notification::{sender::WebPushSender, store::SubscriptionStore, svc::Notification},
    server::Server,
};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let store = SubscriptionStore::new(&config.subscriptions_file);
    info!("Subscriptions stored in {}", store.path().display());

    let sender = WebPushSender::new(&config.vapid_private_key, &config.vapid_subject)?;
    let service = Arc::new(Notification::new(store, sender));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(());
            }
            Err(e) => error!("Failed to listen for ctrl-c: {e}"),
        }
    });

    Server::start(&config.listen_addr, service, shutdown_rx).await
}
