use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use wanon_core::{cache::CacheEvictor, config::Config};
use wanon_storage::{Database, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), wanon_core::Error> {
    wanon_core::logging::init("wanon")?;

    let cfg = Arc::new(Config::load()?);
    info!(database = %cfg.database_path.display(), "starting wanon");

    let store = Arc::new(SqliteStore::new(Arc::new(Database::open(
        &cfg.database_path,
    )?)));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                return;
            }
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    let evictor = Arc::new(CacheEvictor::new(store.clone(), cfg.evictor_config()));
    let evictor_task = evictor.spawn(cancel.clone());

    let polled = wanon_telegram::router::run_polling(
        cfg.clone(),
        store.clone(),
        store,
        cancel.clone(),
    )
    .await;

    cancel.cancel();
    if let Err(e) = evictor_task.await {
        error!(error = %e, "cache evictor task failed");
    }

    polled.map_err(|e| wanon_core::Error::External(format!("telegram bot failed: {e}")))?;
    info!("application stopped");
    Ok(())
}
