use anyhow::Result;
use orderbook_depth::{config::AppConfig, pipeline::Pipeline, utils};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        backend_url = %config.backend_url,
        poll_secs = config.poll_interval.as_secs(),
        reconnect_ms = config.reconnect_delay.as_millis() as u64,
        "[INIT] orderbook-depth starting"
    );

    let pipeline = Pipeline::spawn(config);
    let store = pipeline.store();

    // Presentation stand-in: log every accepted book and status change.
    let presenter = {
        let mut books = store.subscribe();
        let mut status = store.subscribe_status();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = books.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let view = books.borrow_and_update().clone();
                        tracing::info!("[BOOK] {}", utils::describe_book(&view));
                    }
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = *status.borrow_and_update();
                        tracing::info!(status = %current, "[BOOK] feed status");
                    }
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("[INIT] shutdown requested");
    presenter.abort();
    let stats = pipeline.shutdown().await?;
    tracing::info!(
        submitted = stats.submitted,
        emitted = stats.emitted,
        suppressed = stats.suppressed_duplicates,
        superseded = stats.superseded,
        "[INIT] orderbook-depth stopped"
    );
    Ok(())
}
