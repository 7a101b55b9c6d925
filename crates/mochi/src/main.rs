use std::sync::Arc;

use anyhow::Context;

use mochi_core::{config::Config, counting::GroupStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mochi_core::logging::init("mochi")?;

    let cfg = Arc::new(Config::load().context("failed to load configuration")?);
    let store = Arc::new(GroupStore::new());

    mochi_telegram::router::run_polling(cfg, store.clone())
        .await
        .context("telegram bot failed")?;

    tracing::info!(groups = store.group_count().await, "bot stopped");
    Ok(())
}
