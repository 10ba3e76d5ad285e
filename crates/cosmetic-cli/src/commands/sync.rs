use anyhow::Result;
use tracing::{info, warn};

use super::Session;

/// Re-register every stored host without touching the database
pub async fn handle(session: &Session<'_>) -> Result<()> {
    let doc = session.store.load();
    if doc.is_empty() {
        info!("No cosmetic filters stored");
        return Ok(());
    }

    let total = doc.filters.len();
    let mut refreshed = 0;
    for (host, _) in doc.list_filters() {
        info!("Registering stored filters for {}...", host);
        if session.register_host(&doc, host).await {
            refreshed += 1;
        }
    }

    if refreshed == total {
        info!("Refreshed {} cosmetic filter script(s)", refreshed);
    } else {
        warn!("Refreshed {} of {} cosmetic filter script(s)", refreshed, total);
    }
    Ok(())
}
