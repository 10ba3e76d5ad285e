use anyhow::Result;
use tracing::{info, warn};

use super::Session;

pub async fn handle(session: &Session<'_>, host: &str, index: i64) -> Result<()> {
    let mut doc = session.store.load();
    let host = host.trim();

    info!("Removing rule {} for {}...", index, host);
    let removal = match doc.remove_rule(host, index) {
        Ok(removal) => removal,
        Err(e) => {
            warn!("{}", e);
            return Ok(());
        }
    };

    if removal.host_emptied {
        session.unregister_host(host).await;
        info!("Removed last rule for {}", host);
    } else {
        // Saved even if this refresh fails; `sync` re-registers later
        session.register_host(&doc, host).await;
        info!("Removed rule {} for {}", index, host);
    }

    session.store.save(&doc)?;
    info!("Deleted selector: {}", removal.rule.selector);
    session
        .notify(&format!("Cosmetic filter removed for {}", host))
        .await;

    if let Some(tab) = session.active_tab().await
        && tab.host().as_deref() == Some(host)
    {
        info!("Reloading active tab to apply change...");
        session.reload_active_tab().await;
    }
    Ok(())
}
