use anyhow::Result;
use std::io::Write;
use tracing::{error, warn};

use super::Session;

/// Print the userscript body a host would get, without contacting the browser
pub fn handle(session: &Session<'_>, host: &str, out: &mut impl Write) -> Result<()> {
    let doc = session.store.load();
    let host = host.trim();

    match session.render_host(&doc, host) {
        Ok(Some(body)) => {
            out.write_all(body.as_bytes())?;
            if !body.ends_with('\n') {
                writeln!(out)?;
            }
        }
        Ok(None) => warn!("No rules stored for {}", host),
        Err(e) => error!("{:#}", e),
    }
    Ok(())
}
