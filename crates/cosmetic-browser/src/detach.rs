//! Fire-and-forget child processes

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Start `program` with `args` and return without waiting for it.
///
/// The child gets null stdio and, on unix, its own process group, so it
/// survives the caller and cannot block it. Nothing it does is reported
/// back: only a failure to spawn is observable.
pub fn spawn_detached<I, S>(program: &Path, args: I) -> std::io::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn()?;
    debug!("Detached {} (pid {})", program.display(), child.id());
    Ok(())
}
