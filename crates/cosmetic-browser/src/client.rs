use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::tab::{parse_tabs, Tab};
use crate::{BrowserError, Result};

/// Stdout prefix the control binary uses for failures it reports itself
const ERROR_SENTINEL: &str = "ERR";

/// JavaScript to evaluate in the active tab
#[derive(Debug, Clone, Copy)]
pub enum Script<'a> {
    /// Sent on stdin (`eval --stdin`)
    Stdin(&'a str),
    /// Passed as an argument (`eval <js>`)
    Inline(&'a str),
}

/// Operations the tool needs from the browser
#[async_trait]
pub trait BrowserControl: Send + Sync {
    /// All open tabs
    async fn list_tabs(&self) -> Result<Vec<Tab>>;

    /// Register or overwrite the userscript `script_id`
    async fn register_script(&self, script_id: &str, body: &str) -> Result<()>;

    /// Remove the userscript `script_id`
    async fn unregister_script(&self, script_id: &str) -> Result<()>;

    /// Evaluate JavaScript in the active tab and return its stdout
    async fn eval(&self, script: Script<'_>) -> Result<String>;

    /// Show a transient message in the tab strip
    async fn tabstrip_message(&self, text: &str, duration_ms: u64) -> Result<()>;

    /// Briefly reveal the tab strip
    async fn tabstrip_peek(&self, duration_ms: u64) -> Result<()>;
}

/// Talks to the `rethread` control binary through child processes
#[derive(Debug, Clone)]
pub struct RethreadClient {
    program: String,
    profile: Option<String>,
    user_data_dir: Option<PathBuf>,
}

impl RethreadClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: None,
            user_data_dir: None,
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_user_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.user_data_dir = dir;
        self
    }

    /// Argument vector for a subcommand. Instance-selection flags go right
    /// after the first word, where the control binary parses them.
    fn args(&self, words: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(words.len() + 2);
        let mut words = words.iter();
        if let Some(first) = words.next() {
            args.push(first.to_string());
        }
        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }
        if let Some(profile) = &self.profile {
            args.push(format!("--profile={}", profile));
        }
        args.extend(words.map(|w| w.to_string()));
        args
    }

    async fn run(&self, words: &[&str], input: Option<&str>) -> Result<String> {
        let args = self.args(words);
        debug!("Running command: {} {}", self.program, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| BrowserError::Unavailable {
            program: self.program.clone(),
            source,
        })?;

        // Stdin is fed while stdout and stderr drain; a child that exits
        // without reading is reported through its status
        let pipe = input.zip(child.stdin.take());
        let program = &self.program;
        let feed = async move {
            if let Some((input, mut stdin)) = pipe
                && let Err(e) = stdin.write_all(input.as_bytes()).await
            {
                debug!("Failed to write stdin for {}: {}", program, e);
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        if !output.status.success() {
            return Err(BrowserError::Rejected {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| BrowserError::InvalidResponse(format!("non UTF-8 output: {}", e)))?;
        check_sentinel(stdout)
    }
}

/// Treat `ERR`-prefixed stdout as a remote failure even on exit code zero.
fn check_sentinel(stdout: String) -> Result<String> {
    let trimmed = stdout.trim();
    if trimmed.starts_with(ERROR_SENTINEL) {
        return Err(BrowserError::Remote(trimmed.to_string()));
    }
    Ok(stdout)
}

#[async_trait]
impl BrowserControl for RethreadClient {
    async fn list_tabs(&self) -> Result<Vec<Tab>> {
        let stdout = self.run(&["tabs", "list"], None).await?;
        parse_tabs(&stdout)
    }

    async fn register_script(&self, script_id: &str, body: &str) -> Result<()> {
        self.run(&["scripts", "add", "--id", script_id], Some(body))
            .await
            .map(|_| ())
    }

    async fn unregister_script(&self, script_id: &str) -> Result<()> {
        self.run(&["scripts", "rm", "--id", script_id], None)
            .await
            .map(|_| ())
    }

    async fn eval(&self, script: Script<'_>) -> Result<String> {
        match script {
            Script::Stdin(source) => self.run(&["eval", "--stdin"], Some(source)).await,
            Script::Inline(source) => self.run(&["eval", source], None).await,
        }
    }

    async fn tabstrip_message(&self, text: &str, duration_ms: u64) -> Result<()> {
        let duration = format!("--duration={}", duration_ms);
        self.run(&["tabstrip", "message", &duration, text], None)
            .await
            .map(|_| ())
    }

    async fn tabstrip_peek(&self, duration_ms: u64) -> Result<()> {
        let duration = duration_ms.to_string();
        self.run(&["tabstrip", "peek", &duration], None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_instance_flags() {
        let client = RethreadClient::new("rethread");
        assert_eq!(
            client.args(&["scripts", "add", "--id", "cosmetic-filter-a.com"]),
            vec!["scripts", "add", "--id", "cosmetic-filter-a.com"]
        );
    }

    #[test]
    fn test_args_place_instance_flags_after_subcommand() {
        let client = RethreadClient::new("rethread")
            .with_profile(Some("work".to_string()))
            .with_user_data_dir(Some(PathBuf::from("/tmp/rt")));
        assert_eq!(
            client.args(&["tabs", "list"]),
            vec!["tabs", "--user-data-dir=/tmp/rt", "--profile=work", "list"]
        );
    }

    #[test]
    fn test_sentinel() {
        assert!(matches!(
            check_sentinel("ERR failed to switch tab\n".to_string()),
            Err(BrowserError::Remote(msg)) if msg == "ERR failed to switch tab"
        ));
        assert_eq!(check_sentinel("OK\n".to_string()).unwrap(), "OK\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let client = RethreadClient::new("/nonexistent/rethread-control-binary");
        let err = client.list_tabs().await.unwrap_err();
        assert!(matches!(err, BrowserError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_rejected() {
        let client = RethreadClient::new("false");
        let err = client.unregister_script("cosmetic-filter-a.com").await.unwrap_err();
        assert!(matches!(err, BrowserError::Rejected { status: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_inline_eval_passes_arguments() {
        let client = RethreadClient::new("echo");
        let stdout = client
            .eval(Script::Inline("window.location.reload()"))
            .await
            .unwrap();
        assert_eq!(stdout, "eval window.location.reload()\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_stdin_does_not_block_on_output() {
        // Larger than a pipe buffer in both directions
        let input = "a".repeat(1 << 20);
        let client = RethreadClient::new("cat");
        let stdout = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            client.run(&["-"], Some(&input)),
        )
        .await
        .expect("cat should finish")
        .unwrap();
        assert_eq!(stdout.len(), input.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tabstrip_message_arguments() {
        let client = RethreadClient::new("echo");
        let stdout = client.run(&["tabstrip", "message", "--duration=800", "hi"], None).await;
        assert_eq!(stdout.unwrap(), "tabstrip message --duration=800 hi\n");
        assert!(client.tabstrip_peek(750).await.is_ok());
    }
}
