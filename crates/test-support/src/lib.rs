//! Helpers for tests that drive the `mcp-bridge` binary over HTTP.

use anyhow::Context as _;
use std::ffi::OsStr;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Kills (and reaps) the child when dropped.
pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; another process may bind it first.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a 2xx status.
///
/// # Errors
///
/// Returns an error if the timeout elapses first.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}

/// A running bridge bound to a fresh localhost port.
pub struct BridgeProcess {
    pub base_url: String,
    _child: KillOnDrop,
}

impl BridgeProcess {
    /// Spawn `bin` with `--bind` on an unused port plus `extra_args`, and wait for `/health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or never becomes healthy.
    pub async fn spawn<I, S>(bin: &str, extra_args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let port = pick_unused_port()?;
        let child = Command::new(bin)
            .arg("--bind")
            .arg(format!("127.0.0.1:{port}"))
            .arg("--log-level")
            .arg("warn")
            .args(extra_args)
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {bin}"))?;
        let child = KillOnDrop(child);

        let base_url = format!("http://127.0.0.1:{port}");
        wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(30)).await?;
        Ok(Self {
            base_url,
            _child: child,
        })
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
