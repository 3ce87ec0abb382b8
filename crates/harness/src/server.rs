//! Editor server management - spawning and health checking
//!
//! The editor itself is an external collaborator: a server binary that hosts
//! the tiled editing surface. The harness only needs to spawn it (or attach
//! to one already running), wait until it answers health checks, and tear it
//! down afterwards.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Handle to a running editor server process
#[derive(Debug)]
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn the editor server and wait for it to become healthy.
    pub async fn spawn(config: ServerConfig) -> HarnessResult<Self> {
        let port = config.port.unwrap_or_else(find_free_port);
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("spawning editor server on port {}", port);

        let mut cmd = Command::new(&config.binary_path);
        cmd.env("SHEETCHECK_EDITOR_PORT", port.to_string())
            .env("SHEETCHECK_EDITOR_HOST", "127.0.0.1")
            .env("SHEETCHECK_EDITOR_DOC_ROOT", &config.doc_root);

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            HarnessError::ServerStartup(format!(
                "failed to spawn {}: {}",
                config.binary_path.display(),
                e
            ))
        })?;

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("editor server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Poll the health endpoint until it answers or the timeout elapses.
    async fn wait_for_healthy(&self, timeout: Duration) -> HarnessResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("waiting for editor server to start...");
                    }
                    // Connection refused is expected while it boots
                    if !e.is_connect() {
                        warn!("health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(HarnessError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server, SIGTERM first, then force kill.
    pub fn stop(&mut self) -> HarnessResult<()> {
        info!("stopping editor server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning an editor server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the editor server binary
    pub binary_path: PathBuf,

    /// Directory the server may serve documents from
    pub doc_root: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("target/debug/editor-server"),
            doc_root: std::env::temp_dir(),
            port: None,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

/// Find a free port to use
fn find_free_port() -> u16 {
    use std::net::TcpListener;

    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to find free port")
        .local_addr()
        .expect("Failed to get local addr")
        .port()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ports_are_unprivileged() {
        let port1 = find_free_port();
        let port2 = find_free_port();

        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn spawn_failure_is_a_startup_error() {
        let config = ServerConfig {
            binary_path: PathBuf::from("/nonexistent/editor-server"),
            ..Default::default()
        };
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt.block_on(ServerHandle::spawn(config)).unwrap_err();
        assert!(matches!(err, HarnessError::ServerStartup(_)));
    }
}
