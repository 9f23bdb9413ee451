use crate::config::Config;
use crate::notify;
use crate::protocol::{Request, Response, StatusInfo};
use crate::rotation::{ApplyOutcome, ControllerEvent, Direction, RotationController};
use crate::store::GsettingsStore;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A client request handed into the core loop, with a channel to carry the
/// response back to the connection task.
struct ClientCommand {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// The rotation daemon. One core event loop exclusively owns the controller;
/// connection handlers and the timer reach it only through the command and
/// tick queues, so every apply runs serialized on this loop.
pub struct Server {
    controller: RotationController<GsettingsStore>,
    start_time: Instant,
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    tick_rx: mpsc::UnboundedReceiver<()>,
}

impl Server {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        tokio::spawn(forward_events(event_rx));

        let controller = RotationController::new(
            config,
            config_path,
            GsettingsStore::new(),
            event_tx,
            tick_tx,
        );

        Self {
            controller,
            start_time: Instant::now(),
            cmd_tx,
            cmd_rx,
            tick_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let listener = Self::bind_socket()?;

        if let Err(e) = self.controller.reload(None).await {
            warn!("Initial wallpaper load failed: {}", e);
        }

        info!("Server ready to accept connections");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Client connected: {:?}", addr);
                            let cmd_tx = self.cmd_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, cmd_tx).await {
                                    error!("Client handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                Some(command) = self.cmd_rx.recv() => {
                    let shutdown = matches!(command.request, Request::Shutdown);
                    let response = self.handle_request(command.request).await;
                    let _ = command.reply.send(response);
                    if shutdown {
                        info!("Shutdown requested");
                        break;
                    }
                }
                Some(()) = self.tick_rx.recv() => {
                    debug!("Rotation tick");
                    if let ApplyOutcome::Applied(path) = self.controller.apply_random().await {
                        let name = display_name(&path);
                        notify::send_success(&format!("Wallpaper: {}", name)).await.ok();
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("Shutting down server...");

        Ok(())
    }

    async fn handle_request(&mut self, request: Request) -> Response {
        info!("Processing request: {:?}", request);

        match request {
            Request::Reload { directory } => {
                let directory = directory
                    .map(|d| PathBuf::from(shellexpand::tilde(&d).into_owned()));

                match self.controller.reload(directory).await {
                    Ok(count) => Response::Success {
                        message: format!("Loaded {} wallpapers", count),
                    },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                }
            }

            Request::Next => self.navigate(Direction::Next).await,
            Request::Previous => self.navigate(Direction::Previous).await,

            Request::Start => match self.controller.start() {
                Ok(()) => {
                    let minutes = self.controller.interval_minutes();
                    notify::send("Rotation started", &format!("every {} minutes", minutes))
                        .await
                        .ok();
                    Response::Success {
                        message: format!("Rotating every {} minutes", minutes),
                    }
                }
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },

            Request::Stop => {
                self.controller.stop();
                Response::Success {
                    message: "Automatic rotation stopped".to_string(),
                }
            }

            Request::SetInterval { minutes } => {
                let clamped = self.controller.set_interval(minutes);
                Response::Success {
                    message: format!("Interval set to {} minutes", clamped),
                }
            }

            Request::GetStatus => {
                let status = StatusInfo {
                    wallpaper_dir: self.controller.wallpaper_dir().display().to_string(),
                    wallpaper_count: self.controller.wallpaper_count(),
                    current_wallpaper: self
                        .controller
                        .current()
                        .map(|p| p.display().to_string()),
                    running: self.controller.is_running(),
                    interval_minutes: self.controller.interval_minutes(),
                    uptime_secs: self.start_time.elapsed().as_secs(),
                };
                Response::Status { status }
            }

            Request::Shutdown => Response::Success {
                message: "Daemon shutting down".to_string(),
            },
        }
    }

    async fn navigate(&mut self, direction: Direction) -> Response {
        match self.controller.advance(direction).await {
            ApplyOutcome::Applied(path) => {
                let name = display_name(&path);
                notify::send_success(&format!("Wallpaper: {}", name)).await.ok();
                Response::Success {
                    message: format!("Switched to wallpaper: {}", name),
                }
            }
            ApplyOutcome::RateLimited => Response::Success {
                message: "Waiting before next wallpaper change".to_string(),
            },
            ApplyOutcome::Skipped => Response::Error {
                message: "No wallpapers loaded".to_string(),
            },
            ApplyOutcome::Failed(e) => {
                notify::send_error(&e.to_string()).await.ok();
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    fn bind_socket() -> Result<UnixListener> {
        let socket_path = Self::socket_path();

        if socket_path.exists() {
            // Try connect: success => someone owns it; failure => likely stale file
            match std::os::unix::net::UnixStream::connect(&socket_path) {
                Ok(_) => {
                    anyhow::bail!(
                        "Socket already exists at {:?}. Is another daemon running?",
                        socket_path
                    );
                }
                Err(_) => {
                    warn!("Stale socket detected at {:?}, removing...", socket_path);
                    std::fs::remove_file(&socket_path).with_context(|| {
                        format!("Failed to remove stale socket: {:?}", socket_path)
                    })?;
                }
            }
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket at {:?}", socket_path))?;

        info!("Socket server listening at {:?}", socket_path);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&socket_path, perms)?;
        }

        Ok(listener)
    }

    pub fn socket_path() -> PathBuf {
        let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
            .unwrap_or_else(|_| format!("/run/user/{}", users::get_current_uid()));

        PathBuf::from(runtime_dir).join("wallpaper-rotator.sock")
    }
}

async fn handle_client(
    mut stream: UnixStream,
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
) -> Result<()> {
    let mut buffer = vec![0u8; 8192];

    let n = match stream.read(&mut buffer).await {
        Ok(0) => {
            debug!("Client disconnected (EOF)");
            return Ok(());
        }
        Ok(n) => n,
        Err(e) => {
            error!("Read error: {}", e);
            return Err(e.into());
        }
    };

    let request: Request =
        serde_json::from_slice(&buffer[..n]).context("Failed to parse request JSON")?;

    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(ClientCommand {
            request,
            reply: reply_tx,
        })
        .map_err(|_| anyhow::anyhow!("Core loop is gone"))?;

    let response = reply_rx.await.context("Core loop dropped the request")?;

    debug!("Sending response: {:?}", response);

    let response_bytes = serde_json::to_vec(&response).context("Failed to serialize response")?;

    stream
        .write_all(&response_bytes)
        .await
        .context("Failed to write response")?;

    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Drains controller notifications into the log. Status lines double as the
/// human-readable record of every failure and rate-limit wait.
async fn forward_events(mut events: mpsc::UnboundedReceiver<ControllerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ControllerEvent::Status(message) => info!("{}", message),
            ControllerEvent::Preview(Some(path)) => debug!("Preview: {}", path.display()),
            ControllerEvent::Preview(None) => debug!("Preview cleared"),
            ControllerEvent::ListLoaded(count) => debug!("List loaded: {} wallpapers", count),
        }
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_server_creation() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            wallpaper_dir: dir.path().to_path_buf(),
            interval_minutes: 60,
        };
        let server = Server::new(config, Some(dir.path().join("config.toml")));
        assert!(!server.controller.is_running());
    }

    #[tokio::test]
    async fn test_socket_path() {
        let path = Server::socket_path();
        assert!(path.ends_with("wallpaper-rotator.sock"));
    }

    #[tokio::test]
    async fn test_status_request() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"img").unwrap();

        let config = Config {
            wallpaper_dir: dir.path().to_path_buf(),
            interval_minutes: 30,
        };
        let mut server = Server::new(config, Some(dir.path().join("config.toml")));
        server.controller.reload(None).await.unwrap();

        let response = server.handle_request(Request::GetStatus).await;
        match response {
            Response::Status { status } => {
                assert_eq!(status.wallpaper_count, 1);
                assert_eq!(status.interval_minutes, 30);
                assert!(!status.running);
            }
            _ => panic!("wrong variant"),
        }
    }
}
