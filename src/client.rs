use crate::protocol::{Request, Response};
use crate::server::Server;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub async fn connect() -> Result<Self> {
        let socket_path = Server::socket_path();

        let stream = UnixStream::connect(&socket_path).await.context(
            "Failed to connect to socket. Is the daemon running?\n\
             Try: wallpaper-rotator daemon",
        )?;

        Ok(Self { stream })
    }

    async fn send_request(&mut self, request: Request) -> Result<Response> {
        let request_bytes = serde_json::to_vec(&request)?;
        self.stream.write_all(&request_bytes).await?;
        self.stream.flush().await?;

        let mut buffer = vec![0u8; 8192];
        let n = self.stream.read(&mut buffer).await?;

        if n == 0 {
            anyhow::bail!("Server closed connection");
        }

        let response: Response = serde_json::from_slice(&buffer[..n])?;
        Ok(response)
    }

    async fn send_simple(&mut self, request: Request) -> Result<()> {
        match self.send_request(request).await? {
            Response::Success { message } => {
                println!("{}", message);
                Ok(())
            }
            Response::Error { message } => {
                anyhow::bail!("Error: {}", message)
            }
            _ => anyhow::bail!("Unexpected response"),
        }
    }

    pub async fn reload(&mut self, directory: Option<String>) -> Result<()> {
        self.send_simple(Request::Reload { directory }).await
    }

    pub async fn next(&mut self) -> Result<()> {
        self.send_simple(Request::Next).await
    }

    pub async fn previous(&mut self) -> Result<()> {
        self.send_simple(Request::Previous).await
    }

    pub async fn start(&mut self) -> Result<()> {
        self.send_simple(Request::Start).await
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.send_simple(Request::Stop).await
    }

    pub async fn set_interval(&mut self, minutes: u64) -> Result<()> {
        self.send_simple(Request::SetInterval { minutes }).await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.send_simple(Request::Shutdown).await
    }

    pub async fn get_status(&mut self, json: bool) -> Result<()> {
        match self.send_request(Request::GetStatus).await? {
            Response::Status { status } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    println!("\nStatus:");
                    println!("{}", "─".repeat(50));
                    println!("Folder:     {}", status.wallpaper_dir);
                    println!("Wallpapers: {}", status.wallpaper_count);
                    println!(
                        "Current:    {}",
                        status
                            .current_wallpaper
                            .as_ref()
                            .and_then(|p| std::path::Path::new(p).file_name())
                            .and_then(|n| n.to_str())
                            .unwrap_or("None")
                    );
                    println!(
                        "Rotation:   {}",
                        if status.running { "Running" } else { "Stopped" }
                    );
                    println!("Interval:   {} minutes", status.interval_minutes);
                    println!("Uptime:     {}s", status.uptime_secs);
                    println!();
                }
                Ok(())
            }
            Response::Error { message } => {
                anyhow::bail!("Error: {}", message)
            }
            _ => anyhow::bail!("Unexpected response"),
        }
    }
}
