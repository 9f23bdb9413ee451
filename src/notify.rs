use anyhow::Result;
use tokio::process::Command;
use tracing::warn;

#[derive(Copy, Clone)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

fn urgency_for(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Info | NotificationKind::Success => "normal",
        NotificationKind::Error => "critical",
    }
}

fn duration_for(kind: NotificationKind) -> u32 {
    match kind {
        NotificationKind::Info => 5000,
        NotificationKind::Success => 3000,
        NotificationKind::Error => 8000,
    }
}

pub async fn send(title: &str, message: &str) -> Result<()> {
    let text = format!("{}: {}", title, message);
    send_with_kind(NotificationKind::Info, &text).await
}

pub async fn send_error(message: &str) -> Result<()> {
    send_with_kind(NotificationKind::Error, message).await
}

pub async fn send_success(message: &str) -> Result<()> {
    send_with_kind(NotificationKind::Success, message).await
}

async fn send_with_kind(kind: NotificationKind, message: &str) -> Result<()> {
    let result = Command::new("notify-send")
        .args([
            "--app-name",
            "wallpaper-rotator",
            "--urgency",
            urgency_for(kind),
            "--expire-time",
            &duration_for(kind).to_string(),
            "Wallpaper Rotator",
            message,
        ])
        .status()
        .await;

    if let Err(e) = result {
        warn!("Failed to send notification: {}", e);
    }
    Ok(())
}
