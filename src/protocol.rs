use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    Reload { directory: Option<String> },
    Next,
    Previous,
    Start,
    Stop,
    SetInterval { minutes: u64 },
    GetStatus,
    Shutdown,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    Success { message: String },
    Error { message: String },
    Status { status: StatusInfo },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusInfo {
    pub wallpaper_dir: String,
    pub wallpaper_count: usize,
    pub current_wallpaper: Option<String>,
    pub running: bool,
    pub interval_minutes: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let request = Request::SetInterval { minutes: 30 };
        let bytes = serde_json::to_vec(&request).unwrap();
        let parsed: Request = serde_json::from_slice(&bytes).unwrap();
        assert!(matches!(parsed, Request::SetInterval { minutes: 30 }));
    }

    #[test]
    fn test_status_response_roundtrip() {
        let response = Response::Status {
            status: StatusInfo {
                wallpaper_dir: "/home/me/Pictures".to_string(),
                wallpaper_count: 12,
                current_wallpaper: Some("/home/me/Pictures/a.png".to_string()),
                running: true,
                interval_minutes: 60,
                uptime_secs: 42,
            },
        };
        let bytes = serde_json::to_vec(&response).unwrap();
        let parsed: Response = serde_json::from_slice(&bytes).unwrap();
        match parsed {
            Response::Status { status } => {
                assert_eq!(status.wallpaper_count, 12);
                assert!(status.running);
            }
            _ => panic!("wrong variant"),
        }
    }
}
