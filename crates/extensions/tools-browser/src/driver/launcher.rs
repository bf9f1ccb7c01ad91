//! Chrome discovery and launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use webpilot_protocols::BrowserError;

use super::DriverConfig;

const STARTUP_POLL: Duration = Duration::from_millis(200);
const STARTUP_ATTEMPTS: u32 = 30;

/// Find a Chrome or Chromium executable in the usual install locations.
pub fn find_chrome() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let paths: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    ];

    #[cfg(target_os = "linux")]
    let paths: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    #[cfg(target_os = "windows")]
    let paths: &[&str] = &[
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let paths: &[&str] = &[];

    paths.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Whether something answers CDP discovery on `endpoint`.
pub async fn is_chrome_running(endpoint: &str) -> bool {
    reqwest::get(format!("{}/json/version", endpoint))
        .await
        .is_ok()
}

/// Command-line arguments for a debuggable Chrome instance.
pub fn chrome_args(config: &DriverConfig, profile_dir: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", config.debug_port),
        format!("--user-data-dir={}", profile_dir.display()),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// Launch Chrome and wait until its debugging endpoint answers.
pub async fn launch_chrome(config: &DriverConfig) -> Result<Child, BrowserError> {
    let chrome_path = match &config.chrome_path {
        Some(path) => path.clone(),
        None => find_chrome().ok_or_else(|| {
            BrowserError::ConnectionFailed("Chrome not found. Please install Google Chrome.".to_string())
        })?,
    };

    if let Err(e) = std::fs::create_dir_all(&config.user_data_dir) {
        warn!("Failed to create profile directory: {}", e);
    }

    info!("Launching Chrome with profile at: {}", config.user_data_dir.display());

    let child = Command::new(&chrome_path)
        .args(chrome_args(config, &config.user_data_dir))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| BrowserError::ConnectionFailed(format!("Failed to launch Chrome: {}", e)))?;

    info!("Chrome launched with PID: {:?}", child.id());

    let endpoint = config.endpoint();
    for _ in 0..STARTUP_ATTEMPTS {
        tokio::time::sleep(STARTUP_POLL).await;
        if is_chrome_running(&endpoint).await {
            return Ok(child);
        }
    }

    Err(BrowserError::ConnectionFailed(
        "Chrome failed to start within timeout".to_string(),
    ))
}
