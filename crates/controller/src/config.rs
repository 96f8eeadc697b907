// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the kiosk controller daemon.
#[derive(Debug, Clone, clap::Parser)]
pub struct ControllerConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "FT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000, env = "FT_PORT")]
    pub port: u16,

    /// Base data directory holding experiences and grouping files.
    #[arg(long, env = "FT_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Base config directory.
    #[arg(long, env = "FT_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Messaging base URL injected into docker and web experiences.
    #[arg(long, default_value = "ws://localhost:8000/messaging", env = "FT_MSG_URL")]
    pub messaging_url: String,

    /// Error reporting token. Accepted for compatibility; reporting is
    /// done through structured logs.
    #[arg(long, env = "FT_ROLLBAR")]
    pub error_report_token: Option<String>,

    /// Run the GPU stability probe and reboot the host when it degrades.
    #[arg(long, env = "FT_CHECK_STABILITY")]
    pub check_stability: bool,

    /// Disable the window-manager client.
    #[arg(long, env = "FT_DISABLE_WM")]
    pub disable_wm: bool,

    /// Disable the placard client.
    #[arg(long, env = "FT_DISABLE_PLACARD")]
    pub disable_placard: bool,

    /// Capture-service base URL.
    #[arg(long, default_value = "http://localhost:8010", env = "FT_CAPTURE_API_URL")]
    pub capture_api_url: String,

    /// Base URL presented on the placard QR code; the rotating access code is
    /// appended as the final path segment.
    #[arg(long, default_value = "http://localhost:3000/c", env = "FT_ACCESS_URL")]
    pub access_url: String,

    /// Window-manager socket address.
    #[arg(long, default_value = "127.0.0.1:5557", env = "FT_WM_ADDR")]
    pub wm_addr: String,

    /// Command producing a PNG screenshot of the display on stdout.
    #[arg(
        long,
        default_value = "import -silent -window root png:-",
        env = "FT_SCREENSHOT_CMD"
    )]
    pub screenshot_cmd: String,

    /// Command run for the GPU stability probe; non-zero exit means unstable.
    #[arg(long, default_value = "kiosk-gpu-probe", env = "FT_GPU_PROBE_CMD")]
    pub gpu_probe_cmd: String,

    /// Command spawned alongside capture experiences.
    #[arg(long, default_value = "kiosk-capture-shell", env = "FT_CAPTURE_SHELL_CMD")]
    pub capture_shell_cmd: String,

    /// Command extracting color palettes from a thumbnail, printing JSON on
    /// stdout.
    #[arg(long, default_value = "kiosk-palette", env = "FT_PALETTE_CMD")]
    pub palette_cmd: String,

    /// Loading-screen overlay binary.
    #[arg(long, default_value = "kiosk-loader", env = "FT_LOADER_CMD")]
    pub loader_cmd: String,

    /// Kiosk browser binary for web and video experiences.
    #[arg(long, default_value = "google-chrome", env = "FT_BROWSER_CMD")]
    pub browser_cmd: String,

    /// Delay before the boot-time empty transition clears the placard.
    #[arg(long, default_value_t = 5, env = "FT_INITIAL_EMPTY_DELAY_S")]
    pub initial_empty_delay_s: u64,

    /// Seconds without reported capture processes before a capture
    /// environment is considered failed.
    #[arg(long, default_value_t = 30, env = "FT_CAPTURE_FAILED_TIMEOUT_S")]
    pub capture_failed_timeout_s: u64,

    /// Stability loop interval in seconds.
    #[arg(long, default_value_t = 15, env = "FT_STABILITY_INTERVAL_S")]
    pub stability_interval_s: u64,
}

impl ControllerConfig {
    /// Data directory, defaulting to `$XDG_DATA_HOME/kiosk`.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_path {
            Some(path) => path.clone(),
            None => xdg_home("XDG_DATA_HOME", ".local/share").join("kiosk"),
        }
    }

    /// Config directory, defaulting to `$XDG_CONFIG_HOME/kiosk`.
    pub fn config_dir(&self) -> PathBuf {
        match &self.config_path {
            Some(path) => path.clone(),
            None => xdg_home("XDG_CONFIG_HOME", ".config").join("kiosk"),
        }
    }

    /// Directory of per-experience config directories.
    pub fn experiences_dir(&self) -> PathBuf {
        self.data_dir().join("experiences")
    }

    pub fn initial_empty_delay(&self) -> Duration {
        Duration::from_secs(self.initial_empty_delay_s)
    }

    pub fn stability_interval(&self) -> Duration {
        Duration::from_secs(self.stability_interval_s)
    }

    /// Messaging URL handed to an experience's app socket.
    pub fn app_messaging_url(&self, id: &str) -> String {
        format!("{}/out/{id}", self.messaging_url.trim_end_matches('/'))
    }
}

fn xdg_home(var: &str, fallback: &str) -> PathBuf {
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var_os("HOME").unwrap_or_default();
            PathBuf::from(home).join(fallback)
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
