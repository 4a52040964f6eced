use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::session::MAX_WINDOW_MS;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub capture: CaptureSection,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub startup_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSection {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: usize,
    #[serde(default = "default_downsample")]
    pub downsample: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            startup_timeout_secs: default_timeout_secs(),
            idle_timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            interval_ms: default_interval_ms(),
            report_every: default_report_every(),
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            device: None,
            channel: default_channel(),
            downsample: default_downsample(),
        }
    }
}

pub fn default_host() -> String { "0.0.0.0".into() }
pub fn default_port() -> u16 { 8200 }
pub fn default_timeout_secs() -> u64 { 120 }
pub fn default_queue_capacity() -> usize { 256 }
pub fn default_window_ms() -> u32 { 200 }
pub fn default_interval_ms() -> u64 { 10 }
pub fn default_report_every() -> u64 { 100 }
pub fn default_channel() -> usize { 1 }
pub fn default_downsample() -> usize { 1 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// Explicit path, else `./lanscope.toml`, else the per-user config file.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("lanscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("lanscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("lanscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Reject settings the pipeline cannot run with.
pub fn validate(
    window_ms: u32,
    interval_ms: u64,
    queue_capacity: usize,
    idle_timeout_secs: u64,
    channel: usize,
    downsample: usize,
) -> anyhow::Result<()> {
    if window_ms == 0 || window_ms > MAX_WINDOW_MS {
        anyhow::bail!("window must be between 1 and {} ms, got {}", MAX_WINDOW_MS, window_ms);
    }
    if interval_ms == 0 {
        anyhow::bail!("tick interval must be at least 1 ms");
    }
    if queue_capacity == 0 {
        anyhow::bail!("queue capacity must be at least 1 frame");
    }
    if idle_timeout_secs == 0 {
        anyhow::bail!("idle timeout must be at least 1 s");
    }
    if channel == 0 {
        anyhow::bail!("channels are numbered from 1");
    }
    if downsample == 0 {
        anyhow::bail!("downsample factor must be at least 1");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.network.host, "0.0.0.0");
        assert_eq!(cfg.network.port, 8200);
        assert_eq!(cfg.network.startup_timeout_secs, 120);
        assert_eq!(cfg.analysis.window_ms, 200);
        assert_eq!(cfg.analysis.interval_ms, 10);
        assert_eq!(cfg.capture.channel, 1);
        assert!(cfg.capture.device.is_none());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [network]
            port = 9000
            idle_timeout_secs = 5

            [analysis]
            window_ms = 500

            [capture]
            device = "USB Device"
            downsample = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.idle_timeout_secs, 5);
        assert_eq!(cfg.network.startup_timeout_secs, 120);
        assert_eq!(cfg.analysis.window_ms, 500);
        assert_eq!(cfg.analysis.report_every, 100);
        assert_eq!(cfg.capture.device.as_deref(), Some("USB Device"));
        assert_eq!(cfg.capture.downsample, 2);
    }

    #[test]
    fn missing_file_loads_nothing() {
        assert!(load_config(Path::new("/nonexistent/lanscope.toml")).is_none());
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(find_config(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn validation_bounds() {
        assert!(validate(200, 10, 256, 120, 1, 1).is_ok());
        assert!(validate(500, 1, 1, 1, 2, 4).is_ok());
        assert!(validate(0, 10, 256, 120, 1, 1).is_err());
        assert!(validate(640, 10, 256, 120, 1, 1).is_err());
        assert!(validate(200, 0, 256, 120, 1, 1).is_err());
        assert!(validate(200, 10, 0, 120, 1, 1).is_err());
        assert!(validate(200, 10, 256, 0, 1, 1).is_err());
        assert!(validate(200, 10, 256, 120, 0, 1).is_err());
        assert!(validate(200, 10, 256, 120, 1, 0).is_err());
    }
}
