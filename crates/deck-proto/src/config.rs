use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub captions: CaptionsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Rate the decoder resamples every stream to.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Analyser transform size; a power of two in 32..=32768.
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Analyser time smoothing, 0..=1.
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// One of bars, wave, scope, orb, particles.
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    #[serde(default = "default_captions_enabled")]
    pub enabled: bool,
    /// Name of the environment variable holding the text-generation key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// User-configurable locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where the key-value store and the log file live.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Optional TOML file replacing the built-in station catalog.
    #[serde(default = "default_stations_toml")]
    pub stations_toml: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            default_volume: default_volume(),
        }
    }
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            fps: default_fps(),
        }
    }
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_captions_enabled(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            stations_toml: default_stations_toml(),
        }
    }
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_fft_size() -> usize {
    512
}

fn default_smoothing() -> f32 {
    0.85
}

fn default_volume() -> f32 {
    0.8
}

fn default_mode() -> String {
    "wave".to_string()
}

fn default_fps() -> u32 {
    30
}

fn default_captions_enabled() -> bool {
    true
}

fn default_api_key_env() -> String {
    "VIBE_API_KEY".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_data_dir() -> PathBuf {
    platform::data_dir()
}

fn default_stations_toml() -> PathBuf {
    // On Windows, check for portable stations.toml in executable directory
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_stations = exe_dir.join("stations.toml");
                if portable_stations.exists() {
                    return portable_stations;
                }
            }
        }
    }

    platform::config_dir().join("stations.toml")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &std::path::Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            visualizer: VisualizerConfig::default(),
            captions: CaptionsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}
