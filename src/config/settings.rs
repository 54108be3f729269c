use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use quotawatch_core::capture::{default_capture_script, CaptureConfig, DEFAULT_CAPTURE_INTERVAL_SECS};
use quotawatch_core::monitor::{MonitorConfig, MIN_POLL_INTERVAL};
use quotawatch_core::screenshots::DEFAULT_PATTERN;
use quotawatch_core::status::default_quota_file;
use quotawatch_core::vision::{VisionConfig, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Claude quota screenshot parser and monitor"
)]
pub struct Config {
    /// Enable debug logging (includes the raw model response)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Parse one screenshot and print JSON
    Parse(ParseArgs),
    /// Watch screenshots and update ~/.claude/quota-data.json (cleans up screenshots)
    Monitor(MonitorArgs),
}

/// Vision model options shared by both subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Vision model
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama API host
    #[arg(long)]
    pub host: Option<String>,

    /// API key (required for non-local hosts)
    #[arg(long, env = "OLLAMA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for `parse`
#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Path to screenshot
    pub image: PathBuf,

    /// Write JSON to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Arguments for `monitor`
#[derive(Args, Debug, Clone, Default)]
pub struct MonitorArgs {
    /// Screenshot directory (default: current directory)
    #[arg(long)]
    pub watch_dir: Option<PathBuf>,

    /// Screenshot glob
    #[arg(long)]
    pub pattern: Option<String>,

    /// Polling interval in seconds
    #[arg(long)]
    pub poll_seconds: Option<f64>,

    /// Status line quota JSON path
    #[arg(long)]
    pub quota_file: Option<PathBuf>,

    /// Optional full parse JSON output file
    #[arg(long)]
    pub full_output: Option<PathBuf>,

    /// Process newest screenshot once and exit
    #[arg(long)]
    pub once: bool,

    /// Start the capture script automatically
    #[arg(long)]
    pub start_capture: bool,

    /// Path to capture PowerShell script
    #[arg(long)]
    pub capture_script: Option<PathBuf>,

    /// Capture interval in seconds
    #[arg(long)]
    pub capture_interval: Option<u64>,

    /// Log monitor activity
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if monitor activity should be logged
    pub fn is_verbose(&self) -> bool {
        matches!(&self.command, Command::Monitor(args) if args.verbose)
    }

    /// Model options of whichever subcommand was given
    fn model_args(&self) -> &ModelArgs {
        match &self.command {
            Command::Parse(args) => &args.model,
            Command::Monitor(args) => &args.model,
        }
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Vision model settings
    #[serde(default)]
    pub vision: VisionSettings,

    /// Monitor settings
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Capture process settings
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Vision model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Inference host URL
    #[serde(default = "default_host")]
    pub host: String,

    /// API key (prefer OLLAMA_API_KEY over storing it here)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            host: default_host(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Screenshot directory (None = current directory)
    #[serde(default)]
    pub watch_dir: Option<PathBuf>,

    /// Screenshot glob
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Polling interval in seconds
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: f64,

    /// Status line quota file (None = ~/.claude/quota-data.json)
    #[serde(default)]
    pub quota_file: Option<PathBuf>,

    /// Optional full parse output file
    #[serde(default)]
    pub full_output: Option<PathBuf>,

    /// Process newest screenshot once and exit
    #[serde(skip)]
    pub once: bool,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_poll_seconds() -> f64 {
    10.0
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            watch_dir: None,
            pattern: default_pattern(),
            poll_seconds: default_poll_seconds(),
            quota_file: None,
            full_output: None,
            once: false,
        }
    }
}

/// Capture process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Start the capture script with the monitor
    #[serde(default)]
    pub enabled: bool,

    /// Interpreter used to run the script
    #[serde(default = "default_capture_program")]
    pub program: String,

    /// Script path (None = next to the executable)
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Seconds between captures
    #[serde(default = "default_capture_interval")]
    pub interval_secs: u64,
}

fn default_capture_program() -> String {
    "powershell".to_string()
}

fn default_capture_interval() -> u64 {
    DEFAULT_CAPTURE_INTERVAL_SECS
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            program: default_capture_program(),
            script: None,
            interval_secs: default_capture_interval(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("quotawatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/quotawatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".quotawatch.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        let model = cli.model_args();
        if let Some(m) = &model.model {
            self.vision.model = m.clone();
        }
        if let Some(host) = &model.host {
            self.vision.host = host.clone();
        }
        if let Some(key) = &model.api_key {
            self.vision.api_key = Some(key.clone());
        }
        if let Some(timeout) = model.timeout {
            self.vision.timeout_secs = timeout;
        }

        if let Command::Monitor(args) = &cli.command {
            if let Some(dir) = &args.watch_dir {
                self.monitor.watch_dir = Some(dir.clone());
            }
            if let Some(pattern) = &args.pattern {
                self.monitor.pattern = pattern.clone();
            }
            if let Some(poll) = args.poll_seconds {
                self.monitor.poll_seconds = poll;
            }
            if let Some(file) = &args.quota_file {
                self.monitor.quota_file = Some(file.clone());
            }
            if let Some(file) = &args.full_output {
                self.monitor.full_output = Some(file.clone());
            }
            if let Some(script) = &args.capture_script {
                self.capture.script = Some(script.clone());
            }
            if let Some(interval) = args.capture_interval {
                self.capture.interval_secs = interval;
            }
            if args.start_capture {
                self.capture.enabled = true;
            }
            self.monitor.once = args.once;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Ensures the poll interval never drops below the monitor's floor and the
    /// request timeout is at least one second.
    pub fn validate(&mut self) {
        let min_poll = MIN_POLL_INTERVAL.as_secs_f64();
        if !self.monitor.poll_seconds.is_finite() || self.monitor.poll_seconds < min_poll {
            self.monitor.poll_seconds = min_poll;
        }
        if self.vision.timeout_secs == 0 {
            self.vision.timeout_secs = 1;
        }
        if self.capture.interval_secs == 0 {
            self.capture.interval_secs = 1;
        }
        if self.vision.api_key.as_deref() == Some("") {
            self.vision.api_key = None;
        }
    }

    /// Inference client configuration
    pub fn vision_config(&self) -> VisionConfig {
        VisionConfig {
            model: self.vision.model.clone(),
            host: self.vision.host.clone(),
            api_key: self.vision.api_key.clone(),
            timeout: Duration::from_secs(self.vision.timeout_secs),
        }
    }

    /// Monitor configuration with paths expanded
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let watch_dir = match &self.monitor.watch_dir {
            Some(dir) => expand_home(dir),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };

        let poll_seconds = self.monitor.poll_seconds;
        let poll_interval = Duration::try_from_secs_f64(poll_seconds)
            .with_context(|| format!("Invalid poll interval: {} seconds", poll_seconds))?;

        Ok(MonitorConfig {
            watch_dir,
            pattern: self.monitor.pattern.clone(),
            poll_interval,
            quota_file: self
                .monitor
                .quota_file
                .as_deref()
                .map(expand_home)
                .unwrap_or_else(default_quota_file),
            full_output: self.monitor.full_output.as_deref().map(expand_home),
            once: self.monitor.once,
        })
    }

    /// Capture process configuration writing into `output_dir`
    pub fn capture_config(&self, output_dir: &Path) -> CaptureConfig {
        CaptureConfig {
            program: self.capture.program.clone(),
            script: self
                .capture
                .script
                .as_deref()
                .map(expand_home)
                .unwrap_or_else(default_capture_script),
            interval_secs: self.capture.interval_secs,
            output_dir: output_dir.to_path_buf(),
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.vision.model, "qwen3-vl:235b-cloud");
        assert_eq!(settings.vision.host, "https://ollama.com");
        assert_eq!(settings.vision.timeout_secs, 120);
        assert_eq!(settings.monitor.pattern, "claude_usage_*.png");
        assert_eq!(settings.monitor.poll_seconds, 10.0);
        assert_eq!(settings.capture.interval_secs, 60);
        assert!(!settings.capture.enabled);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [vision]
            host = "http://localhost:11434"
            model = "llava"

            [monitor]
            poll_seconds = 2.5
            quota_file = "/tmp/q.json"
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.vision.host, "http://localhost:11434");
        assert_eq!(settings.vision.model, "llava");
        assert_eq!(settings.vision.timeout_secs, 120);
        assert_eq!(settings.monitor.poll_seconds, 2.5);
        assert_eq!(settings.monitor.quota_file, Some(PathBuf::from("/tmp/q.json")));
        assert_eq!(settings.monitor.pattern, "claude_usage_*.png");
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut settings = Settings::default();
        settings.monitor.poll_seconds = 0.01;
        settings.vision.timeout_secs = 0;
        settings.vision.api_key = Some(String::new());
        settings.validate();

        assert_eq!(settings.monitor.poll_seconds, 0.5);
        assert_eq!(settings.vision.timeout_secs, 1);
        assert!(settings.vision.api_key.is_none());
    }

    #[test]
    fn test_merge_cli_monitor() {
        temp_env::with_var_unset("OLLAMA_API_KEY", || {
            let cli = Config::try_parse_from([
                "quotawatch",
                "monitor",
                "--watch-dir",
                "/shots",
                "--poll-seconds",
                "3",
                "--once",
                "--host",
                "http://localhost:11434",
                "--start-capture",
            ])
            .unwrap();

            let mut settings = Settings::default();
            settings.merge_cli(&cli);

            assert_eq!(settings.monitor.watch_dir, Some(PathBuf::from("/shots")));
            assert_eq!(settings.monitor.poll_seconds, 3.0);
            assert!(settings.monitor.once);
            assert!(settings.capture.enabled);
            assert_eq!(settings.vision.host, "http://localhost:11434");
            assert!(settings.vision.api_key.is_none());
        });
    }

    #[test]
    fn test_api_key_from_environment() {
        temp_env::with_var("OLLAMA_API_KEY", Some("from-env"), || {
            let cli = Config::try_parse_from(["quotawatch", "parse", "shot.png"]).unwrap();
            let mut settings = Settings::default();
            settings.merge_cli(&cli);
            assert_eq!(settings.vision.api_key.as_deref(), Some("from-env"));
        });
    }

    #[test]
    fn test_parse_subcommand_args() {
        let cli = Config::try_parse_from([
            "quotawatch",
            "--debug",
            "parse",
            "shot.png",
            "-o",
            "out.json",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert!(cli.debug);
        assert!(!cli.is_verbose());
        match &cli.command {
            Command::Parse(args) => {
                assert_eq!(args.image, PathBuf::from("shot.png"));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert_eq!(args.model.timeout, Some(30));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_monitor_config_defaults() {
        let settings = Settings::default();
        let config = settings.monitor_config().unwrap();
        assert_eq!(config.watch_dir, std::env::current_dir().unwrap());
        assert!(config.quota_file.ends_with(".claude/quota-data.json"));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(config.full_output.is_none());
    }

    #[test]
    fn test_oversized_poll_interval_is_an_error() {
        let mut settings = Settings::default();
        settings.monitor.poll_seconds = 1e20;
        settings.validate();

        let err = settings.monitor_config().unwrap_err();
        assert!(err.to_string().contains("Invalid poll interval"));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home(Path::new("~/x.json")), home.join("x.json"));
        assert_eq!(expand_home(Path::new("/abs/x.json")), PathBuf::from("/abs/x.json"));
    }
}
