//! Configuration file parsing and management.
//!
//! Settings are resolved in layers, lowest precedence first: built-in
//! defaults, discovered TOML files, `DS_*` environment variables, and
//! finally command-line flags (applied by the CLI). The result is a
//! [`Settings`] value from which the engine's [`ScanConfig`] is derived.

use crate::error::DomainSeekerError;
use crate::source::SourceMode;
use crate::types::{ScanConfig, TldSet};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Delays below this are accepted but likely to trip registry rate limits.
pub const LOW_DELAY_WARNING: Duration = Duration::from_millis(100);

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Query settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSection>,

    /// Where base names come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSection>,

    /// Results file, JSON output and paste upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSection>,

    /// Completion notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationSection>,
}

/// A delay written either as a number of seconds or as a string (`"500ms"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelayValue {
    Seconds(f64),
    Text(String),
}

impl DelayValue {
    pub fn to_duration(&self) -> Option<Duration> {
        match self {
            Self::Seconds(secs) => seconds_to_duration(*secs),
            Self::Text(text) => parse_delay_string(text),
        }
    }
}

impl fmt::Display for DelayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(secs) => write!(f, "{}", secs),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Per-request timeout (as string, e.g., "10s", "1m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Merge the IANA bootstrap registry into the built-in endpoint table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SourceMode>,

    /// Domain list path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Built-in generator name or `pattern:<p>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    /// TOML generator file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSection {
    /// Results file path; an empty string disables the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// HedgeDoc base URL for report upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paste_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<NotifyMethod>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Path to the sendmail binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sendmail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
}

/// How to announce a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMethod {
    #[default]
    None,
    Email,
    Telegram,
}

impl FromStr for NotifyMethod {
    type Err = DomainSeekerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "email" => Ok(Self::Email),
            "telegram" => Ok(Self::Telegram),
            other => Err(DomainSeekerError::config(format!(
                "unknown notification method '{}' (expected none, email or telegram)",
                other
            ))),
        }
    }
}

impl fmt::Display for NotifyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Email => write!(f, "email"),
            Self::Telegram => write!(f, "telegram"),
        }
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load and validate a single configuration file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainSeekerError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainSeekerError::config(format!(
                "configuration file '{}' not found",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainSeekerError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            DomainSeekerError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Files that fail to parse are reported and skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, DomainSeekerError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "Ignoring configuration file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "Loaded configuration file");
            }
        }

        Ok(merged_config)
    }

    /// `./domain-seeker.toml` in the working directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let path = Path::new("./domain-seeker.toml");
        path.exists().then(|| path.to_path_buf())
    }

    /// `~/.domain-seeker.toml`.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let path = Path::new(&home).join(".domain-seeker.toml");
        path.exists().then_some(path)
    }

    /// `$XDG_CONFIG_HOME/domain-seeker/config.toml`, falling back to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-seeker").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations field by field; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            scan: match (lower.scan, higher.scan) {
                (Some(lower), Some(higher)) => Some(ScanSection {
                    tlds: higher.tlds.or(lower.tlds),
                    delay: higher.delay.or(lower.delay),
                    max_retries: higher.max_retries.or(lower.max_retries),
                    timeout: higher.timeout.or(lower.timeout),
                    bootstrap: higher.bootstrap.or(lower.bootstrap),
                    user_agent: higher.user_agent.or(lower.user_agent),
                }),
                (lower, higher) => higher.or(lower),
            },
            source: match (lower.source, higher.source) {
                (Some(lower), Some(higher)) => Some(SourceSection {
                    mode: higher.mode.or(lower.mode),
                    file: higher.file.or(lower.file),
                    generator: higher.generator.or(lower.generator),
                    generator_file: higher.generator_file.or(lower.generator_file),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputSection {
                    results_file: higher.results_file.or(lower.results_file),
                    json: higher.json.or(lower.json),
                    paste_url: higher.paste_url.or(lower.paste_url),
                }),
                (lower, higher) => higher.or(lower),
            },
            notification: match (lower.notification, higher.notification) {
                (Some(lower), Some(higher)) => Some(NotificationSection {
                    method: higher.method.or(lower.method),
                    email: higher.email.or(lower.email),
                    sendmail: higher.sendmail.or(lower.sendmail),
                    telegram_token: higher.telegram_token.or(lower.telegram_token),
                    telegram_chat_id: higher.telegram_chat_id.or(lower.telegram_chat_id),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainSeekerError> {
        if let Some(scan) = &config.scan {
            if let Some(tlds) = &scan.tlds {
                TldSet::parse(tlds)?;
            }

            if let Some(delay) = &scan.delay {
                if delay.to_duration().is_none() {
                    return Err(DomainSeekerError::config(format!(
                        "Invalid delay '{}'. Use seconds like 1.5, or '1.5s', '500ms'",
                        delay
                    )));
                }
            }

            if let Some(timeout_str) = &scan.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(DomainSeekerError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        if let Some(notification) = &config.notification {
            validate_notification(
                notification.method.unwrap_or_default(),
                notification.email.as_deref(),
                notification.telegram_token.as_deref(),
                notification.telegram_chat_id.as_deref(),
            )?;
        }

        Ok(())
    }
}

fn validate_notification(
    method: NotifyMethod,
    email: Option<&str>,
    telegram_token: Option<&str>,
    telegram_chat_id: Option<&str>,
) -> Result<(), DomainSeekerError> {
    let missing = |value: Option<&str>| value.map_or(true, |v| v.trim().is_empty());

    match method {
        NotifyMethod::Email if missing(email) => Err(DomainSeekerError::config(
            "email notification needs a recipient address",
        )),
        NotifyMethod::Telegram if missing(telegram_token) || missing(telegram_chat_id) => {
            Err(DomainSeekerError::config(
                "telegram notification needs both telegram_token and telegram_chat_id",
            ))
        }
        _ => Ok(()),
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DS_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub tlds: Option<Vec<String>>,
    pub delay: Option<Duration>,
    pub max_retries: Option<u32>,
    pub source: Option<SourceMode>,
    pub domains_file: Option<String>,
    pub generator: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Parse `DS_*` values through a lookup function.
    ///
    /// Invalid values are logged as warnings and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        // DS_TLDS - comma-separated TLD list
        if let Some(tld_str) = lookup("DS_TLDS") {
            let tlds = split_list(&tld_str);
            match TldSet::parse(&tlds) {
                Ok(_) => env_config.tlds = Some(tlds),
                Err(err) => warn!(value = %tld_str, error = %err, "Ignoring invalid DS_TLDS"),
            }
        }

        // DS_DELAY - seconds between query starts
        if let Some(val) = lookup("DS_DELAY") {
            match parse_delay_string(&val) {
                Some(delay) => env_config.delay = Some(delay),
                None => warn!(value = %val, "Ignoring invalid DS_DELAY, use e.g. 1.5 or 500ms"),
            }
        }

        // DS_MAX_RETRIES
        if let Some(val) = lookup("DS_MAX_RETRIES") {
            match val.trim().parse::<u32>() {
                Ok(retries) => env_config.max_retries = Some(retries),
                Err(_) => warn!(value = %val, "Ignoring invalid DS_MAX_RETRIES"),
            }
        }

        // DS_SOURCE - file, generator or auto
        if let Some(val) = lookup("DS_SOURCE") {
            match val.parse::<SourceMode>() {
                Ok(mode) => env_config.source = Some(mode),
                Err(err) => warn!(error = %err, "Ignoring invalid DS_SOURCE"),
            }
        }

        env_config.domains_file = lookup("DS_DOMAINS_FILE").filter(|v| !v.trim().is_empty());
        env_config.generator = lookup("DS_GENERATOR").filter(|v| !v.trim().is_empty());
        env_config.config = lookup("DS_CONFIG").filter(|v| !v.trim().is_empty());

        env_config
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Notification settings after all layers are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub method: NotifyMethod,
    pub email: Option<String>,
    pub sendmail: String,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            method: NotifyMethod::None,
            email: None,
            sendmail: "sendmail".to_string(),
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tlds: Vec<String>,
    pub delay: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub bootstrap: bool,
    pub user_agent: Option<String>,

    pub source_mode: SourceMode,
    pub domains_file: PathBuf,
    pub generator: Option<String>,
    pub generator_file: Option<PathBuf>,

    /// `None` disables the results file
    pub results_file: Option<PathBuf>,
    pub json: bool,
    pub paste_url: Option<String>,

    pub notification: NotificationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tlds: vec![".com".to_string(), ".org".to_string(), ".net".to_string()],
            delay: Duration::from_secs(1),
            max_retries: 2,
            timeout: Duration::from_secs(10),
            bootstrap: false,
            user_agent: None,
            source_mode: SourceMode::Auto,
            domains_file: PathBuf::from("domains.txt"),
            generator: None,
            generator_file: None,
            results_file: Some(PathBuf::from("results.txt")),
            json: false,
            paste_url: None,
            notification: NotificationSettings::default(),
        }
    }
}

impl Settings {
    /// Layer a (validated) file configuration over these settings.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(scan) = &file.scan {
            if let Some(tlds) = &scan.tlds {
                self.tlds = tlds.clone();
            }
            if let Some(delay) = scan.delay.as_ref().and_then(DelayValue::to_duration) {
                self.delay = delay;
            }
            if let Some(retries) = scan.max_retries {
                self.max_retries = retries;
            }
            if let Some(secs) = scan.timeout.as_deref().and_then(parse_timeout_string) {
                self.timeout = Duration::from_secs(secs);
            }
            if let Some(bootstrap) = scan.bootstrap {
                self.bootstrap = bootstrap;
            }
            if let Some(agent) = &scan.user_agent {
                self.user_agent = Some(agent.clone());
            }
        }

        if let Some(source) = &file.source {
            if let Some(mode) = source.mode {
                self.source_mode = mode;
            }
            if let Some(path) = &source.file {
                self.domains_file = PathBuf::from(path);
            }
            if let Some(generator) = &source.generator {
                self.generator = Some(generator.clone());
            }
            if let Some(path) = &source.generator_file {
                self.generator_file = Some(PathBuf::from(path));
            }
        }

        if let Some(output) = &file.output {
            if let Some(path) = &output.results_file {
                self.results_file = (!path.trim().is_empty()).then(|| PathBuf::from(path));
            }
            if let Some(json) = output.json {
                self.json = json;
            }
            if let Some(url) = &output.paste_url {
                self.paste_url = (!url.trim().is_empty()).then(|| url.clone());
            }
        }

        if let Some(notification) = &file.notification {
            let target = &mut self.notification;
            if let Some(method) = notification.method {
                target.method = method;
            }
            if let Some(email) = &notification.email {
                target.email = Some(email.clone());
            }
            if let Some(sendmail) = &notification.sendmail {
                target.sendmail = sendmail.clone();
            }
            if let Some(token) = &notification.telegram_token {
                target.telegram_token = Some(token.clone());
            }
            if let Some(chat_id) = &notification.telegram_chat_id {
                target.telegram_chat_id = Some(chat_id.clone());
            }
        }
    }

    /// Layer environment values over these settings.
    pub fn apply_env(&mut self, env_config: &EnvConfig) {
        if let Some(tlds) = &env_config.tlds {
            self.tlds = tlds.clone();
        }
        if let Some(delay) = env_config.delay {
            self.delay = delay;
        }
        if let Some(retries) = env_config.max_retries {
            self.max_retries = retries;
        }
        if let Some(mode) = env_config.source {
            self.source_mode = mode;
        }
        if let Some(path) = &env_config.domains_file {
            self.domains_file = PathBuf::from(path);
        }
        if let Some(generator) = &env_config.generator {
            self.generator = Some(generator.clone());
        }
    }

    /// Check cross-field requirements once every layer is applied.
    pub fn validate(&self) -> Result<(), DomainSeekerError> {
        TldSet::parse(&self.tlds)?;
        validate_notification(
            self.notification.method,
            self.notification.email.as_deref(),
            self.notification.telegram_token.as_deref(),
            self.notification.telegram_chat_id.as_deref(),
        )
    }

    /// Build the engine configuration.
    ///
    /// A delay under [`LOW_DELAY_WARNING`] is warned about but kept as given.
    pub fn scan_config(&self) -> Result<ScanConfig, DomainSeekerError> {
        let tlds = TldSet::parse(&self.tlds)?;

        if self.delay < LOW_DELAY_WARNING {
            warn!(
                delay = ?self.delay,
                "Delay below 0.1s, registries may start rate limiting"
            );
        }

        let mut config = ScanConfig::default()
            .with_tlds(tlds)
            .with_delay(self.delay)
            .with_max_retries(self.max_retries)
            .with_request_timeout(self.timeout);
        if let Some(agent) = &self.user_agent {
            config = config.with_user_agent(agent.clone());
        }
        Ok(config)
    }
}

/// Parse a delay like `1.5`, `1.5s` or `500ms`.
///
/// Negative and non-finite values are rejected.
pub fn parse_delay_string(delay_str: &str) -> Option<Duration> {
    let delay_str = delay_str.trim().to_lowercase();

    if let Some(ms) = delay_str.strip_suffix("ms") {
        let ms = ms.trim().parse::<f64>().ok()?;
        seconds_to_duration(ms / 1000.0)
    } else {
        let secs = delay_str.strip_suffix('s').unwrap_or(&delay_str);
        seconds_to_duration(secs.trim().parse::<f64>().ok()?)
    }
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    // Rejects negatives, NaN and values beyond Duration::MAX.
    Duration::try_from_secs_f64(secs).ok()
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
    .filter(|secs| *secs > 0)
}
