//! Structured logging for the signer core
//!
//! Every line goes to stderr as `[ts] LEVEL [module] message | k=v ...`.
//! Field values are redacted by field name before they are formatted:
//! - seed phrases, passwords, authentication proofs and secrets are hidden
//! - public keys, authors and addresses keep only a prefix and suffix
//! - hashes are shortened

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Field names whose values never reach the log
const SECRET_KEYS: &[&str] = &[
    "seed", "phrase", "mnemonic", "password", "pwd", "proof", "secret", "private", "kek",
];

/// Field names whose values are shown as `prefix...suffix`
const IDENTITY_KEYS: &[&str] = &["address", "author", "public", "signer"];

const HASH_KEYS: &[&str] = &["hash", "genesis", "chain"];

/// A single structured log line
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attach a field, redacting by key name
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let redacted = redact_for_key(key, &value.to_string());
        self.fields.push((key, redacted));
        self
    }

    /// Attach a field that is always fully hidden
    pub fn redacted_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, redact_value(&value.to_string())));
        self
    }

    /// Render the line without the timestamp
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let joined = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&joined);
        }
        line
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

fn key_matches(key: &str, list: &[&str]) -> bool {
    list.iter().any(|k| key.contains(k))
}

fn redact_for_key(key: &str, value: &str) -> String {
    let key = key.to_lowercase();
    if key_matches(&key, SECRET_KEYS) {
        redact_value(value)
    } else if key_matches(&key, IDENTITY_KEYS) {
        redact_identity(value)
    } else if key_matches(&key, HASH_KEYS) {
        shorten_hash(value)
    } else {
        value.to_string()
    }
}

/// Hide a value completely, keeping only its length
pub fn redact_value(value: &str) -> String {
    match value.len() {
        0 => "[EMPTY]".to_string(),
        1..=4 => "[REDACTED]".to_string(),
        n => format!("[REDACTED:{}chars]", n),
    }
}

/// Keep the first 6 (8 with `0x`) and last 4 characters of an address or key
pub fn redact_identity(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    if !trimmed.is_ascii() || trimmed.len() <= prefix_len + 7 {
        return redact_value(trimmed);
    }
    format!(
        "{}...{}",
        &trimmed[..prefix_len],
        &trimmed[trimmed.len() - 4..]
    )
}

fn shorten_hash(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() <= 20 || !trimmed.is_ascii() {
        return trimmed.to_string();
    }
    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    format!(
        "{}...{}",
        &trimmed[..prefix_len],
        &trimmed[trimmed.len() - 6..]
    )
}

#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}
