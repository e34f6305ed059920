//! Debug infrastructure with per-module loggers.
//!
//! Control via DEBUG environment variable:
//! - `DEBUG=*` - Enable all loggers
//! - `DEBUG=memo` - Enable only the memoization logger
//! - `DEBUG=parse,leftrec` - Enable multiple
//! - `DEBUG=leftrec:3` - Enable one logger with its own verbosity
//!
//! Default verbosity via DEBUG_VERBOSITY (0-3, default 1). Levels:
//! 1 = milestones, 2 = details, 3 = per-unit tracing.

use std::cell::Cell;
use std::env;
use std::sync::OnceLock;

use hashbrown::HashMap;

// ============================================================================
// Configuration
// ============================================================================

enum EnabledConfig {
    All,
    None,
    /// Logger name to its verbosity override.
    Some(HashMap<String, Option<u8>>),
}

struct GlobalConfig {
    enabled: EnabledConfig,
    verbosity: u8,
}

static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

fn parse_verbosity(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok().map(|v| v.min(3))
}

fn parse_enabled(value: Option<&str>) -> EnabledConfig {
    match value {
        None | Some("") => EnabledConfig::None,
        Some("*") | Some("1") | Some("true") => EnabledConfig::All,
        Some(value) => {
            let names: HashMap<_, _> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|entry| match entry.split_once(':') {
                    Some((name, level)) => (name.trim().to_string(), parse_verbosity(level)),
                    None => (entry.to_string(), None),
                })
                .collect();
            if names.is_empty() { EnabledConfig::None } else { EnabledConfig::Some(names) }
        }
    }
}

fn get_config() -> &'static GlobalConfig {
    CONFIG.get_or_init(|| {
        let enabled = parse_enabled(env::var("DEBUG").ok().as_deref());
        let verbosity = env::var("DEBUG_VERBOSITY")
            .ok()
            .and_then(|v| parse_verbosity(&v))
            .unwrap_or(1);
        GlobalConfig { enabled, verbosity }
    })
}

/// Verbosity for `name`, or `None` when the logger is off.
fn lookup(config: &GlobalConfig, name: &str) -> Option<u8> {
    match &config.enabled {
        EnabledConfig::None => None,
        EnabledConfig::All => Some(config.verbosity),
        EnabledConfig::Some(names) => names.get(name).map(|level| level.unwrap_or(config.verbosity)),
    }
}

// ============================================================================
// Logger
// ============================================================================

/// A named logger writing to stderr.
///
/// Loggers are cheap to create and are owned by whatever drives the work
/// (one per parse invocation), so indentation is a plain `Cell`.
pub struct Logger {
    name: &'static str,
    verbosity: u8,
    enabled: bool,
    indent: Cell<usize>,
}

impl Logger {
    pub const fn disabled() -> Self {
        Self { name: "", verbosity: 0, enabled: false, indent: Cell::new(0) }
    }

    fn active(name: &'static str, verbosity: u8) -> Self {
        Self { name, verbosity, enabled: true, indent: Cell::new(0) }
    }

    /// A logger that is on regardless of `DEBUG`, used when a caller asks
    /// for tracing explicitly.
    pub fn forced(name: &'static str, verbosity: u8) -> Self {
        Self::active(name, verbosity.min(3))
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn emit(&self, level: u8, tag: &str, msg: &str) {
        if self.enabled && self.verbosity >= level {
            let pad = "  ".repeat(self.indent.get());
            eprintln!("{}[{}] {}{}", pad, self.name, tag, msg);
        }
    }

    #[inline]
    pub fn log(&self, msg: &str) {
        self.emit(1, "", msg);
    }

    #[inline]
    pub fn detail(&self, msg: &str) {
        self.emit(2, "", msg);
    }

    #[inline]
    pub fn trace(&self, msg: &str) {
        self.emit(3, "", msg);
    }

    #[inline]
    pub fn success(&self, msg: &str) {
        self.emit(1, "OK: ", msg);
    }

    #[inline]
    pub fn fail(&self, msg: &str) {
        self.emit(1, "FAIL: ", msg);
    }

    #[inline]
    pub fn push_indent(&self) {
        if self.enabled {
            self.indent.set(self.indent.get() + 1);
        }
    }

    #[inline]
    pub fn pop_indent(&self) {
        if self.enabled {
            self.indent.set(self.indent.get().saturating_sub(1));
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create a logger. The name must be a static string.
pub fn create_logger(name: &'static str) -> Logger {
    match lookup(get_config(), name) {
        Some(verbosity) => Logger::active(name, verbosity),
        None => Logger::disabled(),
    }
}

// ============================================================================
// Macros - avoid format! cost when disabled
// ============================================================================

#[macro_export]
macro_rules! log {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.log(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_detail {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() && $logger.verbosity() >= 2 {
            $logger.detail(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() && $logger.verbosity() >= 3 {
            $logger.trace(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_success {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.success(&format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_fail {
    ($logger:expr, $($arg:tt)*) => {
        if $logger.enabled() {
            $logger.fail(&format!($($arg)*));
        }
    };
}
