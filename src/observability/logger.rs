//! Structured logging for tern
//!
//! Per OBSERVABILITY.md §2:
//! - One event per line, as a flat JSON object
//! - `event` and `severity` lead; remaining fields sorted by key, so
//!   identical events produce identical bytes
//! - Synchronous and unbuffered
//! - Off by default; a logging failure never disturbs the data path
//!
//! Encoded records often travel over stdout, so every log line goes to
//! stderr. String escaping goes through `serde_json`, the same escaping
//! the JSON codec puts on the wire.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING: AtomicBool = AtomicBool::new(false);

/// Enable or disable log output process-wide. Off by default.
pub fn set_logging(enabled: bool) {
    LOGGING.store(enabled, Ordering::Relaxed);
}

/// True if log output is currently enabled
pub fn logging_enabled() -> bool {
    LOGGING.load(Ordering::Relaxed)
}

/// Log severity levels per OBSERVABILITY.md §2
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-record detail (stream open/close, record counts)
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable refusals
    Warn = 2,
    /// Decode failures and poisoned streams
    Error = 3,
}

impl Severity {
    /// Returns the label written into the `severity` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event emitter for the codec and stream drivers.
pub struct Logger;

impl Logger {
    /// Emit one event line. A no-op unless logging is enabled.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !logging_enabled() {
            return;
        }
        let line = render(severity, event, fields);
        let mut err = io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Render one event as a complete JSON line, terminator included.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut line = String::with_capacity(64 + 24 * fields.len());
    line.push_str("{\"event\":");
    push_json_str(&mut line, event);
    line.push_str(",\"severity\":");
    push_json_str(&mut line, severity.as_str());

    let mut rest: Vec<_> = fields.iter().collect();
    rest.sort_by_key(|field| field.0);
    for (key, value) in rest {
        line.push(',');
        push_json_str(&mut line, key);
        line.push(':');
        push_json_str(&mut line, value);
    }

    line.push_str("}\n");
    line
}

/// Quote one string through serde_json so log escaping matches the wire.
fn push_json_str(line: &mut String, s: &str) {
    // String serialization cannot fail; if it somehow does, the field is
    // dropped rather than the event malformed.
    if let Ok(quoted) = serde_json::to_string(s) {
        line.push_str(&quoted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_shape_is_exact() {
        let line = render(
            Severity::Trace,
            "RECORD_WRITTEN",
            &[("encoding", "text"), ("bytes", "42")],
        );
        assert_eq!(
            line,
            "{\"event\":\"RECORD_WRITTEN\",\"severity\":\"TRACE\",\
             \"bytes\":\"42\",\"encoding\":\"text\"}\n"
        );
    }

    #[test]
    fn test_field_order_ignores_call_order() {
        let a = render(Severity::Info, "E", &[("z", "1"), ("a", "2")]);
        let b = render(Severity::Info, "E", &[("a", "2"), ("z", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_lines_parse_as_json_with_event_leading() {
        let line = render(
            Severity::Error,
            "RECORD_DECODE_FAILED",
            &[("code", "TERN_DECODE_TRUNCATED")],
        );
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "RECORD_DECODE_FAILED");
        assert_eq!(value["severity"], "ERROR");
        assert_eq!(value["code"], "TERN_DECODE_TRUNCATED");
        assert!(line.starts_with("{\"event\":"));
        assert!(line.ends_with("}\n"));
    }

    #[test]
    fn test_escaping_is_serde_json_escaping() {
        let gnarly = "a \"b\"\n\\c\t\u{1}";
        let line = render(Severity::Warn, "E", &[("msg", gnarly)]);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["msg"], gnarly);
        // The embedded newline must stay escaped; only the terminator is raw.
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_severity_ranks_and_labels() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert_eq!(Severity::Trace.as_str(), "TRACE");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_logging_is_off_by_default() {
        assert!(!logging_enabled());
    }
}
