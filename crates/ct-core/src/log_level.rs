//! `--log-level` parsing.
//!
//! Accepts mnemonic names (`DEBUG`, `info`, `WARNING`, ...) or the numeric
//! levels of the classic logging convention (10 = debug, 20 = info, ...).

use tracing::Level;

/// Parse a log level name or number into a [`tracing::Level`].
///
/// Usable directly as a clap `value_parser`.
pub fn parse_log_level(s: &str) -> Result<Level, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(match n {
            i64::MIN..=5 => Level::TRACE,
            6..=10 => Level::DEBUG,
            11..=20 => Level::INFO,
            21..=30 => Level::WARN,
            _ => Level::ERROR,
        });
    }
    match s.to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(Level::ERROR),
        _ => Err(format!("unknown log level '{s}' (expected a name like DEBUG or an integer)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_log_level("debug"), Ok(Level::DEBUG));
        assert_eq!(parse_log_level("Warning"), Ok(Level::WARN));
        assert_eq!(parse_log_level("CRITICAL"), Ok(Level::ERROR));
    }

    #[test]
    fn numbers_follow_logging_thresholds() {
        assert_eq!(parse_log_level("10"), Ok(Level::DEBUG));
        assert_eq!(parse_log_level("20"), Ok(Level::INFO));
        assert_eq!(parse_log_level("30"), Ok(Level::WARN));
        assert_eq!(parse_log_level("40"), Ok(Level::ERROR));
        assert_eq!(parse_log_level("1"), Ok(Level::TRACE));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_log_level("loud").is_err());
    }
}
