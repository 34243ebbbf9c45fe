//! Logging utilities for CLI output

/// Log level for CLI output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Suppress all output
    Quiet,
    /// Normal output level
    Normal,
    /// Verbose output with additional details
    Verbose,
}

impl LogLevel {
    /// Level selected by the global `--verbose` / `--quiet` flags; quiet wins
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

/// Whether a message at `required` is shown at `level`
fn enabled(level: LogLevel, required: LogLevel) -> bool {
    level != LogLevel::Quiet && (level == required || required == LogLevel::Normal)
}

/// Log a message if the current level permits it
pub fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if enabled(level, required) {
        println!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(LogLevel::from_flags(false, false), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(true, false), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(true, true), LogLevel::Quiet);
    }

    #[test]
    fn test_enabled_matrix() {
        assert!(enabled(LogLevel::Normal, LogLevel::Normal));
        assert!(!enabled(LogLevel::Normal, LogLevel::Verbose));
        assert!(enabled(LogLevel::Verbose, LogLevel::Normal));
        assert!(enabled(LogLevel::Verbose, LogLevel::Verbose));
        assert!(!enabled(LogLevel::Quiet, LogLevel::Normal));
        assert!(!enabled(LogLevel::Quiet, LogLevel::Quiet));
    }
}
