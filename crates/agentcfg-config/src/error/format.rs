//! Error formatting with colors and context

use crate::error::ConfigError;
use std::fmt;
use yansi::Paint;

/// Formats a `ConfigError` for terminal output
pub struct ErrorFormatter {
    error: ConfigError,
    use_colors: bool,
}

impl ErrorFormatter {
    /// Create a new error formatter, coloring only when stderr is a terminal
    pub fn new(error: ConfigError) -> Self {
        Self {
            error,
            use_colors: supports_color(),
        }
    }

    /// Create a formatter that never emits color codes
    pub fn plain(error: ConfigError) -> Self {
        Self {
            error,
            use_colors: false,
        }
    }

    pub fn format(&self) -> String {
        if self.use_colors {
            self.format_colored()
        } else {
            self.format_plain()
        }
    }

    fn format_colored(&self) -> String {
        match &self.error {
            ConfigError::InvalidEnum {
                field,
                value,
                options,
                hint,
            } => {
                let value_str = format!("'{}'", value);
                format!(
                    "{} Invalid value {} for {}\n  {}: {}\n  {}: {}",
                    "✗".red().bold(),
                    value_str.yellow(),
                    field.cyan(),
                    "Valid options".bold(),
                    options,
                    "Hint".bold(),
                    hint.green()
                )
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => format!(
                "{} {} must be between {} and {}, got {}",
                "✗".red().bold(),
                field.cyan(),
                min.green(),
                max.green(),
                value.red()
            ),
            ConfigError::ValidationError { field, message } => {
                format!("{} {}: {}", "✗".red().bold(), field.cyan(), message)
            }
            ConfigError::FileNotFound { path } => {
                let path_str = path.display().to_string();
                format!(
                    "{} Configuration file not found: {}",
                    "✗".red().bold(),
                    path_str.yellow()
                )
            }
            _ => self.format_plain(),
        }
    }

    fn format_plain(&self) -> String {
        self.error.to_string()
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    atty::is(atty::Stream::Stderr)
}

impl fmt::Display for ErrorFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_invalid_enum() {
        let error = ConfigError::invalid_enum(
            "validation.mode",
            "prod",
            &["development", "staging", "production"],
        );
        let output = ErrorFormatter::plain(error).format();
        assert!(output.contains("Invalid value"));
        assert!(output.contains("'prod'"));
    }

    #[test]
    fn test_plain_matches_display() {
        let error = ConfigError::validation("cache.history_limit", "must be > 0");
        let expected = error.to_string();
        assert_eq!(ErrorFormatter::plain(error).to_string(), expected);
    }

    #[test]
    fn test_supports_color() {
        let _ = supports_color();
    }
}
