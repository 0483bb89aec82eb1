//! Error handling for the heatmap CLI

use heatmap_core::HeatmapError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Heatmap error: {0}")]
    Heatmap(#[from] HeatmapError),
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn parse<S: Into<String>>(file: S, message: S) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::Parse { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Points are a JSON array of [lat, lng], [lat, lng, weight] or {\"lat\", \"lng\", \"weight\"}\n\
                 • A document of the form {\"data\": [...]} is also accepted",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your heatmap.toml configuration file\n\
                 • Use 'heatmap config --example' to generate a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        CliError::Heatmap(HeatmapError::InvalidConfig(_)) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Radius must be between 10 and 50 pixels\n\
                 • Opacity must be between 0 and 1\n\
                 • Gradient stops must be strictly increasing within [0, 1]",
            );
        }

        CliError::Heatmap(HeatmapError::InvalidInput { index, .. }) => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Inspect point {} of the input file\n\
                 • Latitude must lie in [-90, 90], longitude in [-180, 180], weight must be >= 0",
                index
            ));
        }

        CliError::Heatmap(HeatmapError::InvalidTile(key)) => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • At zoom {} tile coordinates run from 0 to {}\n\
                 • Use 'heatmap locate' to find the tile holding a coordinate",
                key.zoom,
                key.tiles_per_axis().saturating_sub(1)
            ));
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_core::TileKey;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("points.json"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));

        let err = CliError::from(HeatmapError::InvalidTile(TileKey::new(3, 9, 0)));
        assert!(format_error_with_suggestions(&err).contains("run from 0 to 7"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
