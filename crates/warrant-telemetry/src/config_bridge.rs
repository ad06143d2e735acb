//! Conversion from the `[logging]` config section.

use warrant_config::LoggingSection;

use crate::error::TelemetryResult;
use crate::logging::{LogConfig, LogFormat};

impl LogConfig {
    /// Build a log config from the loaded `[logging]` section.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TelemetryError::ConfigError`] if the format name is
    /// unknown or a directive does not parse.
    pub fn from_section(section: &LoggingSection) -> TelemetryResult<Self> {
        let format: LogFormat = section.format.parse()?;
        let mut config = Self::new(section.level.to_ascii_lowercase()).with_format(format);
        for directive in &section.directives {
            config = config.with_directive(directive.clone());
        }
        config.build_filter()?;
        Ok(config)
    }
}
