//! Clustering configuration files.

use std::fs;
use std::path::Path;

use clonetrack_core::ClusteringConfig;

use crate::Result;

/// Loads a [`ClusteringConfig`] from a JSON file.
///
/// Absent fields take their default values.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or holds
/// an invalid configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ClusteringConfig> {
    let text = fs::read_to_string(path)?;
    let config: ClusteringConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let file = config_file(r#"{ "max_speed_kmh": 90.0, "utc_offset_minutes": -180 }"#);
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config,
            ClusteringConfig::new()
                .with_max_speed_kmh(90.0)
                .with_utc_offset_minutes(-180)
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = config_file(r#"{ "max_speed_kmh": 0.0 }"#);
        assert!(matches!(load_config(file.path()), Err(Error::CoreError(_))));
    }

    #[test]
    fn test_malformed_json() {
        let file = config_file("{ max_speed_kmh: ");
        assert!(matches!(load_config(file.path()), Err(Error::Json(_))));
    }
}
