//! TOML parsing for variable files.
//!
//! Variable files are flat TOML tables keyed by variable name:
//!
//! ```toml
//! env = "prod"
//! containerPort = 8080
//!
//! [extraTags]
//! Team = "platform"
//! ```
//!
//! Parse failures carry the file path as `anyhow` context over a typed
//! [`SynthError::Toml`](crate::core::SynthError::Toml), so the CLI can still
//! show a TOML-specific suggestion.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::core::SynthError;
use crate::variables::{Overrides, ValueSource};

/// Parse a TOML configuration file into the specified type.
///
/// ```rust,no_run
/// use stacksynth::config::parse_config;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let table: toml::Table = parse_config(Path::new("prod.toml"))?;
/// println!("{} variables", table.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid TOML, or does not match
/// the structure of `T`.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .map_err(SynthError::from)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .map_err(SynthError::from)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Load a variable file into `overrides` with [`ValueSource::File`].
///
/// Later files override earlier ones for the same variable.
pub fn load_var_file(path: &Path, overrides: &mut Overrides) -> Result<()> {
    let table: toml::Table = parse_config(path)?;
    debug!("Loaded {} variables from {}", table.len(), path.display());

    for (name, value) in table {
        overrides.insert(name, value, ValueSource::File);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("test.toml");

        #[derive(serde::Deserialize)]
        struct TestConfig {
            env: String,
            port: i32,
        }

        std::fs::write(&config_path, "env = \"prod\"\nport = 8080\n").unwrap();

        let config: TestConfig = parse_config(&config_path).unwrap();
        assert_eq!(config.env, "prod");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_config_invalid_toml_is_typed() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("bad.toml");
        std::fs::write(&config_path, "env = \n").unwrap();

        let err = parse_config::<toml::Table>(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(matches!(err.downcast_ref::<SynthError>(), Some(SynthError::Toml(_))));
    }

    #[test]
    fn test_parse_config_missing_file() {
        let err = parse_config::<toml::Table>(Path::new("/nonexistent/vars.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_var_file_marks_source() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("vars.toml");
        std::fs::write(&path, "env = \"staging\"\ncontainerPort = 8080\n").unwrap();

        let mut overrides = Overrides::new();
        load_var_file(&path, &mut overrides).unwrap();

        assert_eq!(overrides.len(), 2);
        let env = overrides.get("env").unwrap();
        assert_eq!(env.value, toml::Value::String("staging".to_string()));
        assert_eq!(env.source, ValueSource::File);
    }
}
