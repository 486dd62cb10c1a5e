use anyhow::Result;
use docsieve_core::SieveConfig;
use std::path::{Path, PathBuf};

/// `~/.config/docsieve/config.yaml` (platform equivalent), if it exists.
pub fn discover_config() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("docsieve").join("config.yaml");
    path.is_file().then_some(path)
}

/// Explicit path first, then the per-user file, then built-in defaults.
/// Returns the config and where it came from. A named file that cannot be
/// read or parsed is an error, never silently replaced by defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(SieveConfig, Option<PathBuf>)> {
    let path = explicit.map(Path::to_path_buf).or_else(discover_config);
    let config = SieveConfig::load(path.as_deref())?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "boundary:\n  max_offset: 3\n").unwrap();

        let (config, source) = resolve_config(Some(&path)).unwrap();
        assert_eq!(source.as_deref(), Some(path.as_path()));
        assert_eq!(config.boundary.max_offset, 3);
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        assert!(resolve_config(Some(Path::new("/nonexistent/docsieve.yaml"))).is_err());
    }

    #[test]
    fn test_malformed_rule_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "extraction:\n  rules:\n    - label: X\n      pattern:\n        - match: { lowr: \"a\" }\n",
        )
        .unwrap();

        let err = resolve_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }
}
