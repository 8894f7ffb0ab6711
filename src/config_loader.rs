use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse configuration from a YAML file, or use defaults when no
/// file is given
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = match config_path {
        Some(path) => {
            let file = File::open(path)
                .wrap_err_with(|| format!("Failed to open configuration file '{}'", path.display()))?;
            let config: Config = serde_yaml::from_reader(file)
                .wrap_err_with(|| format!("Failed to parse configuration file '{}'", path.display()))?;
            config
        }
        None => Config::default(),
    };

    config.validate()?;
    Ok(config)
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub capture_dir: Option<PathBuf>,
    pub no_interactive: bool,
}

/// Apply CLI overrides to a loaded configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(dir) = &overrides.capture_dir {
        config.general.capture_dir = dir.clone();
    }

    if overrides.no_interactive {
        config.general.interactive = false;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "general:\n  capture_dir: /tmp/loopsim-captures\nharness:\n  inter_trial_interval: 5s\n"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.general.capture_dir, PathBuf::from("/tmp/loopsim-captures"));
        assert_eq!(config.harness.inter_trial_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_load_defaults_without_file() {
        let config = load_config(None).unwrap();
        assert_eq!(config.harness.attempts, 3);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "harness:\n  attempts: 0\n").unwrap();
        assert!(load_config(Some(file.path())).is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "harness: [not, a, map]\n").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            capture_dir: Some(PathBuf::from("out")),
            no_interactive: true,
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.general.capture_dir, PathBuf::from("out"));
        assert!(!config.general.interactive);
    }
}
