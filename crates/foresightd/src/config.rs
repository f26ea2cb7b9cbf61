//! foresightd.toml configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use foresight_autoscale::ControllerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub listen: SocketAddr,
    pub controller: ControllerSection,
    pub runner: RunnerSection,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/foresight"),
            listen: SocketAddr::from(([0, 0, 0, 0], 8480)),
            controller: ControllerSection::default(),
            runner: RunnerSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    pub workers: usize,
    pub resync_interval_secs: u64,
    pub error_retry_secs: u64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            workers: 4,
            resync_interval_secs: 30,
            error_retry_secs: 10,
        }
    }
}

impl ControllerSection {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            workers: self.workers,
            resync_interval: Duration::from_secs(self.resync_interval_secs),
        }
    }

    pub fn error_retry(&self) -> Duration {
        Duration::from_secs(self.error_retry_secs)
    }
}

/// Where prediction kernels run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerMode {
    /// One child process per prediction.
    #[default]
    Process,
    /// In-process on the blocking thread pool.
    Native,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub mode: RunnerMode,
    /// Kernel program; the daemon's own executable when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            mode: RunnerMode::Process,
            program: None,
            args: vec!["kernel".to_string()],
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the redb database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("foresight.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.listen.port(), 8480);
        assert_eq!(config.runner.args, vec!["kernel".to_string()]);
        assert_eq!(config.controller.error_retry(), Duration::from_secs(10));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            data_dir = "/tmp/foresight"

            [controller]
            workers = 8

            [runner]
            mode = "native"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/foresight"));
        assert_eq!(config.controller.workers, 8);
        assert_eq!(config.controller.resync_interval_secs, 30);
        assert_eq!(config.runner.mode, RunnerMode::Native);
        assert_eq!(config.runner.args, vec!["kernel".to_string()]);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foresightd.toml");
        std::fs::write(
            &path,
            "listen = \"127.0.0.1:9000\"\n[runner]\nprogram = \"/usr/bin/kernel\"\nargs = []\n",
        )
        .unwrap();

        let config = DaemonConfig::from_file(&path).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.runner.program, Some(PathBuf::from("/usr/bin/kernel")));
        assert!(config.runner.args.is_empty());
    }

    #[test]
    fn to_toml_string_round_trips() {
        let config = DaemonConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[controller]"));
        assert_eq!(toml::from_str::<DaemonConfig>(&text).unwrap(), config);
    }

    #[test]
    fn unknown_runner_mode_is_rejected() {
        assert!(toml::from_str::<DaemonConfig>("[runner]\nmode = \"wasm\"\n").is_err());
    }
}
