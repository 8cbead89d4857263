use crate::extract::delimited::DEFAULT_DELIMITER;
use crate::extract::Layout;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from simlog.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct AnalyzerConfig {
    pub inputs: InputsConfig,
    pub outputs: OutputsConfig,
    pub analysis: AnalysisConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub delay_log: PathBuf,
    pub arrival_log: PathBuf,
    pub mac_delay_log: PathBuf,
    pub loss_log: PathBuf,
    pub layout: Layout,
    pub delimiter: char,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    pub dir: PathBuf,
    pub delay_chart: PathBuf,
    pub arrival_chart: PathBuf,
    pub source_chart: PathBuf,
    pub mac_delay_chart: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Inter-arrival times at or above this are left out of histograms.
    pub inter_arrival_threshold_ms: f64,
    pub histogram_bins: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub panel_height: u32,
}

// --- Default implementations ---

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            delay_log: PathBuf::from("delayLog.txt"),
            arrival_log: PathBuf::from("incomingLog.txt"),
            mac_delay_log: PathBuf::from("MacDelayLog.txt"),
            loss_log: PathBuf::from("lossLog.txt"),
            layout: Layout::Pattern,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            delay_chart: PathBuf::from("subplots_delay_vs_time.png"),
            arrival_chart: PathBuf::from("combined_analysis.png"),
            source_chart: PathBuf::from("inter_arrival_by_source.png"),
            mac_delay_chart: PathBuf::from("mac_delay_analysis.png"),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            inter_arrival_threshold_ms: 100.0,
            histogram_bins: 50,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            panel_height: 500,
        }
    }
}

impl OutputsConfig {
    /// Resolve a chart file name against the output directory.
    pub fn chart_path(&self, name: &Path) -> PathBuf {
        self.dir.join(name)
    }
}

/// Errors produced while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config file {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl AnalyzerConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// With `required`, a missing file is an error instead.
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Check values that would make the analysis meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.analysis.inter_arrival_threshold_ms;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "analysis.inter_arrival_threshold_ms must be positive, got {threshold}"
            )));
        }
        if self.analysis.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "analysis.histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.chart.width < 100 || self.chart.panel_height < 100 {
            return Err(ConfigError::Invalid(format!(
                "chart size must be at least 100x100, got {}x{}",
                self.chart.width, self.chart.panel_height
            )));
        }
        let delimiter = self.inputs.delimiter;
        if delimiter == ':' || delimiter == ' ' {
            return Err(ConfigError::Invalid(format!(
                "inputs.delimiter cannot be {delimiter:?}, it appears inside `Key: value` columns"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_simulator_file_names() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.inputs.delay_log, PathBuf::from("delayLog.txt"));
        assert_eq!(config.inputs.arrival_log, PathBuf::from("incomingLog.txt"));
        assert_eq!(config.analysis.inter_arrival_threshold_ms, 100.0);
        assert_eq!(config.analysis.histogram_bins, 50);
        assert_eq!(config.inputs.layout, Layout::Pattern);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("simlog.toml");
        std::fs::write(
            &path,
            r#"
[inputs]
layout = "delimited"
delimiter = ";"

[analysis]
inter_arrival_threshold_ms = 250.0
"#,
        )
        .unwrap();

        let config = AnalyzerConfig::load(&path).unwrap();
        assert_eq!(config.inputs.layout, Layout::Delimited);
        assert_eq!(config.inputs.delimiter, ';');
        assert_eq!(config.analysis.inter_arrival_threshold_ms, 250.0);
        assert_eq!(config.analysis.histogram_bins, 50);
        assert_eq!(config.inputs.delay_log, PathBuf::from("delayLog.txt"));
    }

    #[test]
    fn missing_optional_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("simlog.toml");
        let config = AnalyzerConfig::load_or_default(&path, false).unwrap();
        assert_eq!(config.chart.width, 1200);

        let err = AnalyzerConfig::load_or_default(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("simlog.toml");

        std::fs::write(&path, "[analysis]\ninter_arrival_threshold_ms = -1.0\n").unwrap();
        assert!(matches!(AnalyzerConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[analysis]\nhistogram_bins = 0\n").unwrap();
        assert!(matches!(AnalyzerConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[inputs]\ndelimiter = \":\"\n").unwrap();
        assert!(matches!(AnalyzerConfig::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "[inputs]\nlayout = \"csv\"\n").unwrap();
        assert!(matches!(AnalyzerConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn chart_path_joins_output_dir() {
        let outputs = OutputsConfig {
            dir: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(
            outputs.chart_path(Path::new("a.png")),
            PathBuf::from("out").join("a.png")
        );
    }
}
