use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Merge AcuWand daily recordings and compute pressure / treatment-time statistics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge same-day fragments and write per-day and per-subject statistics
    Analyze(AnalyzeArgs),
    /// Check raw file names against the three known naming formats
    Validate(LayoutArgs),
}

/// Where the data lives and how cohorts/subjects are recognized
#[derive(clap::Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Directory containing cohort directories (T7, T8, ...)
    #[arg(help = "Directory containing cohort directories")]
    pub input_dir: PathBuf,

    /// Directory for the log and result tables, defaults to the input directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON file with analysis settings; flags given on the command line win
    #[arg(long, env = "ACUWAND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Study name used as the prefix of every output file
    #[arg(long)]
    pub study_name: Option<String>,

    /// Prefix identifying cohort directories
    #[arg(long)]
    pub cohort_prefix: Option<String>,

    /// Prefix identifying subject directories (empty matches every directory)
    #[arg(long)]
    pub subject_prefix: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Pressure values at or below this are dropped before statistics
    #[arg(long, allow_negative_numbers = true)]
    pub lower_cutoff: Option<f64>,

    /// Pressure values at or above this are dropped before statistics
    #[arg(long, allow_negative_numbers = true)]
    pub upper_cutoff: Option<f64>,

    /// Lower end of the band around zero treated as device idle
    #[arg(long, allow_negative_numbers = true)]
    pub lower_range_for_delete: Option<f64>,

    /// Upper end of the band around zero treated as device idle
    #[arg(long, allow_negative_numbers = true)]
    pub upper_range_for_delete: Option<f64>,

    /// Sampling rate of the wand in Hz
    #[arg(long)]
    pub sample_rate_hz: Option<f64>,

    /// Repeated-value runs longer than this many samples are inspected
    #[arg(long)]
    pub run_length_threshold: Option<usize>,

    /// Do not compute pressure distribution statistics
    #[arg(long)]
    pub skip_pressure_stats: bool,

    /// Do not compute treatment time
    #[arg(long)]
    pub skip_treatment_time: bool,

    /// Keep idle zero-band runs in the pressure statistics
    #[arg(long)]
    pub keep_idle_in_pressure: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("upper_cutoff ({upper}) must be greater than lower_cutoff ({lower})")]
    EmptyPressureBand { lower: f64, upper: f64 },

    #[error(
        "upper_range_for_delete ({upper}) must not be below lower_range_for_delete ({lower})"
    )]
    InvertedZeroBand { lower: f64, upper: f64 },

    #[error("sample_rate_hz must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("run_length_threshold_samples must be at least 1")]
    ZeroRunThreshold,
}

/// Settings for one analysis or validation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub study_name: String,
    pub cohort_prefix: String,
    pub subject_prefix: String,
    pub lower_cutoff: f64,
    pub upper_cutoff: f64,
    pub lower_range_for_delete: f64,
    pub upper_range_for_delete: f64,
    pub sample_rate_hz: f64,
    pub run_length_threshold_samples: usize,
    pub calc_pressure_stats: bool,
    pub calc_treatment_time: bool,
    /// Drop idle runs (the ones removed from treatment time) before pressure statistics.
    pub exclude_idle_from_pressure: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            study_name: "study_name".to_string(),
            cohort_prefix: "T".to_string(),
            subject_prefix: String::new(),
            lower_cutoff: -10.0,
            upper_cutoff: 10.0,
            lower_range_for_delete: -0.1,
            upper_range_for_delete: 0.1,
            sample_rate_hz: 10.0,
            run_length_threshold_samples: 600,
            calc_pressure_stats: true,
            calc_treatment_time: true,
            exclude_idle_from_pressure: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the optional config file, then explicit flags.
    pub fn from_layout_args(args: &LayoutArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        if let Some(name) = &args.study_name {
            config.study_name = name.clone();
        }
        if let Some(prefix) = &args.cohort_prefix {
            config.cohort_prefix = prefix.clone();
        }
        if let Some(prefix) = &args.subject_prefix {
            config.subject_prefix = prefix.clone();
        }
        Ok(config)
    }

    pub fn from_analyze_args(args: &AnalyzeArgs) -> Result<Self, ConfigError> {
        let mut config = Self::from_layout_args(&args.layout)?;
        if let Some(v) = args.lower_cutoff {
            config.lower_cutoff = v;
        }
        if let Some(v) = args.upper_cutoff {
            config.upper_cutoff = v;
        }
        if let Some(v) = args.lower_range_for_delete {
            config.lower_range_for_delete = v;
        }
        if let Some(v) = args.upper_range_for_delete {
            config.upper_range_for_delete = v;
        }
        if let Some(v) = args.sample_rate_hz {
            config.sample_rate_hz = v;
        }
        if let Some(v) = args.run_length_threshold {
            config.run_length_threshold_samples = v;
        }
        if args.skip_pressure_stats {
            config.calc_pressure_stats = false;
        }
        if args.skip_treatment_time {
            config.calc_treatment_time = false;
        }
        if args.keep_idle_in_pressure {
            config.exclude_idle_from_pressure = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("lower_cutoff", self.lower_cutoff),
            ("upper_cutoff", self.upper_cutoff),
            ("lower_range_for_delete", self.lower_range_for_delete),
            ("upper_range_for_delete", self.upper_range_for_delete),
            ("sample_rate_hz", self.sample_rate_hz),
        ];
        for (field, value) in bounds {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        if self.upper_cutoff <= self.lower_cutoff {
            return Err(ConfigError::EmptyPressureBand {
                lower: self.lower_cutoff,
                upper: self.upper_cutoff,
            });
        }
        if self.upper_range_for_delete < self.lower_range_for_delete {
            return Err(ConfigError::InvertedZeroBand {
                lower: self.lower_range_for_delete,
                upper: self.upper_range_for_delete,
            });
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        if self.run_length_threshold_samples == 0 {
            return Err(ConfigError::ZeroRunThreshold);
        }
        Ok(())
    }

    /// Strict on both ends.
    pub fn in_pressure_band(&self, value: f64) -> bool {
        self.lower_cutoff < value && value < self.upper_cutoff
    }

    /// Inclusive on both ends.
    pub fn in_zero_band(&self, value: f64) -> bool {
        self.lower_range_for_delete <= value && value <= self.upper_range_for_delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.run_length_threshold_samples, 600);
        assert_eq!(config.sample_rate_hz, 10.0);
        assert!(config.exclude_idle_from_pressure);
    }

    #[test]
    fn rejects_empty_pressure_band() {
        let config = AnalysisConfig {
            lower_cutoff: 5.0,
            upper_cutoff: 5.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyPressureBand { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_bounds() {
        let config = AnalysisConfig {
            upper_cutoff: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "upper_cutoff",
                ..
            })
        ));
    }

    #[test]
    fn rejects_inverted_zero_band_and_bad_rates() {
        let inverted = AnalysisConfig {
            lower_range_for_delete: 0.1,
            upper_range_for_delete: -0.1,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvertedZeroBand { .. })
        ));

        let zero_rate = AnalysisConfig {
            sample_rate_hz: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            zero_rate.validate(),
            Err(ConfigError::InvalidSampleRate(_))
        ));

        let zero_threshold = AnalysisConfig {
            run_length_threshold_samples: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            zero_threshold.validate(),
            Err(ConfigError::ZeroRunThreshold)
        ));
    }

    #[test]
    fn band_boundaries() {
        let config = AnalysisConfig::default();
        assert!(!config.in_pressure_band(-10.0));
        assert!(!config.in_pressure_band(10.0));
        assert!(config.in_pressure_band(9.999));
        assert!(config.in_zero_band(-0.1));
        assert!(config.in_zero_band(0.1));
        assert!(!config.in_zero_band(0.1000001));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "study_name": "BPCR", "upper_cutoff": 12.5 }"#).unwrap();
        assert_eq!(config.study_name, "BPCR");
        assert_eq!(config.upper_cutoff, 12.5);
        assert_eq!(config.lower_cutoff, -10.0);
    }

    #[test]
    fn unknown_json_keys_are_rejected() {
        let parsed: Result<AnalysisConfig, _> = serde_json::from_str(r#"{ "uper_cutoff": 1.0 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "acuwand-analysis",
            "analyze",
            "/data",
            "--lower-cutoff",
            "-5",
            "--upper-cutoff",
            "5",
            "--skip-treatment-time",
            "--keep-idle-in-pressure",
        ]);
        let Command::Analyze(analyze) = args.command else {
            panic!("expected analyze subcommand");
        };
        let config = AnalysisConfig::from_analyze_args(&analyze).unwrap();
        assert_eq!(config.lower_cutoff, -5.0);
        assert_eq!(config.upper_cutoff, 5.0);
        assert!(!config.calc_treatment_time);
        assert!(config.calc_pressure_stats);
        assert!(!config.exclude_idle_from_pressure);
    }
}
