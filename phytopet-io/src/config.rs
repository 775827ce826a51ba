//! Conversion run configuration.

use crate::{Error, Result};
use phytopet_core::{DecayCorrection, EnergyWindow, EventFilter, F18_HALF_LIFE_MINUTES};
use phytopet_listmode::clock::DEFAULT_TICK_NS;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Events between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Settings for one list-mode to histogram conversion.
///
/// Loadable from JSON; missing keys take their defaults:
///
/// ```json
/// {
///   "input": "run.lm",
///   "output": "run.cdh",
///   "energy_low_percent": 15.0,
///   "spatial_filter": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// List-mode input file.
    pub input: PathBuf,
    /// Histogram output file.
    pub output: PathBuf,
    /// Lower energy bound as a percentage below 511 keV.
    pub energy_low_percent: Option<f64>,
    /// Upper energy bound as a percentage above 511 keV.
    pub energy_high_percent: Option<f64>,
    /// Reject pairs whose crystal coordinates are too far apart.
    pub spatial_filter: bool,
    /// Tracer half-life in minutes.
    pub half_life_minutes: f64,
    /// Highest vertical index; sizes the histogram.
    pub max_vertical_index: u32,
    /// Acquisition clock tick in nanoseconds.
    pub clock_tick_ns: f64,
    /// Events between progress log lines; 0 disables them.
    pub progress_interval: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            energy_low_percent: None,
            energy_high_percent: None,
            spatial_filter: false,
            half_life_minutes: F18_HALF_LIFE_MINUTES,
            max_vertical_index: 0,
            clock_tick_ns: DEFAULT_TICK_NS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ConversionConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid configuration JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks that the settings describe a runnable conversion.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for missing paths or a non-positive clock
    /// tick, and core errors for invalid energy or half-life settings.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::Config("no input file given".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(Error::Config("no output file given".into()));
        }
        if !(self.clock_tick_ns.is_finite() && self.clock_tick_ns > 0.0) {
            return Err(Error::Config(format!(
                "clock tick must be positive, got {} ns",
                self.clock_tick_ns
            )));
        }
        self.event_filter()?;
        self.decay()?;
        Ok(())
    }

    /// Energy window from the percentage overrides.
    ///
    /// # Errors
    /// Returns an error for non-finite percentages or an empty window.
    pub fn energy_window(&self) -> Result<EnergyWindow> {
        Ok(EnergyWindow::from_percent(
            self.energy_low_percent,
            self.energy_high_percent,
        )?)
    }

    /// Event filter for this run.
    ///
    /// # Errors
    /// Returns an error if the energy window is invalid.
    pub fn event_filter(&self) -> Result<EventFilter> {
        Ok(EventFilter::new(self.energy_window()?, self.spatial_filter))
    }

    /// Decay correction for this run.
    ///
    /// # Errors
    /// Returns an error for a non-positive half-life.
    pub fn decay(&self) -> Result<DecayCorrection> {
        Ok(DecayCorrection::from_half_life_minutes(
            self.half_life_minutes,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert_relative_eq!(config.half_life_minutes, 109.7);
        assert_eq!(config.max_vertical_index, 0);
        assert_eq!(config.progress_interval, 1_000_000);
        assert_eq!(config.energy_window().unwrap(), EnergyWindow::default());
        assert!(!config.event_filter().unwrap().spatial_enabled());
    }

    #[test]
    fn test_json_loading() {
        let json = r#"{
            "input": "run.lm",
            "output": "run.cdh",
            "energy_low_percent": 10.0,
            "energy_high_percent": 20.0,
            "spatial_filter": true,
            "max_vertical_index": 2
        }"#;

        let config = ConversionConfig::from_json(json).expect("Failed to parse JSON");
        assert_eq!(config.input, PathBuf::from("run.lm"));
        assert_eq!(config.output, PathBuf::from("run.cdh"));
        assert_eq!(config.max_vertical_index, 2);
        assert_relative_eq!(config.half_life_minutes, 109.7);

        let window = config.energy_window().unwrap();
        assert_eq!((window.min, window.max), (459, 613));
        assert!(config.event_filter().unwrap().spatial_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"input": "a.lm", "half_life_minutes": 20.4}}"#).unwrap();
        file.flush().unwrap();

        let config = ConversionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input, PathBuf::from("a.lm"));
        assert_relative_eq!(config.half_life_minutes, 20.4);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = ConversionConfig::from_json(r#"{"spatial_filter": "yes"}"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_validate() {
        let mut config = ConversionConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.input = "in.lm".into();
        config.output = "out.cdh".into();
        config.validate().unwrap();

        config.half_life_minutes = 0.0;
        assert!(matches!(config.validate(), Err(Error::CoreError(_))));

        config.half_life_minutes = 109.7;
        config.clock_tick_ns = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_high_energy_window() {
        let config = ConversionConfig::from_json(
            r#"{"input": "a.lm", "output": "a.cdh",
                "energy_low_percent": -70.0, "energy_high_percent": 80.0}"#,
        )
        .unwrap();
        config.validate().unwrap();
        let window = config.energy_window().unwrap();
        assert_eq!((window.min, window.max), (868, 919));
    }
}
