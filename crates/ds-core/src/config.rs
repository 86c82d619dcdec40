use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::frame::wire_len;

/// Seuils de classification et gain par scène.
///
/// Lus une fois au démarrage, jamais modifiés ensuite.
///
/// # Example
/// ```
/// use ds_core::config::SceneThresholds;
/// let t = SceneThresholds::default();
/// assert_eq!(t.quiet_rms, 0.025);
/// assert_eq!(t.noise_gain, 0.5);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SceneThresholds {
    /// RMS strictly below this value is Quiet.
    pub quiet_rms: f32,
    /// RMS at or below this value may be Speech.
    pub noise_rms: f32,
    /// Lower edge of the speech centroid band, inclusive (Hz).
    pub centroid_min: f32,
    /// Upper edge of the speech centroid band, inclusive (Hz).
    pub centroid_max: f32,
    /// Gain applied to Quiet blocks.
    pub quiet_gain: f32,
    /// Gain applied to Speech blocks.
    pub speech_gain: f32,
    /// Gain applied to Noise blocks.
    pub noise_gain: f32,
}

impl Default for SceneThresholds {
    fn default() -> Self {
        Self {
            quiet_rms: 0.025,
            noise_rms: 0.10,
            centroid_min: 600.0,
            centroid_max: 3200.0,
            quiet_gain: 3.0,
            speech_gain: 1.0,
            noise_gain: 0.5,
        }
    }
}

/// Configuration complète du pipeline.
///
/// Construite une seule fois, validée, puis partagée en lecture seule
/// entre le producteur et le consommateur.
///
/// # Example
/// ```
/// use ds_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.sample_count, 512);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Acquisition rate in Hz.
    pub sample_rate: u32,
    /// Samples per block. Power of two (FFT).
    pub sample_count: usize,
    /// Frames the queue can hold before shedding.
    pub queue_capacity: usize,
    /// Size of the consumer's transmit buffer in bytes.
    pub tx_buffer_size: usize,
    /// RMS at or below which the centroid is not computed.
    pub centroid_rms_floor: f32,
    /// Classification thresholds and gains.
    pub scene: SceneThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            sample_count: 512,
            queue_capacity: 4,
            tx_buffer_size: 4096,
            centroid_rms_floor: 1e-6,
            scene: SceneThresholds::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every configuration-time precondition of the pipeline.
    ///
    /// A transmit buffer too small for one frame is not an error (frames are
    /// dropped at serialization), but it is logged.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sample_rate == 0 {
            return Err(CoreError::Config("sample_rate doit être > 0".into()));
        }
        if self.sample_count == 0 || !self.sample_count.is_power_of_two() {
            return Err(CoreError::Config(format!(
                "sample_count doit être une puissance de deux non nulle (reçu {})",
                self.sample_count
            )));
        }
        if u32::try_from(self.sample_count).is_err() {
            return Err(CoreError::SampleCountOverflow(self.sample_count));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::Config("queue_capacity doit être > 0".into()));
        }
        if !(self.centroid_rms_floor.is_finite() && self.centroid_rms_floor >= 0.0) {
            return Err(CoreError::Config(
                "centroid_rms_floor doit être fini et >= 0".into(),
            ));
        }

        let s = &self.scene;
        for (name, value) in [
            ("quiet_rms", s.quiet_rms),
            ("noise_rms", s.noise_rms),
            ("centroid_min", s.centroid_min),
            ("centroid_max", s.centroid_max),
        ] {
            if !value.is_finite() {
                return Err(CoreError::Config(format!("{name} doit être fini")));
            }
        }
        for (name, gain) in [
            ("quiet_gain", s.quiet_gain),
            ("speech_gain", s.speech_gain),
            ("noise_gain", s.noise_gain),
        ] {
            if !(gain.is_finite() && gain >= 0.0) {
                return Err(CoreError::Config(format!(
                    "{name} doit être fini et >= 0 (reçu {gain})"
                )));
            }
        }
        if s.centroid_min > s.centroid_max {
            return Err(CoreError::Config(format!(
                "bande de centroïde inversée : {} > {}",
                s.centroid_min, s.centroid_max
            )));
        }
        if s.quiet_rms > s.noise_rms {
            log::warn!(
                "quiet_rms ({}) > noise_rms ({}): Speech ne sera jamais détecté",
                s.quiet_rms,
                s.noise_rms
            );
        }

        let needed = wire_len(self.sample_count);
        if self.tx_buffer_size < needed {
            log::warn!(
                "tx_buffer_size {} < {needed} bytes per frame: every frame will be dropped",
                self.tx_buffer_size
            );
        }
        Ok(())
    }

    /// Duration of one acquisition block.
    #[must_use]
    pub fn block_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(
            self.sample_count as f64 / f64::from(self.sample_rate.max(1)),
        )
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    pipeline: Option<PipelineSection>,
    scene: Option<SceneSection>,
}

/// Pipeline section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct PipelineSection {
    sample_rate: Option<u32>,
    sample_count: Option<usize>,
    queue_capacity: Option<usize>,
    tx_buffer_size: Option<usize>,
    centroid_rms_floor: Option<f32>,
}

/// Scene section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct SceneSection {
    quiet_rms: Option<f32>,
    noise_rms: Option<f32>,
    centroid_min: Option<f32>,
    centroid_max: Option<f32>,
    quiet_gain: Option<f32>,
    speech_gain: Option<f32>,
    noise_gain: Option<f32>,
}

/// Parse TOML text and merge it over the defaults, then validate.
///
/// # Errors
/// Returns an error if the text is not valid TOML or the merged config is invalid.
///
/// # Example
/// ```
/// use ds_core::config::parse_config;
/// let config = parse_config("[scene]\nnoise_gain = 0.25\n").unwrap();
/// assert_eq!(config.scene.noise_gain, 0.25);
/// assert_eq!(config.sample_count, 512);
/// ```
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = PipelineConfig::default();

    if let Some(p) = file.pipeline {
        if let Some(v) = p.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = p.sample_count {
            config.sample_count = v;
        }
        if let Some(v) = p.queue_capacity {
            config.queue_capacity = v;
        }
        if let Some(v) = p.tx_buffer_size {
            config.tx_buffer_size = v;
        }
        if let Some(v) = p.centroid_rms_floor {
            config.centroid_rms_floor = v;
        }
    }

    if let Some(s) = file.scene {
        let t = &mut config.scene;
        if let Some(v) = s.quiet_rms {
            t.quiet_rms = v;
        }
        if let Some(v) = s.noise_rms {
            t.noise_rms = v;
        }
        if let Some(v) = s.centroid_min {
            t.centroid_min = v;
        }
        if let Some(v) = s.centroid_max {
            t.centroid_max = v;
        }
        if let Some(v) = s.quiet_gain {
            t.quiet_gain = v;
        }
        if let Some(v) = s.speech_gain {
            t.speech_gain = v;
        }
        if let Some(v) = s.noise_gain {
            t.noise_gain = v;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or fails validation.
///
/// # Example
/// ```no_run
/// use ds_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_reference_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.scene.centroid_min, 600.0);
        assert_eq!(config.scene.centroid_max, 3200.0);
        assert_eq!(config.scene.quiet_gain, 3.0);
        assert_eq!(config.scene.speech_gain, 1.0);
    }

    #[test]
    fn non_power_of_two_sample_count_is_a_config_error() {
        for bad in [0, 3, 500, 513] {
            let config = PipelineConfig {
                sample_count: bad,
                ..PipelineConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(CoreError::Config(_))),
                "sample_count {bad} should be rejected"
            );
        }
    }

    #[test]
    fn zero_capacity_and_negative_gain_are_rejected() {
        let config = PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scene.speech_gain = -1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scene.centroid_min = 4000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn small_tx_buffer_is_only_a_warning() {
        let config = PipelineConfig {
            tx_buffer_size: 16,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config = parse_config(
            "[pipeline]\nsample_count = 1024\nqueue_capacity = 8\n\n[scene]\nquiet_rms = 0.01\n",
        )
        .unwrap();
        assert_eq!(config.sample_count, 1024);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.scene.quiet_rms, 0.01);
        assert_eq!(config.scene.noise_rms, 0.10);
        assert_eq!(config.sample_rate, 16_000);
    }

    #[test]
    fn invalid_toml_values_fail_validation() {
        assert!(parse_config("[pipeline]\nsample_count = 300\n").is_err());
        assert!(parse_config("not = [valid").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\nsample_rate = 48000").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert!(load_config(Path::new("/nonexistent/dynsense.toml")).is_err());
    }

    #[test]
    fn shipped_default_file_matches_defaults() {
        let config = parse_config(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn block_duration_follows_rate() {
        let config = PipelineConfig::default();
        assert_eq!(config.block_duration().as_millis(), 32);
    }
}
