//! Host settings: an optional YAML file overlaid with `POLYVOICE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, Map};
use pv_engine::EngineConfig;
use pv_ir::TuningBank;
use serde::Deserialize;

use crate::MasterError;

const ENV_PREFIX: &str = "POLYVOICE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sample_rate: u32,
    pub block_size: usize,
    /// Voice count override. Unset means the unit's own `nvoices`.
    pub voices: Option<usize>,
    /// Directory of `.syx` tunings. Unset means the default search path.
    pub tuning_dir: Option<PathBuf>,
    pub midi_cc: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            sample_rate: engine.sample_rate,
            block_size: engine.max_block_size,
            voices: None,
            tuning_dir: None,
            midi_cc: engine.midi_cc,
        }
    }
}

impl Settings {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, MasterError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Settings::load`], reading variables from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, MasterError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, MasterError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_sample_rate(self.sample_rate)
            .with_max_block_size(self.block_size)
            .with_midi_cc(self.midi_cc);
        match self.voices {
            Some(voices) => config.with_max_voices(voices),
            None => config,
        }
    }

    /// The tuning bank from `tuning_dir`, or from the default search path.
    pub fn tuning_bank(&self) -> TuningBank {
        match &self.tuning_dir {
            Some(dir) => pv_formats::load_tuning_dir(dir),
            None => pv_formats::load_default_bank(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_match_engine() {
        let settings = Settings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine_config(), EngineConfig::default());
    }

    #[test]
    fn yaml_fields() {
        let settings = Settings::from_yaml(
            "sample_rate: 48000\nblock_size: 128\nvoices: 4\ntuning_dir: /tmp/tunings\nmidi_cc: false\n",
        )
        .unwrap();
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.block_size, 128);
        assert_eq!(settings.voices, Some(4));
        assert_eq!(settings.tuning_dir, Some(PathBuf::from("/tmp/tunings")));
        assert!(!settings.midi_cc);

        let config = settings.engine_config();
        assert_eq!(config.max_voices, Some(4));
        assert_eq!(config.max_block_size, 128);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("voices: 2\n").unwrap();
        assert_eq!(settings.sample_rate, 44100);
        assert!(settings.midi_cc);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polyvoice.yaml");
        std::fs::write(&path, "sample_rate: 48000\nvoices: 4\n").unwrap();

        let settings =
            Settings::load_with_env(Some(&path), env(&[("POLYVOICE_VOICES", "12")])).unwrap();
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.voices, Some(12));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_with_env(Some(&dir.path().join("nope.yaml")), env(&[]));
        assert!(matches!(err, Err(MasterError::Config(_))));
    }

    #[test]
    fn bad_value_is_an_error() {
        assert!(matches!(
            Settings::from_yaml("sample_rate: fast\n"),
            Err(MasterError::Config(_))
        ));
    }
}
