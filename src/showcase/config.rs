use crate::showcase::curved_text::{CurvedTextError, CurvedTextStyle, KerningTable};
use crate::showcase::{CONFIG_PATH_DEFAULT, GROUND_TEXT_DEFAULT};
use bevy::prelude::{Resource, Vec3};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const ENV_MAP_INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=4.0;
pub const ANIMATION_SPEED_RANGE: RangeInclusive<f32> = 0.0..=3.0;
pub const LIGHT_INTENSITY_RANGE: RangeInclusive<f32> = 0.0..=10.0;
pub const LIGHT_POSITION_RANGE: RangeInclusive<f32> = -5.0..=5.0;
pub const EXPOSURE_RANGE: RangeInclusive<f32> = 0.0..=4.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub max_pixel_ratio: f32,
    pub ground_text: String,
    pub ground_text_font: String,
    pub ground_text_kerning: Vec<(String, f32)>,
    pub letter_spacing_px: f32,
    pub fox_model: String,
    pub fox_scale: f32,
    pub floor_radius: f32,
    pub floor_segments: u32,
    pub floor_texture_repeat: f32,
    pub floor_color_texture: String,
    pub floor_normal_texture: String,
    pub environment_map_dir: String,
    pub log_diagnostics: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            window_title: "Summoning Eru".to_string(),
            window_width: 1600,
            window_height: 900,
            max_pixel_ratio: 2.0,
            ground_text: GROUND_TEXT_DEFAULT.to_string(),
            ground_text_font: "assets/fonts/ground_text.ttf".to_string(),
            ground_text_kerning: vec![("NI".to_string(), -2.0), ("IN".to_string(), 0.0)],
            letter_spacing_px: 2.0,
            fox_model: "models/Fox/glTF/Fox.gltf".to_string(),
            fox_scale: 0.02,
            floor_radius: 5.0,
            floor_segments: 64,
            floor_texture_repeat: 1.5,
            floor_color_texture: "textures/dirt/color.jpg".to_string(),
            floor_normal_texture: "textures/dirt/normal.jpg".to_string(),
            environment_map_dir: "assets/textures/environmentMap".to_string(),
            log_diagnostics: false,
        }
    }
}

impl SceneSettings {
    pub fn curved_text_style(&self) -> Result<CurvedTextStyle, CurvedTextError> {
        let kerning = KerningTable::from_pairs(
            self.ground_text_kerning
                .iter()
                .map(|(pair, px)| (pair.as_str(), *px)),
        )?;
        Ok(CurvedTextStyle {
            letter_spacing_px: self.letter_spacing_px,
            kerning,
            ..CurvedTextStyle::default()
        })
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugTuning {
    pub env_map_intensity: f32,
    pub animation: Option<String>,
    pub animation_speed: f32,
    pub light_intensity: f32,
    pub light_position: (f32, f32, f32),
    pub exposure: f32,
}

impl Default for DebugTuning {
    fn default() -> Self {
        Self {
            env_map_intensity: 0.4,
            animation: None,
            animation_speed: 1.0,
            light_intensity: 4.0,
            light_position: (3.5, 2.0, -1.25),
            exposure: 1.75,
        }
    }
}

impl DebugTuning {
    pub fn light_position_vec3(&self) -> Vec3 {
        Vec3::new(
            self.light_position.0,
            self.light_position.1,
            self.light_position.2,
        )
    }

    pub fn clamped(mut self) -> Self {
        let clamp = |value: f32, range: &RangeInclusive<f32>, fallback: f32| {
            if value.is_finite() {
                value.clamp(*range.start(), *range.end())
            } else {
                fallback
            }
        };
        let defaults = Self::default();

        self.env_map_intensity = clamp(
            self.env_map_intensity,
            &ENV_MAP_INTENSITY_RANGE,
            defaults.env_map_intensity,
        );
        self.animation_speed = clamp(
            self.animation_speed,
            &ANIMATION_SPEED_RANGE,
            defaults.animation_speed,
        );
        self.light_intensity = clamp(
            self.light_intensity,
            &LIGHT_INTENSITY_RANGE,
            defaults.light_intensity,
        );
        self.light_position = (
            clamp(
                self.light_position.0,
                &LIGHT_POSITION_RANGE,
                defaults.light_position.0,
            ),
            clamp(
                self.light_position.1,
                &LIGHT_POSITION_RANGE,
                defaults.light_position.1,
            ),
            clamp(
                self.light_position.2,
                &LIGHT_POSITION_RANGE,
                defaults.light_position.2,
            ),
        );
        self.exposure = clamp(self.exposure, &EXPOSURE_RANGE, defaults.exposure);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConfig {
    pub settings: SceneSettings,
    pub tuning: DebugTuning,
}

#[derive(Resource, Debug, Clone)]
pub struct ConfigStore {
    pub path: PathBuf,
    pub settings: SceneSettings,
    // As read from `path`; command-line overrides never reach the file.
    file_settings: SceneSettings,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(PathBuf::from(CONFIG_PATH_DEFAULT), SceneSettings::default())
    }
}

impl ConfigStore {
    pub fn new(path: PathBuf, settings: SceneSettings) -> Self {
        Self {
            path,
            file_settings: settings.clone(),
            settings,
        }
    }

    pub fn with_overrides(mut self, ground_text: Option<String>, diagnostics: bool) -> Self {
        if let Some(text) = ground_text {
            self.settings.ground_text = text;
        }
        self.settings.log_diagnostics |= diagnostics;
        self
    }

    pub fn save(&self, tuning: &DebugTuning) -> Result<(), ConfigError> {
        save_config(
            &self.path,
            &PersistedConfig {
                settings: self.file_settings.clone(),
                tuning: tuning.clone(),
            },
        )
    }

    pub fn reload_tuning(&self) -> Result<DebugTuning, ConfigError> {
        Ok(read_config(&self.path)?.tuning.clamped())
    }
}

pub fn read_config(path: &Path) -> Result<PersistedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    ron::from_str::<PersistedConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_config(path: &Path) -> PersistedConfig {
    if !path.exists() {
        return PersistedConfig::default();
    }

    match read_config(path) {
        Ok(mut config) => {
            config.tuning = config.tuning.clamped();
            config
        }
        Err(err) => {
            warn!("Ignoring config: {err}");
            PersistedConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &PersistedConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let content = ron::ser::to_string_pretty(config, PrettyConfig::new())?;
    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: PersistedConfig =
            ron::from_str("(tuning: (exposure: 2.5), settings: (ground_text: \"ERU\"))").unwrap();
        assert_eq!(config.tuning.exposure, 2.5);
        assert_eq!(config.tuning.env_map_intensity, 0.4);
        assert_eq!(config.settings.ground_text, "ERU");
        assert_eq!(config.settings.floor_radius, 5.0);
    }

    #[rstest]
    #[case(DebugTuning { env_map_intensity: 9.0, ..DebugTuning::default() }, 4.0)]
    #[case(DebugTuning { env_map_intensity: -1.0, ..DebugTuning::default() }, 0.0)]
    #[case(DebugTuning { env_map_intensity: f32::NAN, ..DebugTuning::default() }, 0.4)]
    fn env_map_intensity_is_clamped(#[case] tuning: DebugTuning, #[case] expected: f32) {
        assert_eq!(tuning.clamped().env_map_intensity, expected);
    }

    #[test]
    fn clamping_keeps_in_range_values() {
        let tuning = DebugTuning {
            animation: Some("Run".to_string()),
            light_position: (6.0, -7.0, 1.0),
            exposure: 3.0,
            ..DebugTuning::default()
        };
        let clamped = tuning.clone().clamped();
        assert_eq!(clamped.light_position, (5.0, -5.0, 1.0));
        assert_eq!(clamped.exposure, 3.0);
        assert_eq!(clamped.animation, tuning.animation);
    }

    #[test]
    fn defaults_match_the_scene() {
        let tuning = DebugTuning::default();
        assert_eq!(tuning.light_position_vec3(), Vec3::new(3.5, 2.0, -1.25));
        assert_eq!(tuning.light_intensity, 4.0);
        assert_eq!(tuning.exposure, 1.75);

        let style = SceneSettings::default().curved_text_style().unwrap();
        assert_eq!(style, CurvedTextStyle::default());
    }

    #[test]
    fn bad_kerning_entry_is_reported() {
        let settings = SceneSettings {
            ground_text_kerning: vec![("NIN".to_string(), 1.0)],
            ..SceneSettings::default()
        };
        assert!(matches!(
            settings.curved_text_style(),
            Err(CurvedTextError::InvalidKerningPair(_))
        ));
    }

    #[test]
    fn save_then_load_keeps_tuning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scene.ron");
        let store = ConfigStore::new(path.clone(), SceneSettings::default());
        let tuning = DebugTuning {
            animation: Some("Survey".to_string()),
            light_intensity: 6.5,
            ..DebugTuning::default()
        };

        store.save(&tuning).unwrap();
        assert_eq!(store.reload_tuning().unwrap(), tuning);
        assert_eq!(load_config(&path).tuning, tuning);
    }

    #[test]
    fn command_line_overrides_stay_out_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        let loaded = SceneSettings {
            ground_text: "ERU".to_string(),
            ..SceneSettings::default()
        };
        let store = ConfigStore::new(path.clone(), loaded)
            .with_overrides(Some("HELLO".to_string()), true);
        assert_eq!(store.settings.ground_text, "HELLO");
        assert!(store.settings.log_diagnostics);

        store.save(&DebugTuning::default()).unwrap();
        let saved = read_config(&path).unwrap();
        assert_eq!(saved.settings.ground_text, "ERU");
        assert!(!saved.settings.log_diagnostics);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_config(&dir.path().join("absent.ron")),
            PersistedConfig::default()
        );
    }

    #[test]
    fn broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        fs::write(&path, "(tuning: (exposure: \"bright\"))").unwrap();

        assert!(matches!(read_config(&path), Err(ConfigError::Parse { .. })));
        assert_eq!(load_config(&path), PersistedConfig::default());
    }
}
