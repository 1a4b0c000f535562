pub mod app;
pub mod camera;
pub mod cli;
pub mod config;
pub mod curved_text;
pub mod environment;
pub mod fox;
pub mod stage;
pub mod ui;

use bevy::math::Vec3;
use std::time::Duration;

pub const CONFIG_PATH_DEFAULT: &str = "config/scene.ron";
pub const GROUND_TEXT_DEFAULT: &str = "SUMMONING ERU";
pub const CLEAR_COLOR_HEX: &str = "#211d20";

pub const CAMERA_START: Vec3 = Vec3::new(6.0, 4.0, 8.0);
pub const CAMERA_FOV_DEG: f32 = 35.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;

pub const SHADOW_FAR: f32 = 15.0;
pub const SHADOW_MAP_SIZE: usize = 1024;
// Lux per scene-unit light intensity.
pub const LIGHT_LUX_PER_UNIT: f32 = 2_500.0;

pub const GROUND_TEXT_LIFT: f32 = 0.011;
pub const ANIMATION_CROSSFADE: Duration = Duration::from_millis(200);
