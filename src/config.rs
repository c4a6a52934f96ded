//! On-disk settings and the untrusted-input boundary
//!
//! The control panel writes plain numbers and color strings into
//! `lightbox.ron`; everything is optional and everything is clamped on load.
//! Opacity and scale values are stored as percentages like the form controls
//! expose them, and converted to [0,1] factors here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::Rgba;
use crate::shadow::{DropShadowConfig, LightConfig, ShadowShape};

pub const SETTINGS_FILE: &str = "lightbox.ron";

/// Canvas backdrop behind everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CanvasBackground {
    #[default]
    ThemeDark,
    ThemeLight,
    Checker,
    White,
    Black,
    Gray,
}

impl CanvasBackground {
    pub const ALL: [CanvasBackground; 6] = [
        CanvasBackground::ThemeDark,
        CanvasBackground::ThemeLight,
        CanvasBackground::Checker,
        CanvasBackground::White,
        CanvasBackground::Black,
        CanvasBackground::Gray,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CanvasBackground::ThemeDark => "Theme (dark)",
            CanvasBackground::ThemeLight => "Theme (light)",
            CanvasBackground::Checker => "Transparent",
            CanvasBackground::White => "White",
            CanvasBackground::Black => "Black",
            CanvasBackground::Gray => "Gray",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|b| b == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Raw settings as stored on disk; every field optional via defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    // Virtual light / ground shadow
    pub light_angle: f32,
    pub light_distance: f32,
    pub object_height: f32,
    pub shadow_distance: f32,
    pub shadow_perspective: f32,
    pub object_shadow_blur: f32,
    /// Percent, 0..100
    pub object_shadow_opacity: f32,
    pub object_shadow_color: String,
    pub shadow_shape: ShadowShape,
    pub ground_shadow_enabled: bool,

    // Simple offset drop shadow
    pub drop_shadow_enabled: bool,
    pub drop_shadow_blur: f32,
    pub drop_shadow_offset_x: f32,
    pub drop_shadow_offset_y: f32,
    /// Percent, 0..100
    pub drop_shadow_opacity: f32,
    pub drop_shadow_color: String,

    // Canvas chrome
    pub canvas_background: CanvasBackground,
    pub show_grid: bool,
    pub grid_size: f32,
    pub transparency_backdrop: bool,

    // Composition background layer effects
    /// Percent, 0..100
    pub background_opacity: f32,
    pub background_blur: f32,
    /// Percent zoom multiplier on the contain fit
    pub background_scale: f32,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            light_angle: 330.0,
            light_distance: 200.0,
            object_height: 300.0,
            shadow_distance: 0.0,
            shadow_perspective: 1.0,
            object_shadow_blur: 10.0,
            object_shadow_opacity: 60.0,
            object_shadow_color: "#000000".to_string(),
            shadow_shape: ShadowShape::default(),
            ground_shadow_enabled: true,
            drop_shadow_enabled: false,
            drop_shadow_blur: 10.0,
            drop_shadow_offset_x: 5.0,
            drop_shadow_offset_y: 5.0,
            drop_shadow_opacity: 50.0,
            drop_shadow_color: "#000000".to_string(),
            canvas_background: CanvasBackground::default(),
            show_grid: false,
            grid_size: 30.0,
            transparency_backdrop: false,
            background_opacity: 100.0,
            background_blur: 0.0,
            background_scale: 100.0,
        }
    }
}

/// Validated runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub light: LightConfig,
    pub shadow_shape: ShadowShape,
    pub ground_shadow_enabled: bool,
    pub drop_shadow: DropShadowConfig,
    pub drop_shadow_enabled: bool,
    pub canvas_background: CanvasBackground,
    pub show_grid: bool,
    pub grid_size: f32,
    pub transparency_backdrop: bool,
    pub background_opacity: f32,
    pub background_blur: f32,
    pub background_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        SettingsFile::default().clamped()
    }
}

impl SettingsFile {
    /// Clamp every raw value into range; bad colors fall back to black
    pub fn clamped(&self) -> Settings {
        let color = |s: &str| Rgba::from_hex(s).unwrap_or(Rgba::BLACK);
        Settings {
            light: LightConfig {
                angle_degrees: self.light_angle.rem_euclid(360.0),
                distance: self.light_distance.clamp(10.0, 2000.0),
                object_height: self.object_height.clamp(0.0, 1000.0),
                shadow_distance: self.shadow_distance.clamp(-100.0, 500.0),
                perspective: self.shadow_perspective.clamp(0.0, 1.0),
                blur_radius: self.object_shadow_blur.clamp(0.0, 100.0),
                opacity: (self.object_shadow_opacity / 100.0).clamp(0.0, 1.0),
                color: color(&self.object_shadow_color),
            },
            shadow_shape: self.shadow_shape,
            ground_shadow_enabled: self.ground_shadow_enabled,
            drop_shadow: DropShadowConfig {
                blur_radius: self.drop_shadow_blur.clamp(0.0, 100.0),
                offset_x: self.drop_shadow_offset_x.clamp(-200.0, 200.0),
                offset_y: self.drop_shadow_offset_y.clamp(-200.0, 200.0),
                opacity: (self.drop_shadow_opacity / 100.0).clamp(0.0, 1.0),
                color: color(&self.drop_shadow_color),
            },
            drop_shadow_enabled: self.drop_shadow_enabled,
            canvas_background: self.canvas_background,
            show_grid: self.show_grid,
            grid_size: self.grid_size.clamp(5.0, 200.0),
            transparency_backdrop: self.transparency_backdrop,
            background_opacity: (self.background_opacity / 100.0).clamp(0.0, 1.0),
            background_blur: self.background_blur.clamp(0.0, 100.0),
            background_scale: (self.background_scale / 100.0).clamp(0.1, 3.0),
        }
    }
}

impl Settings {
    /// Load from a RON file; any error logs and falls back to defaults so a
    /// broken settings file never blocks startup
    pub fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(text) => match ron::from_str::<SettingsFile>(&text) {
                Ok(file) => file.clamped(),
                Err(e) => {
                    eprintln!("Bad settings file {}: {}", path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    /// Runtime nudges from the shell keep values in range
    pub fn nudge_light_angle(&mut self, delta: f32) {
        self.light.angle_degrees = (self.light.angle_degrees + delta).rem_euclid(360.0);
    }

    pub fn nudge_light_distance(&mut self, delta: f32) {
        self.light.distance = (self.light.distance + delta).clamp(10.0, 2000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let s = Settings::default();
        assert_eq!(s.light.distance, 200.0);
        assert_eq!(s.light.angle_degrees, 330.0);
        assert!((s.light.opacity - 0.6).abs() < 1e-6);
        assert!((s.drop_shadow.opacity - 0.5).abs() < 1e-6);
        assert_eq!(s.background_opacity, 1.0);
        assert_eq!(s.background_scale, 1.0);
        assert_eq!(s.grid_size, 30.0);
        assert_eq!(s.shadow_shape, ShadowShape::Elliptical);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let file = SettingsFile {
            light_distance: -50.0,
            shadow_perspective: 7.0,
            object_shadow_opacity: 250.0,
            background_scale: 900.0,
            grid_size: 1.0,
            ..Default::default()
        };
        let s = file.clamped();
        assert_eq!(s.light.distance, 10.0);
        assert_eq!(s.light.perspective, 1.0);
        assert_eq!(s.light.opacity, 1.0);
        assert_eq!(s.background_scale, 3.0);
        assert_eq!(s.grid_size, 5.0);
    }

    #[test]
    fn test_bad_color_falls_back_to_black() {
        let file = SettingsFile {
            object_shadow_color: "tomato".to_string(),
            ..Default::default()
        };
        assert_eq!(file.clamped().light.color, Rgba::BLACK);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let s: SettingsFile = ron::from_str("(light_distance: 400.0)").unwrap();
        assert_eq!(s.light_distance, 400.0);
        assert_eq!(s.light_angle, 330.0);
        let clamped = s.clamped();
        assert!((clamped.light.shadow_scale() - 1.0 / 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Settings::load(&dir.path().join("nope.ron"));
        assert_eq!(missing, Settings::default());

        let broken = dir.path().join("broken.ron");
        std::fs::write(&broken, "((((").unwrap();
        assert_eq!(Settings::load(&broken), Settings::default());
    }

    #[test]
    fn test_angle_nudge_wraps() {
        let mut s = Settings::default();
        s.nudge_light_angle(40.0);
        assert!((s.light.angle_degrees - 10.0).abs() < 1e-4);
        s.nudge_light_angle(-20.0);
        assert!((s.light.angle_degrees - 350.0).abs() < 1e-4);
    }
}
