//! Viewer configuration loaded from JSON.
//!
//! Every section falls back to its defaults when omitted, so an empty `{}`
//! file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "archviz.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// sRGB colour written as `"#rrggbb"` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    /// Linear-light RGB, the space the shaders light in.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }

    pub fn to_linear_rgba(self) -> [f32; 4] {
        let [r, g, b] = self.to_linear();
        [r, g, b, 1.0]
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let digits = value.strip_prefix('#').unwrap_or(&value);
        if digits.len() != 6 {
            return Err(format!("expected #rrggbb colour, got '{value}'"));
        }
        let hex = u32::from_str_radix(digits, 16)
            .map_err(|_| format!("expected #rrggbb colour, got '{value}'"))?;
        Ok(Self::from_hex(hex))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub assets: AssetPaths,
    pub model: ModelPlacement,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lighting: LightingConfig,
    pub ground: GroundConfig,
    pub background_color: Color,
    pub presentation: PresentationConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetPaths::default(),
            model: ModelPlacement::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lighting: LightingConfig::default(),
            ground: GroundConfig::default(),
            background_color: Color::from_hex(0xe6e6e6),
            presentation: PresentationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "archviz".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Files the loader reads. Relative paths resolve against the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub environment: PathBuf,
    pub model: PathBuf,
    pub background: Option<PathBuf>,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            environment: PathBuf::from("assets/MR_INT-005_WhiteNeons_NAD.hdr"),
            model: PathBuf::from("assets/modelo3d.glb"),
            background: Some(PathBuf::from("assets/vignette.jpg")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPlacement {
    pub position: [f32; 3],
    /// Euler angles in degrees, applied in X, Y, Z order.
    pub rotation_deg: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            position: [-20.0, -1470.0, 90.0],
            rotation_deg: [-90.0, 0.0, 22.5],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Move the camera back along its view direction to fit the model once loaded.
    pub frame_model: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 1.0,
            far: 3000.0,
            position: [-186.518_65, 103.298_57, -115.842_45],
            target: [0.0, 0.0, 0.0],
            frame_model: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Multipliers on the drag and wheel rates.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    /// `None` leaves dolly-out unbounded.
    pub max_distance: Option<f32>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub hemisphere: HemisphereLightConfig,
    pub directional: DirectionalLightConfig,
    pub environment_intensity: f32,
    pub exposure: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hemisphere: HemisphereLightConfig::default(),
            directional: DirectionalLightConfig::default(),
            environment_intensity: 1.0,
            exposure: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HemisphereLightConfig {
    pub sky_color: Color,
    pub ground_color: Color,
    pub intensity: f32,
}

impl Default for HemisphereLightConfig {
    fn default() -> Self {
        Self {
            sky_color: Color::from_hex(0xffffff),
            ground_color: Color::from_hex(0x444444),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: Color,
    pub intensity: f32,
    /// The light shines from here towards the origin.
    pub position: [f32; 3],
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0xffffff),
            intensity: 1.0,
            position: [10.0, 20.0, 15.0],
            cast_shadow: true,
            shadow: ShadowConfig::default(),
        }
    }
}

/// Orthographic shadow camera of the directional light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 1024,
            near: 0.5,
            far: 50.0,
            left: -90.0,
            right: 50.0,
            top: 50.0,
            bottom: -50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    pub enabled: bool,
    pub size: f32,
    pub height: f32,
    pub color: Color,
    pub receive_shadow: bool,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 1000.0,
            height: -1.0,
            color: Color::from_hex(0xe6e6e6),
            receive_shadow: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipStyle {
    #[serde(rename = "image+caption")]
    ImageCaption,
    #[serde(rename = "caption-only")]
    CaptionOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipAnchor {
    #[serde(rename = "cursor")]
    Cursor,
    #[serde(rename = "fixed-corner")]
    FixedCorner,
}

/// Per-deployment overlay choices. None of these affect picking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub tooltip_style: TooltipStyle,
    pub tooltip_anchor: TooltipAnchor,
    pub show_title_overlay: bool,
    pub title: String,
    pub caption: String,
    pub tooltip_image: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    /// Pixel margin between the pointer and the tooltip for the `cursor` anchor.
    pub cursor_offset_px: [f32; 2],
    /// Tooltip position for the `fixed-corner` anchor, in pixels from the top left.
    pub corner_position_px: [f32; 2],
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            tooltip_style: TooltipStyle::CaptionOnly,
            tooltip_anchor: TooltipAnchor::Cursor,
            show_title_overlay: false,
            title: String::new(),
            caption: "Building".to_string(),
            tooltip_image: None,
            logo: None,
            cursor_offset_px: [10.0, 10.0],
            corner_position_px: [20.0, 20.0],
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ViewerConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Json {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given; otherwise the default path, falling back to
    /// built-in defaults when that file does not exist.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_file(default_path)
                } else {
                    log::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        if !(camera.fov_deg > 0.0 && camera.fov_deg < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_deg must be in (0, 180), got {}",
                camera.fov_deg
            )));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far, got near={} far={}",
                camera.near, camera.far
            )));
        }
        let controls = &self.controls;
        let max_distance = controls.max_distance.unwrap_or(f32::INFINITY);
        if controls.min_distance < 0.0 || controls.min_distance > max_distance {
            return Err(ConfigError::Invalid(format!(
                "controls distance range is empty: [{}, {}]",
                controls.min_distance, max_distance
            )));
        }
        let shadow = &self.lighting.directional.shadow;
        if shadow.map_size == 0 || shadow.map_size > 8192 {
            return Err(ConfigError::Invalid(format!(
                "shadow.map_size must be in 1..=8192, got {}",
                shadow.map_size
            )));
        }
        if shadow.near >= shadow.far || shadow.left >= shadow.right || shadow.bottom >= shadow.top
        {
            return Err(ConfigError::Invalid(
                "shadow camera frustum is empty".to_string(),
            ));
        }
        if self.model.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "model.scale must be finite and non-zero, got {:?}",
                self.model.scale
            )));
        }
        let presentation = &self.presentation;
        if presentation.caption.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "presentation.caption must not be empty".to_string(),
            ));
        }
        if presentation.tooltip_style == TooltipStyle::ImageCaption
            && presentation.tooltip_image.is_none()
        {
            return Err(ConfigError::Invalid(
                "tooltip_style \"image+caption\" needs presentation.tooltip_image".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: ViewerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn presentation_options_use_kebab_names() {
        let json = r#"{
            "presentation": {
                "tooltip_style": "image+caption",
                "tooltip_anchor": "fixed-corner",
                "show_title_overlay": true,
                "tooltip_image": "assets/tooltip.png"
            }
        }"#;
        let config: ViewerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.presentation.tooltip_style, TooltipStyle::ImageCaption);
        assert_eq!(config.presentation.tooltip_anchor, TooltipAnchor::FixedCorner);
        assert!(config.presentation.show_title_overlay);
        assert_eq!(config.presentation.caption, "Building");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_tooltip_style_is_rejected() {
        let json = r#"{ "presentation": { "tooltip_style": "balloon" } }"#;
        assert!(serde_json::from_str::<ViewerConfig>(json).is_err());
    }

    #[test]
    fn image_caption_without_image_is_invalid() {
        let mut config = ViewerConfig::default();
        config.presentation.tooltip_style = TooltipStyle::ImageCaption;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn blank_caption_is_invalid() {
        for caption in ["", "   \t"] {
            let mut config = ViewerConfig::default();
            config.presentation.caption = caption.to_string();
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn default_placement_stands_the_model_upright() {
        let placement = ModelPlacement::default();
        assert_eq!(placement.position, [-20.0, -1470.0, 90.0]);
        assert_eq!(placement.rotation_deg, [-90.0, 0.0, 22.5]);
    }

    #[test]
    fn inverted_clip_planes_are_invalid() {
        let mut config = ViewerConfig::default();
        config.camera.near = 10.0;
        config.camera.far = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn color_parses_and_prints_hex() {
        let color = Color::try_from("#e6E6e6".to_string()).unwrap();
        assert_eq!(color, Color::from_hex(0xe6e6e6));
        assert_eq!(String::from(color), "#e6e6e6");
        assert!(Color::try_from("#fff".to_string()).is_err());
        assert!(Color::try_from("zzzzzz".to_string()).is_err());
    }

    #[test]
    fn color_linear_endpoints() {
        assert_eq!(Color::from_hex(0x000000).to_linear(), [0.0, 0.0, 0.0]);
        let white = Color::from_hex(0xffffff).to_linear();
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
    }

    #[test]
    fn load_from_file_reports_path_on_missing_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("archviz_missing_{}.json", std::process::id()));
        match ViewerConfig::load_from_file(&path) {
            Err(ConfigError::Io { path: reported, .. }) => {
                assert!(reported.contains("archviz_missing_"))
            }
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file_round_trips_written_config() {
        let mut config = ViewerConfig::default();
        config.window.title = "Tower".to_string();
        config.presentation.tooltip_anchor = TooltipAnchor::FixedCorner;

        let mut path = std::env::temp_dir();
        path.push(format!("archviz_config_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = ViewerConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.window.title, "Tower");
        assert_eq!(loaded.presentation.tooltip_anchor, TooltipAnchor::FixedCorner);
    }
}
