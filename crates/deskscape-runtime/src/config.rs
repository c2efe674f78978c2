use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deskscape_scene::Transform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "deskscape.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Character,
    Room,
    ComputerCase,
    Monitor,
    MonitorTwo,
    GamingChair,
    Mouse,
    Keyboard,
    Floor,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Character => "character",
            AssetKind::Room => "room",
            AssetKind::ComputerCase => "computer case",
            AssetKind::Monitor => "monitor",
            AssetKind::MonitorTwo => "monitor two",
            AssetKind::GamingChair => "gaming chair",
            AssetKind::Mouse => "mouse",
            AssetKind::Keyboard => "keyboard",
            AssetKind::Floor => "floor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub kind: AssetKind,
    /// Relative to `SceneConfig::asset_root`.
    pub path: PathBuf,
    pub scale: [f32; 3],
    pub position: [f32; 3],
    /// Euler angles in radians.
    #[serde(default)]
    pub rotation: [f32; 3],
}

impl AssetSpec {
    fn new(kind: AssetKind, path: &str, scale: f32, position: [f32; 3], rot_y: f32) -> Self {
        Self {
            kind,
            path: PathBuf::from(path),
            scale: [scale; 3],
            position,
            rotation: [0.0, rot_y, 0.0],
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_scale_position_euler(
            Vec3::from_array(self.scale),
            Vec3::from_array(self.position),
            Vec3::from_array(self.rotation),
        )
    }
}

const MONITOR_PATH: &str = "office_monitor__workstation_monitor/scene.gltf";

pub fn default_assets() -> Vec<AssetSpec> {
    vec![
        AssetSpec::new(AssetKind::Character, "Typing.glb", 0.05, [-1.7, -3.2, 2.3], FRAC_PI_2),
        AssetSpec::new(AssetKind::Room, "office_table/scene.gltf", 0.07, [0.0, 0.0, 0.0], FRAC_PI_2),
        AssetSpec::new(
            AssetKind::ComputerCase,
            "computer_case/scene.gltf",
            0.5,
            [4.0, 0.2, 5.5],
            -FRAC_PI_2,
        ),
        AssetSpec::new(AssetKind::Monitor, MONITOR_PATH, 0.005, [4.0, 0.4, 2.0], -PI),
        AssetSpec::new(AssetKind::MonitorTwo, MONITOR_PATH, 0.005, [3.5, 0.4, -2.3], -PI / 1.1),
        AssetSpec::new(
            AssetKind::GamingChair,
            "chair_gamer_free_model_by_oscar_creativo/scene.gltf",
            5.0,
            [-1.7, -3.5, 2.3],
            FRAC_PI_2,
        ),
        AssetSpec::new(
            AssetKind::Mouse,
            "mouse_-_razer_deathadder/scene.gltf",
            0.6,
            [1.4, 0.13, 3.9],
            -FRAC_PI_2,
        ),
        AssetSpec::new(AssetKind::Keyboard, "pc_keyboard/scene.gltf", 5.0, [1.4, -0.4, 2.3], -FRAC_PI_2),
        AssetSpec::new(
            AssetKind::Floor,
            "seamless__floor_tiled_texture_v/scene.gltf",
            5.0,
            [1.4, -3.2, 2.3],
            -FRAC_PI_2,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    /// World units per frame.
    pub move_speed: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            fov_y_deg: 50.0,
            near: 0.1,
            far: 2000.0,
            position: [15.0, 5.0, 8.0],
            look_at: [0.0, 0.0, -1.5],
            move_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsSection {
    pub target: [f32; 3],
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
}

impl Default for ControlsSection {
    fn default() -> Self {
        Self {
            target: [-2.0, 7.0, -1.5],
            enable_damping: true,
            damping_factor: 0.25,
            enable_zoom: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsSection {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

impl Default for LightsSection {
    fn default() -> Self {
        Self {
            ambient_color: 0xffffff,
            ambient_intensity: 3.0,
            directional_color: 0xffffff,
            directional_intensity: 1.0,
            directional_position: [5.0, 10.0, 7.5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSection {
    /// Added to the screen's world position to get the camera destination.
    pub offset: [f32; 3],
    pub duration_secs: f32,
}

impl Default for ZoomSection {
    fn default() -> Self {
        Self {
            offset: [-6.0, 2.0, -2.0],
            duration_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    pub width: f32,
    pub height: f32,
    /// Local to the monitor screen node.
    pub position: [f32; 3],
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSection {
    /// Relative to the asset root.
    pub image: PathBuf,
    pub image_plane: PlaneConfig,
    pub button_plane: PlaneConfig,
}

impl Default for ScreenSection {
    fn default() -> Self {
        Self {
            image: PathBuf::from("myImage.jpg"),
            image_plane: PlaneConfig {
                width: 55.0,
                height: 55.0,
                position: [0.0, 0.4, 0.05],
                color: 0xffffff,
            },
            button_plane: PlaneConfig {
                width: 55.0,
                height: 55.0,
                position: [0.0, 0.3, 0.06],
                color: 0x00ff00,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// `0xRRGGBB`, sRGB.
    pub background: u32,
    pub asset_root: PathBuf,
    pub camera: CameraSection,
    pub controls: ControlsSection,
    pub lights: LightsSection,
    pub zoom: ZoomSection,
    pub screen: ScreenSection,
    pub assets: Vec<AssetSpec>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: 0xaaaaaa,
            asset_root: PathBuf::from("assets"),
            camera: CameraSection::default(),
            controls: ControlsSection::default(),
            lights: LightsSection::default(),
            zoom: ZoomSection::default(),
            screen: ScreenSection::default(),
            assets: default_assets(),
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse scene config")
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.asset_root.join(relative)
    }

    pub fn asset(&self, kind: AssetKind) -> Option<&AssetSpec> {
        self.assets.iter().find(|a| a.kind == kind)
    }
}
