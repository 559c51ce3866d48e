use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 設定値の検証エラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("depth range is empty: near={near} must be < far={far}")]
    DepthRange { near: f32, far: f32 },
    #[error("torso thresholds are inverted: small={small} must be < large={large}")]
    TorsoThresholds { small: f32, large: f32 },
    #[error("{name} must be within [0, 1], got {value}")]
    Fraction { name: &'static str, value: f32 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("scale clamp is inverted: min={min} must be <= max={max}")]
    ScaleClamp { min: f32, max: f32 },
    #[error("bone table entry `{0}` has no node names")]
    EmptyBoneEntry(&'static str),
    #[error("min_landmarks must be at least 25, got {0}")]
    MinLandmarks(usize),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub placer: PlacerConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub depth: DepthConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub bones: BonesConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlacerConfig {
    /// 体型から求めたスケールに掛ける倍率
    #[serde(default = "default_scale_multiplier")]
    pub scale_multiplier: f32,
    /// モデルの正面方向補正（度、Y軸回り）
    #[serde(default = "default_rotation_offset")]
    pub rotation_offset_deg: f32,
    /// 左右反転（インカメラ用）。ボーンの左右ラベルを入れ替える
    #[serde(default = "default_mirror")]
    pub mirror: bool,
    /// 体の向きからyawを求めるか
    #[serde(default)]
    pub dynamic_rotation: bool,
    /// 毎フレームスケールを追従させるか（falseなら初回のみ）
    #[serde(default)]
    pub auto_scale: bool,
    /// トラッキングが途切れてもモデルを保持するフレーム数
    #[serde(default = "default_visibility_buffer_frames")]
    pub visibility_buffer_frames: u32,
    /// 全身合わせに必要なランドマーク数
    #[serde(default = "default_min_landmarks")]
    pub min_landmarks: usize,
    /// visibility / presence の閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 均一スケールの下限
    #[serde(default = "default_minimum_model_scale")]
    pub minimum_model_scale: f32,
    #[serde(default = "default_scale_min")]
    pub scale_min: f32,
    #[serde(default = "default_scale_max")]
    pub scale_max: f32,
}

fn default_scale_multiplier() -> f32 { 1.5 }
fn default_rotation_offset() -> f32 { 180.0 }
fn default_mirror() -> bool { true }
fn default_visibility_buffer_frames() -> u32 { 10 }
fn default_min_landmarks() -> usize { 25 }
fn default_confidence_threshold() -> f32 { 0.5 }
fn default_minimum_model_scale() -> f32 { 0.6 }
fn default_scale_min() -> f32 { 0.05 }
fn default_scale_max() -> f32 { 20.0 }

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            scale_multiplier: default_scale_multiplier(),
            rotation_offset_deg: default_rotation_offset(),
            mirror: default_mirror(),
            dynamic_rotation: false,
            auto_scale: false,
            visibility_buffer_frames: default_visibility_buffer_frames(),
            min_landmarks: default_min_landmarks(),
            confidence_threshold: default_confidence_threshold(),
            minimum_model_scale: default_minimum_model_scale(),
            scale_min: default_scale_min(),
            scale_max: default_scale_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnchorConfig {
    /// 体に合わせるモデル上の高さ（バウンディングボックス下端=0, 上端=1）。襟の位置
    #[serde(default = "default_model_anchor_height")]
    pub model_anchor_height: f32,
    /// ビューポート上の基準点
    #[serde(default = "default_viewport_center")]
    pub viewport_x: f32,
    #[serde(default = "default_viewport_center")]
    pub viewport_y: f32,
    /// 鼻の中心からのずれに追従する割合
    #[serde(default = "default_face_follow")]
    pub face_follow: f32,
    /// 水平方向の固定バイアス（ビューポート単位）
    #[serde(default)]
    pub horizontal_bias: f32,
    /// フォールバック時のビューポートY
    #[serde(default = "default_fallback_viewport_y")]
    pub fallback_viewport_y: f32,
}

fn default_model_anchor_height() -> f32 { 0.84 }
fn default_viewport_center() -> f32 { 0.5 }
fn default_face_follow() -> f32 { 0.25 }
fn default_fallback_viewport_y() -> f32 { 0.55 }

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            model_anchor_height: default_model_anchor_height(),
            viewport_x: default_viewport_center(),
            viewport_y: default_viewport_center(),
            face_follow: default_face_follow(),
            horizontal_bias: 0.0,
            fallback_viewport_y: default_fallback_viewport_y(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DepthConfig {
    /// 胴体が大きく映った時の距離（メートル）
    #[serde(default = "default_depth_near")]
    pub near: f32,
    /// 胴体が小さく映った時の距離（メートル）
    #[serde(default = "default_depth_far")]
    pub far: f32,
    /// 正規化胴体高さの下側閾値（これ以下は far）
    #[serde(default = "default_torso_small")]
    pub torso_small: f32,
    /// 正規化胴体高さの上側閾値（これ以上は near）
    #[serde(default = "default_torso_large")]
    pub torso_large: f32,
    /// トラッキングなし・無効点の時の距離
    #[serde(default = "default_fallback_depth")]
    pub fallback: f32,
    /// 深度平滑化の時定数（秒）
    #[serde(default = "default_depth_time_constant")]
    pub time_constant: f32,
    /// ニアクリップからの最低マージン
    #[serde(default = "default_near_clip_margin")]
    pub near_clip_margin: f32,
    /// これより遠い点は無効扱い
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

fn default_depth_near() -> f32 { 1.2 }
fn default_depth_far() -> f32 { 3.5 }
fn default_torso_small() -> f32 { 0.10 }
fn default_torso_large() -> f32 { 0.45 }
fn default_fallback_depth() -> f32 { 2.5 }
fn default_depth_time_constant() -> f32 { 0.25 }
fn default_near_clip_margin() -> f32 { 0.05 }
fn default_max_distance() -> f32 { 1000.0 }

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            near: default_depth_near(),
            far: default_depth_far(),
            torso_small: default_torso_small(),
            torso_large: default_torso_large(),
            fallback: default_fallback_depth(),
            time_constant: default_depth_time_constant(),
            near_clip_margin: default_near_clip_margin(),
            max_distance: default_max_distance(),
        }
    }
}

/// 指数補間の速さ（1/秒）
#[derive(Debug, Deserialize, Clone)]
pub struct SmoothingConfig {
    #[serde(default = "default_rotation_rate")]
    pub rotation_rate: f32,
    #[serde(default = "default_fallback_rotation_rate")]
    pub fallback_rotation_rate: f32,
    #[serde(default = "default_bone_rate")]
    pub bone_rate: f32,
    #[serde(default = "default_scale_rate")]
    pub scale_rate: f32,
}

fn default_rotation_rate() -> f32 { 10.0 }
fn default_fallback_rotation_rate() -> f32 { 8.0 }
fn default_bone_rate() -> f32 { 15.0 }
fn default_scale_rate() -> f32 { 6.0 }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            rotation_rate: default_rotation_rate(),
            fallback_rotation_rate: default_fallback_rotation_rate(),
            bone_rate: default_bone_rate(),
            scale_rate: default_scale_rate(),
        }
    }
}

/// 読み込んだモデルの正規化（壊れたインポート対策）
#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    #[serde(default = "default_normalize_enabled")]
    pub enabled: bool,
    #[serde(default = "default_target_height")]
    pub target_height: f32,
    #[serde(default = "default_normalize_min_height")]
    pub min_height: f32,
    #[serde(default = "default_normalize_max_height")]
    pub max_height: f32,
    #[serde(default = "default_max_center_distance")]
    pub max_center_distance: f32,
}

fn default_normalize_enabled() -> bool { true }
fn default_target_height() -> f32 { 1.6 }
fn default_normalize_min_height() -> f32 { 0.3 }
fn default_normalize_max_height() -> f32 { 5.0 }
fn default_max_center_distance() -> f32 { 10.0 }

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: default_normalize_enabled(),
            target_height: default_target_height(),
            min_height: default_normalize_min_height(),
            max_height: default_normalize_max_height(),
            max_center_distance: default_max_center_distance(),
        }
    }
}

/// 部位 → ノード名の対応表（ミラー前のラベル）
#[derive(Debug, Deserialize, Clone)]
pub struct BonesConfig {
    #[serde(default = "default_left_upper_arm")]
    pub left_upper_arm: Vec<String>,
    #[serde(default = "default_left_lower_arm")]
    pub left_lower_arm: Vec<String>,
    #[serde(default = "default_right_upper_arm")]
    pub right_upper_arm: Vec<String>,
    #[serde(default = "default_right_lower_arm")]
    pub right_lower_arm: Vec<String>,
}

fn default_left_upper_arm() -> Vec<String> { vec!["L_UpperArm".to_string()] }
fn default_left_lower_arm() -> Vec<String> { vec!["L_Arm".to_string()] }
fn default_right_upper_arm() -> Vec<String> { vec!["R_UpperArm".to_string()] }
fn default_right_lower_arm() -> Vec<String> { vec!["R_Arm".to_string()] }

impl Default for BonesConfig {
    fn default() -> Self {
        Self {
            left_upper_arm: default_left_upper_arm(),
            left_lower_arm: default_left_lower_arm(),
            right_upper_arm: default_right_upper_arm(),
            right_lower_arm: default_right_lower_arm(),
        }
    }
}

/// リプレイ用カメラ
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// 垂直画角（度）
    #[serde(default = "default_fov_v")]
    pub fov_v_deg: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// カメラ位置 [x, y, z] メートル
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],
    /// カメラ回転 [rx, ry, rz] 度 (Euler XYZ)
    #[serde(default)]
    pub rotation_deg: [f32; 3],
    #[serde(default = "default_near_clip")]
    pub near_clip: f32,
    /// 1フレームの秒数（記録にdtが無い時）
    #[serde(default = "default_frame_dt")]
    pub frame_dt: f32,
}

fn default_fov_v() -> f32 { 60.0 }
fn default_width() -> u32 { 1080 }
fn default_height() -> u32 { 1920 }
fn default_camera_position() -> [f32; 3] { [0.0, 1.4, 0.0] }
fn default_near_clip() -> f32 { 0.3 }
fn default_frame_dt() -> f32 { 1.0 / 30.0 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_v_deg: default_fov_v(),
            width: default_width(),
            height: default_height(),
            position: default_camera_position(),
            rotation_deg: [0.0; 3],
            near_clip: default_near_clip(),
            frame_dt: default_frame_dt(),
        }
    }
}

fn check_fraction(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Fraction { name, value })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("config {} not used ({:#}), falling back to defaults", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.depth;
        if !(d.near < d.far) {
            return Err(ConfigError::DepthRange { near: d.near, far: d.far });
        }
        if !(d.torso_small < d.torso_large) {
            return Err(ConfigError::TorsoThresholds { small: d.torso_small, large: d.torso_large });
        }
        check_positive("depth.near", d.near)?;
        check_positive("depth.fallback", d.fallback)?;
        check_positive("depth.max_distance", d.max_distance)?;
        check_non_negative("depth.near_clip_margin", d.near_clip_margin)?;
        check_non_negative("depth.time_constant", d.time_constant)?;

        let s = &self.smoothing;
        check_positive("smoothing.rotation_rate", s.rotation_rate)?;
        check_positive("smoothing.fallback_rotation_rate", s.fallback_rotation_rate)?;
        check_positive("smoothing.bone_rate", s.bone_rate)?;
        check_positive("smoothing.scale_rate", s.scale_rate)?;

        let a = &self.anchor;
        check_fraction("anchor.model_anchor_height", a.model_anchor_height)?;
        check_fraction("anchor.viewport_x", a.viewport_x)?;
        check_fraction("anchor.viewport_y", a.viewport_y)?;
        check_fraction("anchor.face_follow", a.face_follow)?;
        check_fraction("anchor.fallback_viewport_y", a.fallback_viewport_y)?;

        let p = &self.placer;
        check_positive("placer.scale_multiplier", p.scale_multiplier)?;
        check_positive("placer.visibility_buffer_frames", p.visibility_buffer_frames as f32)?;
        check_positive("placer.minimum_model_scale", p.minimum_model_scale)?;
        check_positive("placer.scale_min", p.scale_min)?;
        check_fraction("placer.confidence_threshold", p.confidence_threshold)?;
        if p.scale_min > p.scale_max {
            return Err(ConfigError::ScaleClamp { min: p.scale_min, max: p.scale_max });
        }
        if p.min_landmarks < 25 {
            return Err(ConfigError::MinLandmarks(p.min_landmarks));
        }

        let b = &self.bones;
        let entries: [(&'static str, &Vec<String>); 4] = [
            ("left_upper_arm", &b.left_upper_arm),
            ("left_lower_arm", &b.left_lower_arm),
            ("right_upper_arm", &b.right_upper_arm),
            ("right_lower_arm", &b.right_lower_arm),
        ];
        for (name, names) in entries {
            if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                return Err(ConfigError::EmptyBoneEntry(name));
            }
        }

        check_positive("camera.fov_v_deg", self.camera.fov_v_deg)?;
        check_positive("camera.near_clip", self.camera.near_clip)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.placer.visibility_buffer_frames, 10);
        assert_eq!(config.depth.fallback, 2.5);
        assert_eq!(config.placer.minimum_model_scale, 0.6);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            [depth]
            near = 1.0
            far = 4.0

            [bones]
            left_upper_arm = ["L_UpperArm", "L_UpperArm.001"]
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.depth.near, 1.0);
        assert_eq!(config.depth.torso_small, 0.10);
        assert_eq!(config.bones.left_upper_arm.len(), 2);
        assert_eq!(config.bones.right_lower_arm, vec!["R_Arm".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_depth_rejected() {
        let mut config = Config::default();
        config.depth.near = 5.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DepthRange { near: 5.0, far: 3.5 })
        );
    }

    #[test]
    fn test_empty_bone_entry_rejected() {
        let mut config = Config::default();
        config.bones.right_upper_arm.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyBoneEntry("right_upper_arm"))
        );
    }

    #[test]
    fn test_anchor_height_out_of_range_rejected() {
        let mut config = Config::default();
        config.anchor.model_anchor_height = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Fraction { .. })));
    }

    #[test]
    fn test_negative_depth_timing_rejected() {
        let mut config = Config::default();
        config.depth.near_clip_margin = -0.1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Negative { name: "depth.near_clip_margin", value: -0.1 })
        );

        let mut config = Config::default();
        config.depth.time_constant = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { name: "depth.time_constant", .. })));

        // 0 は平滑化なし
        let mut config = Config::default();
        config.depth.time_constant = 0.0;
        config.depth.near_clip_margin = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_smoothing_rate_rejected() {
        let mut config = Config::default();
        config.smoothing.scale_rate = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "smoothing.scale_rate", value: 0.0 })
        );

        let mut config = Config::default();
        config.smoothing.bone_rate = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositive { name: "smoothing.bone_rate", .. })));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("definitely/not/here.toml");
        assert_eq!(config.placer.scale_multiplier, 1.5);
    }
}
