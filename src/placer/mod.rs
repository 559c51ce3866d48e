//! 体に服モデルを合わせる配置器
//!
//! 毎フレーム `draw` にランドマークとカメラを渡す。
//! 信頼できるポーズがあれば体に追従し、途切れたら一定フレーム保持した後、
//! カメラ正面の待機姿勢に移る。どの経路でも位置はカメラ前方の視錐台内に収める。

pub mod anchor;
pub mod bones;
pub mod diagnostics;
pub mod scale;
pub mod state;
pub mod style;

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::camera::CameraProjector;
use crate::config::Config;
use crate::landmark::LandmarkSnapshot;
use crate::model::ProxyModel;
use crate::smooth::{exp_alpha, nlerp};

pub use anchor::BodyAxes;
pub use bones::BoneBinding;
pub use diagnostics::ModelDiagnostics;
pub use state::{AnchorState, PlacementState, VisibilityBuffer};
pub use style::{PointAnnotation, PointStyle};

/// dt が無効な時に使う1フレーム
const DEFAULT_DT: f32 = 1.0 / 30.0;
/// 長い停止の後に一気に飛ばないよう dt を制限
const MAX_DT: f32 = 0.25;
const SCALE_MULTIPLIER_MIN: f32 = 0.3;
const SCALE_MULTIPLIER_MAX: f32 = 4.0;

/// 実行時に調整できるアンカー値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTuning {
    /// モデル上の合わせ位置（バウンディングボックス高さの割合）
    pub model_anchor_height: f32,
    pub scale_multiplier: f32,
}

impl AnchorTuning {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_anchor_height: config.anchor.model_anchor_height.clamp(0.0, 1.0),
            scale_multiplier: config
                .placer
                .scale_multiplier
                .clamp(SCALE_MULTIPLIER_MIN, SCALE_MULTIPLIER_MAX),
        }
    }
}

fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt.min(MAX_DT)
    } else {
        DEFAULT_DT
    }
}

/// 体にモデルを固定する配置器
///
/// モデルの変換はこの配置器だけが書き換える。
pub struct BodyAnchoredPlacer<M: ProxyModel> {
    config: Config,
    tuning: AnchorTuning,
    model: Option<M>,
    bones: BoneBinding<M::Node>,
    anchor: AnchorState,
    state: PlacementState,
    cloth_visible: bool,
    /// 最後に合わせたワールドアンカー
    anchor_point: Option<Point3<f32>>,
    style: PointStyle,
    annotation: Option<Box<dyn PointAnnotation>>,
}

impl<M: ProxyModel> BodyAnchoredPlacer<M> {
    pub fn new(config: Config) -> Self {
        let tuning = AnchorTuning::from_config(&config);
        let anchor = AnchorState::new(&config);
        Self {
            config,
            tuning,
            model: None,
            bones: BoneBinding::default(),
            anchor,
            state: PlacementState::NoModel,
            cloth_visible: true,
            anchor_point: None,
            style: PointStyle::default(),
            annotation: None,
        }
    }

    /// 追従点マーカーを接続する。現在のスタイルをすぐ反映
    pub fn with_annotation(mut self, mut sink: Box<dyn PointAnnotation>) -> Self {
        self.style.apply(&mut *sink);
        self.annotation = Some(sink);
        self
    }

    /// モデルを装着する
    ///
    /// 前のモデルは非アクティブにして返す。カメラがあればすぐ待機姿勢に置く。
    pub fn set_model(&mut self, mut model: M, camera: Option<&dyn CameraProjector>) -> Option<M> {
        let previous = self.detach();

        model.set_active(self.cloth_visible);
        scale::recenter(&mut model);
        if let Some(report) = scale::normalize_on_set(&mut model, &self.config.normalize) {
            if report.recentered || report.rescaled.is_some() {
                log::info!(
                    "normalized model {}: height={:.3} recentered={} rescale={:?}",
                    model.name(),
                    report.height,
                    report.recentered,
                    report.rescaled
                );
            }
        }

        self.anchor = AnchorState::new(&self.config);
        self.anchor.rest_size = scale::rest_size(&model);
        self.anchor.base_offset = model.transform().position;

        let mut t = model.transform();
        t.rotation = UnitQuaternion::from_axis_angle(
            &Vector3::y_axis(),
            self.config.placer.rotation_offset_deg.to_radians(),
        );
        model.set_transform(t);

        self.bones = BoneBinding::bind(&model, &self.config.bones, self.config.placer.mirror);
        let missing = self.bones.missing();
        if !missing.is_empty() && self.anchor.warnings.missing_bones.fire() {
            let labels: Vec<&str> = missing.iter().map(|s| s.label()).collect();
            log::warn!("model {} has no bones for {:?}, those arms keep their rest pose", model.name(), labels);
        }

        let diagnostics = ModelDiagnostics::collect(&model);
        if diagnostics.is_invisible() {
            log::warn!("attached model renders nothing: {}", diagnostics);
        } else {
            log::info!("attached {}", diagnostics);
        }
        log::info!(
            "anchor tuning: model_anchor_height={:.2} scale_multiplier={:.2} mirror={}",
            self.tuning.model_anchor_height,
            self.tuning.scale_multiplier,
            self.config.placer.mirror
        );

        self.model = Some(model);
        self.state = PlacementState::CameraFallback;
        if self.cloth_visible {
            if let Some(camera) = camera {
                self.place_fallback(camera, None);
            }
        }
        previous
    }

    /// モデルを外して返す
    pub fn clear_model(&mut self) -> Option<M> {
        self.detach()
    }

    fn detach(&mut self) -> Option<M> {
        let mut previous = self.model.take()?;
        log::info!("detaching model {}", previous.name());
        previous.set_active(false);
        self.bones = BoneBinding::default();
        self.anchor = AnchorState::new(&self.config);
        self.anchor_point = None;
        self.state = PlacementState::NoModel;
        Some(previous)
    }

    /// 1フレーム分の更新
    ///
    /// - `snapshot`: 今フレームのランドマーク（無ければ None）
    /// - `camera`: 無ければ何もしない
    /// - `dt`: 前フレームからの秒数
    pub fn draw(&mut self, snapshot: Option<&LandmarkSnapshot>, camera: Option<&dyn CameraProjector>, dt: f32) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        if !self.cloth_visible {
            model.set_active(false);
            return;
        }
        model.set_active(true);
        let Some(camera) = camera else {
            return;
        };
        let dt = sanitize_dt(dt);

        let tracked = snapshot.and_then(|s| self.tracked_body(s).map(|axes| (s, axes)));
        if let Some((snapshot, axes)) = tracked {
            if self.place_tracked(snapshot, &axes, camera, dt) {
                self.anchor.visibility.refresh();
                self.state = PlacementState::BodyTracked;
                return;
            }
        }

        if self.state == PlacementState::BodyTracked {
            if self.anchor.visibility.tick() {
                log::debug!("pose lost, holding ({} frames left)", self.anchor.visibility.remaining());
                return;
            }
            log::debug!("pose lost beyond buffer, switching to camera fallback");
        }
        self.place_fallback(camera, Some(dt));
        self.state = PlacementState::CameraFallback;
    }

    /// 体に合わせられるスナップショットなら胴体の軸を返す
    fn tracked_body(&mut self, snapshot: &LandmarkSnapshot) -> Option<BodyAxes> {
        if snapshot.is_empty() {
            return None;
        }
        let placer = &self.config.placer;
        if snapshot.len() < placer.min_landmarks {
            if self.anchor.warnings.insufficient_landmarks.fire() {
                log::warn!(
                    "insufficient pose landmarks ({} < {}), using camera-front fallback",
                    snapshot.len(),
                    placer.min_landmarks
                );
            }
            return None;
        }
        if !snapshot.is_reliable(placer.confidence_threshold) {
            log::debug!("nose or shoulders not reliable");
            return None;
        }
        let axes = BodyAxes::from_snapshot(snapshot, placer.confidence_threshold);
        if axes.is_none() {
            log::debug!("hips missing or torso collapsed");
        }
        axes
    }

    /// 体追従の配置。合わせられなければ false（変換は元のまま）
    fn place_tracked(
        &mut self,
        snapshot: &LandmarkSnapshot,
        axes: &BodyAxes,
        camera: &dyn CameraProjector,
        dt: f32,
    ) -> bool {
        let Self { config, tuning, model, bones, anchor: state, anchor_point, .. } = self;
        let Some(model) = model.as_mut() else {
            return false;
        };
        let threshold = config.placer.confidence_threshold;

        let previous = model.transform();
        let mut t = previous;

        // 1. 向き
        let yaw = if config.placer.dynamic_rotation {
            anchor::body_yaw(axes, camera).unwrap_or(0.0)
        } else {
            0.0
        };
        if let Some(target) = anchor::facing_rotation(camera, yaw + config.placer.rotation_offset_deg.to_radians()) {
            t.rotation = nlerp(&t.rotation, &target, exp_alpha(config.smoothing.rotation_rate, dt));
        }

        // 2. 深度とアンカー
        let Some(torso) = anchor::normalized_torso(axes, snapshot) else {
            return false;
        };
        let depth = state.depth.apply(anchor::target_depth(torso, &config.depth), dt);
        let viewport = anchor::viewport_anchor(snapshot, &config.anchor, threshold);
        let raw = camera.viewport_to_world(&Vector3::new(viewport.x, viewport.y, depth));
        let Some(guarded) = anchor::ensure_in_front(&raw, camera, &config.depth) else {
            return false;
        };
        if guarded.replaced && state.warnings.anchor_fallback.fire() {
            log::warn!("body anchor invalid or behind camera, clamped in front of camera");
        }

        // 3. スケール
        let anchor_depth = camera.world_to_viewport(&guarded.point).z;
        let placer = &config.placer;
        let fitted = scale::projected_body_size(snapshot, camera, anchor_depth, threshold).and_then(|body| {
            scale::fit_scale(&body, &state.rest_size, tuning.scale_multiplier, placer.scale_min, placer.scale_max)
        });
        if let Some(fit) = fitted {
            if !state.scaled {
                t.scale = Vector3::repeat(fit);
                state.scaled = true;
                state.base_offset = guarded.point.coords;
                log::debug!("fitted model scale {:.3} at depth {:.2}", fit, anchor_depth);
            } else if placer.auto_scale {
                let current = t.uniform_scale();
                let alpha = exp_alpha(config.smoothing.scale_rate, dt);
                t.scale = Vector3::repeat(current + (fit - current) * alpha);
            }
        }
        t.scale = scale::floor_scale(t.scale, placer.minimum_model_scale);

        // 4. 位置
        t.position = guarded.point.coords;
        model.set_transform(t);
        scale::align_anchor(model, &guarded.point, tuning.model_anchor_height);

        if !model.transform().is_finite() {
            log::debug!("placement produced a non-finite transform, restoring previous");
            model.set_transform(previous);
            return false;
        }
        // 配置が確定したフレームだけ腕を動かす
        bones::orient_segments(model, bones, snapshot, camera, threshold, exp_alpha(config.smoothing.bone_rate, dt));
        *anchor_point = Some(guarded.point);
        true
    }

    /// カメラ正面の待機姿勢。`dt` が None なら回転も即時
    fn place_fallback(&mut self, camera: &dyn CameraProjector, dt: Option<f32>) {
        let Self { config, tuning, model, anchor_point, .. } = self;
        let Some(model) = model.as_mut() else {
            return;
        };
        let depth = anchor::fallback_depth(camera, &config.depth);
        let raw = camera.viewport_to_world(&Vector3::new(0.5, config.anchor.fallback_viewport_y, depth));
        let Some(guarded) = anchor::ensure_in_front(&raw, camera, &config.depth) else {
            log::debug!("camera fallback point is not finite, keeping pose");
            return;
        };

        let previous = model.transform();
        let mut t = previous;
        if let Some(target) = anchor::facing_rotation(camera, config.placer.rotation_offset_deg.to_radians()) {
            let alpha = dt.map_or(1.0, |dt| exp_alpha(config.smoothing.fallback_rotation_rate, dt));
            t.rotation = nlerp(&t.rotation, &target, alpha);
        }
        t.scale = scale::floor_scale(t.scale, config.placer.minimum_model_scale);
        t.position = guarded.point.coords;
        model.set_transform(t);
        scale::align_anchor(model, &guarded.point, tuning.model_anchor_height);

        if !model.transform().is_finite() {
            model.set_transform(previous);
            return;
        }
        *anchor_point = Some(guarded.point);
    }

    // --- 表示 ---

    /// 非表示ならモデルを止める。非表示から戻した時だけ、カメラがあればすぐ待機姿勢へ
    pub fn set_cloth_visible(&mut self, visible: bool, camera: Option<&dyn CameraProjector>) {
        let reshown = visible && !self.cloth_visible;
        self.cloth_visible = visible;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        model.set_active(visible);
        if !reshown {
            return;
        }
        self.anchor.visibility.clear();
        self.state = PlacementState::CameraFallback;
        if let Some(camera) = camera {
            self.place_fallback(camera, None);
        }
    }

    /// 表示を反転して新しい状態を返す
    pub fn toggle_cloth_visible(&mut self, camera: Option<&dyn CameraProjector>) -> bool {
        let visible = !self.cloth_visible;
        self.set_cloth_visible(visible, camera);
        visible
    }

    pub fn is_cloth_visible(&self) -> bool {
        self.cloth_visible
    }

    pub fn set_color(&mut self, rgb: u32) {
        self.style.color = rgb & 0x00FF_FFFF;
        if let Some(sink) = self.annotation.as_mut() {
            sink.set_color(self.style.color);
        }
    }

    pub fn set_radius(&mut self, radius: f32) {
        if !radius.is_finite() || radius < 0.0 {
            return;
        }
        self.style.radius = radius;
        if let Some(sink) = self.annotation.as_mut() {
            sink.set_radius(radius);
        }
    }

    pub fn point_style(&self) -> PointStyle {
        self.style
    }

    // --- 実行時チューニング ---

    pub fn tuning(&self) -> AnchorTuning {
        self.tuning
    }

    /// 倍率を変え、今のモデルにも比で即反映する
    pub fn set_scale_multiplier(&mut self, multiplier: f32) {
        if !multiplier.is_finite() {
            return;
        }
        let old = self.tuning.scale_multiplier;
        let new = multiplier.clamp(SCALE_MULTIPLIER_MIN, SCALE_MULTIPLIER_MAX);
        self.tuning.scale_multiplier = new;
        if let Some(model) = self.model.as_mut() {
            if old > 1e-6 && (new - old).abs() > 1e-6 {
                let mut t = model.transform();
                t.scale = scale::floor_scale(t.scale * (new / old), self.config.placer.minimum_model_scale);
                model.set_transform(t);
                if let Some(point) = self.anchor_point {
                    scale::align_anchor(model, &point, self.tuning.model_anchor_height);
                }
            }
        }
        self.mark_tuning_changed();
    }

    pub fn set_anchor_height(&mut self, height: f32) {
        if !height.is_finite() {
            return;
        }
        self.tuning.model_anchor_height = height.clamp(0.0, 1.0);
        if let (Some(model), Some(point)) = (self.model.as_mut(), self.anchor_point) {
            scale::align_anchor(model, &point, self.tuning.model_anchor_height);
        }
        self.mark_tuning_changed();
    }

    /// 設定ファイルの値に戻す
    pub fn reset_tuning(&mut self) {
        let defaults = AnchorTuning::from_config(&self.config);
        self.set_scale_multiplier(defaults.scale_multiplier);
        self.set_anchor_height(defaults.model_anchor_height);
    }

    /// 次の追従フレームでスケールを測り直す
    fn mark_tuning_changed(&mut self) {
        self.anchor.scaled = false;
        self.anchor.warnings.anchor_fallback.reset();
        log::info!(
            "anchor tuning changed: model_anchor_height={:.2} scale_multiplier={:.2}",
            self.tuning.model_anchor_height,
            self.tuning.scale_multiplier
        );
    }

    // --- 参照 ---

    /// 非表示・未装着は `NoModel`
    pub fn state(&self) -> PlacementState {
        match self.model {
            Some(_) if self.cloth_visible => self.state,
            _ => PlacementState::NoModel,
        }
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn bone_binding(&self) -> &BoneBinding<M::Node> {
        &self.bones
    }

    pub fn anchor_state(&self) -> &AnchorState {
        &self.anchor
    }

    pub fn anchor_point(&self) -> Option<Point3<f32>> {
        self.anchor_point
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
