use nalgebra::{Point3, Vector3};

use crate::camera::CameraProjector;
use crate::config::NormalizeConfig;
use crate::landmark::{LandmarkIndex, LandmarkSnapshot};
use crate::model::ProxyModel;

const MIN_EXTENT: f32 = 1e-3;

/// 指定深度でのワールド空間の体の寸法
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySize {
    /// 肩幅
    pub width: f32,
    /// 肩中心〜腰中心
    pub height: f32,
}

/// 両肩・両腰をビューポート経由で `depth` の平面に投影して寸法を測る
pub fn projected_body_size(
    snapshot: &LandmarkSnapshot,
    camera: &dyn CameraProjector,
    depth: f32,
    threshold: f32,
) -> Option<BodySize> {
    let world = |idx: LandmarkIndex| {
        snapshot
            .viewport(idx, threshold)
            .map(|v| camera.viewport_to_world(&Vector3::new(v.x, v.y, depth)))
    };
    let ls = world(LandmarkIndex::LeftShoulder)?;
    let rs = world(LandmarkIndex::RightShoulder)?;
    let lh = world(LandmarkIndex::LeftHip)?;
    let rh = world(LandmarkIndex::RightHip)?;

    let width = (ls - rs).norm();
    let height = (nalgebra::center(&ls, &rs) - nalgebra::center(&lh, &rh)).norm();
    if !width.is_finite() || !height.is_finite() || width < MIN_EXTENT || height < MIN_EXTENT {
        return None;
    }
    Some(BodySize { width, height })
}

/// 体の寸法とモデルの基準寸法から均一スケールを求める
///
/// 幅・高さ・奥行き（高さ比で推定）の比の平均に倍率を掛け、[min, max] にクランプ。
pub fn fit_scale(body: &BodySize, rest_size: &Vector3<f32>, multiplier: f32, min: f32, max: f32) -> Option<f32> {
    if !(rest_size.x > MIN_EXTENT) || !(rest_size.y > MIN_EXTENT) {
        return None;
    }
    let sx = body.width / rest_size.x;
    let sy = body.height / rest_size.y;
    let sz = if rest_size.z > MIN_EXTENT { sy * (rest_size.z / rest_size.y) } else { 1.0 };
    let scale = (sx + sy + sz) / 3.0 * multiplier;
    scale.is_finite().then(|| scale.max(min).min(max))
}

/// 均一スケールの下限を適用
pub fn floor_scale(scale: Vector3<f32>, minimum: f32) -> Vector3<f32> {
    let current = scale.x.max(scale.y).max(scale.z);
    if current.is_finite() && current >= minimum {
        scale
    } else {
        Vector3::repeat(minimum)
    }
}

/// 等倍時のモデル寸法
pub fn rest_size<M: ProxyModel>(model: &M) -> Vector3<f32> {
    let Some(bounds) = model.world_bounds() else {
        return Vector3::zeros();
    };
    let scale = model.transform().uniform_scale();
    if !(scale > 0.0) || !bounds.is_finite() {
        return Vector3::zeros();
    }
    bounds.size() / scale
}

/// モデル上のアンカー点（バウンディングボックスの高さ割合）を `target` に合わせる
///
/// バウンディングボックスが無ければ false。
pub fn align_anchor<M: ProxyModel>(model: &mut M, target: &Point3<f32>, height_fraction: f32) -> bool {
    let Some(bounds) = model.world_bounds() else {
        return false;
    };
    let delta = target - bounds.anchor_point(height_fraction);
    if !delta.iter().all(|v| v.is_finite()) {
        return false;
    }
    let mut t = model.transform();
    t.position += delta;
    model.set_transform(t);
    true
}

/// バウンディングボックス中心をモデルの原点位置に揃える
pub fn recenter<M: ProxyModel>(model: &mut M) {
    let Some(bounds) = model.world_bounds() else {
        return;
    };
    let mut t = model.transform();
    let offset = t.position - bounds.center().coords;
    if offset.iter().all(|v| v.is_finite()) {
        t.position += offset;
        model.set_transform(t);
    }
}

fn move_bottom_center_to_origin<M: ProxyModel>(model: &mut M) {
    align_anchor(model, &Point3::origin(), 0.0);
}

/// 正規化で行った補正
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeReport {
    pub recentered: bool,
    /// 掛けたスケール係数（高さ補正をしなければ None）
    pub rescaled: Option<f32>,
    pub height: f32,
}

/// 壊れたインポート対策: 原点から遠すぎる・大きすぎる・小さすぎるモデルを直す
pub fn normalize_on_set<M: ProxyModel>(model: &mut M, config: &NormalizeConfig) -> Option<NormalizeReport> {
    if !config.enabled {
        return None;
    }
    let bounds = model.world_bounds()?;
    if !bounds.is_finite() {
        return None;
    }

    let center = bounds.center().coords;
    let limit = config.max_center_distance;
    let far = center.x.abs() > limit || center.z.abs() > limit || center.norm() > limit * 1.5;
    if far {
        move_bottom_center_to_origin(model);
    }

    let height = bounds.size().y;
    let mut rescaled = None;
    if height.is_finite() && height > 1e-4 && (height < config.min_height || height > config.max_height) {
        let factor = (config.target_height / height).clamp(0.01, 500.0);
        let mut t = model.transform();
        t.scale *= factor;
        model.set_transform(t);
        move_bottom_center_to_origin(model);
        rescaled = Some(factor);
    }

    Some(NormalizeReport { recentered: far, rescaled, height })
}
