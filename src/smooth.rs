use nalgebra::{Quaternion, UnitQuaternion};

/// フレームレートに依存しない指数補間係数
///
/// rate は 1/秒。`1 - exp(-rate * dt)` で 0..1 に収まる。
pub fn exp_alpha(rate: f32, dt: f32) -> f32 {
    if !(rate > 0.0) || !(dt > 0.0) {
        return 0.0;
    }
    (1.0 - (-rate * dt).exp()).clamp(0.0, 1.0)
}

/// 時定数 tau（秒）版。tau <= 0 は即時追従
pub fn decay_alpha(time_constant: f32, dt: f32) -> f32 {
    if !(time_constant > 0.0) {
        return 1.0;
    }
    exp_alpha(1.0 / time_constant, dt)
}

/// NLERP (Normalized Linear Interpolation)
///
/// 最短経路を取り、正規化できない時は `b` を返す。
pub fn nlerp(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    let t = t.clamp(0.0, 1.0);
    let mut end = b.coords;
    // shortest path: dot < 0 なら end を反転
    if a.coords.dot(&end) < 0.0 {
        end = -end;
    }
    let mixed = a.coords * (1.0 - t) + end * t;
    if mixed.norm_squared() > 1e-12 && mixed.iter().all(|v| v.is_finite()) {
        UnitQuaternion::from_quaternion(Quaternion::from(mixed))
    } else {
        *b
    }
}

/// EMAベースのスカラー平滑化（深度用）
///
/// 初回はそのまま通す。
#[derive(Debug, Clone)]
pub struct ScalarSmoother {
    time_constant: f32,
    prev: Option<f32>,
}

impl ScalarSmoother {
    pub fn new(time_constant: f32) -> Self {
        Self { time_constant, prev: None }
    }

    pub fn apply(&mut self, value: f32, dt: f32) -> f32 {
        if !value.is_finite() {
            return self.prev.unwrap_or(value);
        }
        let result = match self.prev {
            Some(prev) => prev + (value - prev) * decay_alpha(self.time_constant, dt),
            None => value,
        };
        self.prev = Some(result);
        result
    }

    pub fn value(&self) -> Option<f32> {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
