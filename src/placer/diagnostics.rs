use std::fmt;

use crate::model::{Aabb, ProxyModel, RenderStats};

/// 装着時に出す描画診断
#[derive(Debug, Clone)]
pub struct ModelDiagnostics {
    pub name: String,
    pub active: bool,
    pub stats: RenderStats,
    pub bounds: Option<Aabb>,
}

impl ModelDiagnostics {
    pub fn collect<M: ProxyModel>(model: &M) -> Self {
        Self {
            name: model.name().to_string(),
            active: model.is_active(),
            stats: model.render_stats(),
            bounds: model.world_bounds(),
        }
    }

    /// 何も描画されない構成か
    pub fn is_invisible(&self) -> bool {
        self.stats.enabled_renderers == 0 || self.bounds.is_none()
    }
}

impl fmt::Display for ModelDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model={} active={} renderers={} enabled={} materials={}",
            self.name, self.active, self.stats.renderers, self.stats.enabled_renderers, self.stats.materials
        )?;
        match &self.bounds {
            Some(b) => {
                let (c, s) = (b.center(), b.size());
                write!(
                    f,
                    " boundsCenter=({:.3}, {:.3}, {:.3}) boundsSize=({:.3}, {:.3}, {:.3})",
                    c.x, c.y, c.z, s.x, s.y, s.z
                )
            }
            None => write!(f, " bounds=none"),
        }
    }
}
