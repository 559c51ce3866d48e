//! ランドマーク記録（JSON Lines）
//!
//! 1行1フレーム。`landmarks` が無い/null の行は「トラッキング結果なし」、
//! 空配列は「空のスナップショット」として区別する。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::landmark::{Landmark, LandmarkSnapshot, TrackedRegion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
    #[serde(default)]
    pub presence: Option<f32>,
}

impl From<&RecordedLandmark> for Landmark {
    fn from(r: &RecordedLandmark) -> Self {
        Landmark { x: r.x, y: r.y, z: r.z, visibility: r.visibility, presence: r.presence }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedRegion {
    pub min: [f32; 2],
    pub size: [f32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// 前フレームからの秒数。無ければ設定の frame_dt
    #[serde(default)]
    pub dt: Option<f32>,
    #[serde(default)]
    pub landmarks: Option<Vec<RecordedLandmark>>,
    /// トラッカーの画像座標（y下向き、z手前が負）で記録されているか
    #[serde(default)]
    pub image_space: bool,
    #[serde(default)]
    pub region: Option<RecordedRegion>,
}

impl RecordedFrame {
    pub fn snapshot(&self) -> Option<LandmarkSnapshot> {
        let landmarks = self.landmarks.as_ref()?.iter().map(Landmark::from);
        let snapshot = if self.image_space {
            LandmarkSnapshot::from_normalized_image(landmarks)
        } else {
            let region = self
                .region
                .as_ref()
                .map(|r| TrackedRegion::new(r.min, r.size))
                .unwrap_or_default();
            LandmarkSnapshot::new(landmarks.collect(), region)
        };
        Some(snapshot)
    }
}

/// 空行と `#` で始まる行は読み飛ばす
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read recording line {}", i + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame: RecordedFrame =
            serde_json::from_str(line).with_context(|| format!("Failed to parse recording line {}", i + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedFrame>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open recording {}", path.display()))?;
    parse_recording(BufReader::new(file))
}
