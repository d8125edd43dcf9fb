// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/postprocess.rs - 推理结果解码、阈值过滤与 NMS
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;
use tracing::debug;

use crate::{
  boxes::{CenterBox, CornerBox},
  location::{LocationError, Variance, decode_all},
  matcher::BACKGROUND_LABEL,
  model::{DetectItem, DetectResult, RawPrediction},
  prior::PriorSet,
};

#[derive(Error, Debug, PartialEq)]
pub enum PostProcessError {
  #[error("预测形状不匹配: {0}")]
  ShapeMismatch(String),
  #[error("回归输出与先验框不匹配: {0}")]
  LocationError(#[from] LocationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcess {
  pub variance: Variance,
  pub confidence_threshold: f32,
  pub nms_threshold: f32,
  /// 对每个先验框的类别分数做 softmax
  pub softmax: bool,
  pub max_detections: Option<usize>,
}

impl Default for PostProcess {
  fn default() -> Self {
    Self {
      variance: Variance::default(),
      confidence_threshold: 0.5,
      nms_threshold: 0.5,
      softmax: false,
      max_detections: None,
    }
  }
}

impl PostProcess {
  pub fn run(
    &self,
    prediction: &RawPrediction,
    priors: &PriorSet,
  ) -> Result<DetectResult, PostProcessError> {
    let num_priors = priors.len();
    let num_classes = prediction.num_classes;

    if num_classes == 0 || prediction.scores.len() != num_priors * num_classes {
      return Err(PostProcessError::ShapeMismatch(format!(
        "分类输出 {} 个, 期望 {} x {}",
        prediction.scores.len(),
        num_priors,
        num_classes
      )));
    }

    let boxes: Vec<CornerBox> =
      decode_all(&prediction.locations, priors.center_form(), self.variance)?
        .iter()
        .map(CenterBox::to_corner)
        .collect();
    debug!("解码 {} 个回归输出", prediction.num_priors());

    let scores: Vec<f32> = if self.softmax {
      prediction.scores.chunks(num_classes).flat_map(softmax).collect()
    } else {
      prediction.scores.clone()
    };

    let mut items = Vec::new();
    for class_id in 0..num_classes {
      if class_id as u32 == BACKGROUND_LABEL {
        continue;
      }

      let candidates: Vec<DetectItem> = (0..num_priors)
        .filter_map(|p| {
          let score = scores[p * num_classes + class_id];
          (score > self.confidence_threshold).then(|| DetectItem {
            class_id: class_id as u32,
            score,
            bbox: boxes[p],
          })
        })
        .collect();

      if candidates.is_empty() {
        continue;
      }

      let kept = nms(candidates, self.nms_threshold);
      debug!("类别 {}: NMS 后保留 {} 个框", class_id, kept.len());
      items.extend(kept);
    }

    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    if let Some(limit) = self.max_detections {
      items.truncate(limit);
    }

    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}

/// 单类别非极大值抑制，按分数降序贪心保留
pub fn nms(mut detections: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  detections.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut keep: Vec<DetectItem> = Vec::with_capacity(detections.len());
  'outer: for det in detections {
    for k in &keep {
      if k.bbox.iou(&det.bbox) > iou_threshold {
        continue 'outer;
      }
    }
    keep.push(det);
  }
  keep
}

fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}
