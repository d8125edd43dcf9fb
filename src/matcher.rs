// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/matcher.rs - 真值框与先验框匹配
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  boxes::{CenterBox, CornerBox, iou_matrix},
  location::{Location, LocationError, Variance, encode_all},
  prior::PriorSet,
};

/// 背景类别编号
pub const BACKGROUND_LABEL: u32 = 0;

/// 强制匹配的哨兵值，大于任何真实 IoU
const FORCED_MATCH: f32 = 2.0;

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
  #[error("真值框与标签数量不一致: {boxes} 个框, {labels} 个标签")]
  LengthMismatch { boxes: usize, labels: usize },
  #[error("第 {index} 个真值框无效: {bbox:?}")]
  InvalidBox { index: usize, bbox: CornerBox },
  #[error("编码失败: {0}")]
  LocationError(#[from] LocationError),
}

/// 每个先验框分配到的真值框（角点形式）与类别
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
  pub boxes: Vec<CornerBox>,
  pub labels: Vec<u32>,
}

impl Assignment {
  fn background(num_priors: usize) -> Self {
    Self {
      boxes: vec![CornerBox::default(); num_priors],
      labels: vec![BACKGROUND_LABEL; num_priors],
    }
  }

  /// 非背景先验框数量
  pub fn num_positive(&self) -> usize {
    self
      .labels
      .iter()
      .filter(|&&label| label != BACKGROUND_LABEL)
      .count()
  }
}

/// 按 IoU 将真值框分配给先验框
///
/// 每个真值框的最佳先验框会被强制分配给它，保证每个真值框至少有一个先验框。
/// 多个真值框共享同一最佳先验框时，编号靠后的真值框生效。
pub fn assign_priors(
  gt_boxes: &[CornerBox],
  gt_labels: &[u32],
  corner_priors: &[CornerBox],
  iou_threshold: f32,
) -> Result<Assignment, MatchError> {
  if gt_boxes.len() != gt_labels.len() {
    return Err(MatchError::LengthMismatch {
      boxes: gt_boxes.len(),
      labels: gt_labels.len(),
    });
  }
  check_boxes(gt_boxes, |b| b.x_max < b.x_min || b.y_max < b.y_min)?;
  if gt_boxes.is_empty() || corner_priors.is_empty() {
    return Ok(Assignment::background(corner_priors.len()));
  }

  // ious[p][t]
  let ious = iou_matrix(corner_priors, gt_boxes);

  let (mut best_target_per_prior, mut best_target_per_prior_index): (Vec<f32>, Vec<usize>) =
    (0..ious.rows()).map(|p| argmax(ious.row(p).iter().copied())).unzip();

  let best_prior_per_target_index: Vec<usize> = (0..ious.cols())
    .map(|t| argmax((0..ious.rows()).map(|p| ious.get(p, t))).1)
    .collect();

  for (target, &prior) in best_prior_per_target_index.iter().enumerate() {
    best_target_per_prior_index[prior] = target;
    best_target_per_prior[prior] = FORCED_MATCH;
  }

  let labels = best_target_per_prior_index
    .iter()
    .zip(&best_target_per_prior)
    .map(|(&target, &overlap)| {
      if overlap < iou_threshold {
        BACKGROUND_LABEL
      } else {
        gt_labels[target]
      }
    })
    .collect();

  let boxes = best_target_per_prior_index
    .iter()
    .map(|&target| gt_boxes[target])
    .collect();

  Ok(Assignment { boxes, labels })
}

fn check_boxes(
  gt_boxes: &[CornerBox],
  invalid: impl Fn(&CornerBox) -> bool,
) -> Result<(), MatchError> {
  match gt_boxes.iter().position(|b| !b.is_finite() || invalid(b)) {
    Some(index) => Err(MatchError::InvalidBox {
      index,
      bbox: gt_boxes[index],
    }),
    None => Ok(()),
  }
}

/// 返回 (最大值, 首次出现的下标)，空序列返回 (0, 0)
fn argmax(values: impl IntoIterator<Item = f32>) -> (f32, usize) {
  let mut iter = values.into_iter().enumerate();
  let Some((_, first)) = iter.next() else {
    return (0.0, 0);
  };
  iter.fold((first, 0), |(best, best_index), (index, value)| {
    if value > best {
      (value, index)
    } else {
      (best, best_index)
    }
  })
}

/// 单个样本的训练目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTargets {
  pub locations: Vec<Location>,
  pub labels: Vec<u32>,
}

/// 训练目标变换：匹配真值框并编码为回归目标
#[derive(Debug, Clone)]
pub struct PriorMatcher {
  priors: PriorSet,
  variance: Variance,
  iou_threshold: f32,
}

impl PriorMatcher {
  pub fn new(priors: PriorSet, variance: Variance, iou_threshold: f32) -> Self {
    Self {
      priors,
      variance,
      iou_threshold,
    }
  }

  pub fn priors(&self) -> &PriorSet {
    &self.priors
  }

  pub fn assign(
    &self,
    gt_boxes: &[CornerBox],
    gt_labels: &[u32],
  ) -> Result<Assignment, MatchError> {
    assign_priors(
      gt_boxes,
      gt_labels,
      self.priors.corner_form(),
      self.iou_threshold,
    )
  }

  /// 没有真值框时所有先验框为背景，回归目标全为零
  ///
  /// 宽或高为零的真值框无法编码，直接报错。
  pub fn encode_targets(
    &self,
    gt_boxes: &[CornerBox],
    gt_labels: &[u32],
  ) -> Result<MatchTargets, MatchError> {
    check_boxes(gt_boxes, |b| b.width() <= 0.0 || b.height() <= 0.0)?;
    let assignment = self.assign(gt_boxes, gt_labels)?;

    let locations = if gt_boxes.is_empty() {
      vec![Location::default(); self.priors.len()]
    } else {
      let matched: Vec<CenterBox> =
        assignment.boxes.iter().map(CornerBox::to_center).collect();
      encode_all(&matched, self.priors.center_form(), self.variance)?
    };

    debug!(
      "匹配完成: {} 个真值框, {} 个正样本先验框",
      gt_boxes.len(),
      assignment.num_positive()
    );

    Ok(MatchTargets {
      locations,
      labels: assignment.labels,
    })
  }
}
