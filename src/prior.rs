// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/prior.rs - 多尺度先验框生成
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

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::boxes::{CenterBox, CornerBox};

mod backbone;
pub use self::backbone::Backbone;

/// 先验框绝对像素尺寸 (min, max)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSizes {
  pub min: f32,
  pub max: f32,
}

impl BoxSizes {
  pub const fn new(min: f32, max: f32) -> Self {
    Self { min, max }
  }
}

/// 一个检测头的先验框描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMapSpec {
  /// 特征图边长
  pub feature_map_size: u32,
  /// 相对输入图像的步长
  pub shrinkage: u32,
  pub box_sizes: BoxSizes,
  /// 宽高比，每个比例 r 同时生成 r 与 1/r 两个框
  pub aspect_ratios: Vec<f32>,
}

impl FeatureMapSpec {
  pub fn new(
    feature_map_size: u32,
    shrinkage: u32,
    box_sizes: BoxSizes,
    aspect_ratios: impl Into<Vec<f32>>,
  ) -> Self {
    Self {
      feature_map_size,
      shrinkage,
      box_sizes,
      aspect_ratios: aspect_ratios.into(),
    }
  }

  /// 每个网格单元的先验框数量
  pub fn boxes_per_cell(&self) -> usize {
    2 + 2 * self.aspect_ratios.len()
  }

  pub fn num_priors(&self) -> usize {
    let cells = self.feature_map_size as usize * self.feature_map_size as usize;
    cells * self.boxes_per_cell()
  }

  fn validate(&self, index: usize) -> Result<(), PriorError> {
    if self.feature_map_size == 0 {
      return Err(PriorError::InvalidSpec(index, "特征图尺寸必须大于 0".to_string()));
    }
    if self.shrinkage == 0 {
      return Err(PriorError::InvalidSpec(index, "步长必须大于 0".to_string()));
    }
    let BoxSizes { min, max } = self.box_sizes;
    if !(min > 0.0) || !max.is_finite() {
      return Err(PriorError::InvalidSpec(
        index,
        format!("先验框尺寸必须为正数: ({}, {})", min, max),
      ));
    }
    if min > max {
      return Err(PriorError::InvalidSpec(
        index,
        format!("最小尺寸 {} 大于最大尺寸 {}", min, max),
      ));
    }
    if let Some(ratio) = self
      .aspect_ratios
      .iter()
      .find(|r| !(**r > 0.0) || !r.is_finite())
    {
      return Err(PriorError::InvalidSpec(
        index,
        format!("宽高比必须为正数: {}", ratio),
      ));
    }
    Ok(())
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum PriorError {
  #[error("图像尺寸无效: {0}")]
  InvalidImageSize(f32),
  #[error("第 {0} 个特征图配置无效: {1}")]
  InvalidSpec(usize, String),
  #[error("特征图配置列表为空")]
  EmptySpecs,
}

/// 生成后不可变的先验框集合，同时保存中心形式与角点形式
///
/// 顺序与模型输出张量一一对应，克隆只增加引用计数。
#[derive(Debug, Clone)]
pub struct PriorSet {
  center: Arc<[CenterBox]>,
  corner: Arc<[CornerBox]>,
}

impl PriorSet {
  pub fn from_center_boxes(boxes: Vec<CenterBox>) -> Self {
    let corner: Vec<CornerBox> = boxes.iter().map(CenterBox::to_corner).collect();
    Self {
      center: boxes.into(),
      corner: corner.into(),
    }
  }

  pub fn len(&self) -> usize {
    self.center.len()
  }

  pub fn is_empty(&self) -> bool {
    self.center.is_empty()
  }

  pub fn center_form(&self) -> &[CenterBox] {
    &self.center
  }

  pub fn corner_form(&self) -> &[CornerBox] {
    &self.corner
  }
}

/// 根据多尺度配置生成全部先验框
///
/// 网格按行优先遍历，每个单元依次输出：小正方形、大正方形，
/// 然后对每个宽高比输出 (宽, 高) 两个框。
pub fn generate_priors(
  specs: &[FeatureMapSpec],
  image_size: f32,
  clamp: bool,
) -> Result<PriorSet, PriorError> {
  if !(image_size > 0.0) || !image_size.is_finite() {
    return Err(PriorError::InvalidImageSize(image_size));
  }
  if specs.is_empty() {
    return Err(PriorError::EmptySpecs);
  }
  for (index, spec) in specs.iter().enumerate() {
    spec.validate(index)?;
  }

  let total = specs.iter().map(FeatureMapSpec::num_priors).sum();
  let mut priors = Vec::with_capacity(total);

  for spec in specs {
    let scale = image_size / spec.shrinkage as f32;
    let small = spec.box_sizes.min / image_size;
    let big = (spec.box_sizes.max * spec.box_sizes.min).sqrt() / image_size;
    let ratios: Vec<f32> = spec.aspect_ratios.iter().map(|r| r.sqrt()).collect();

    for j in 0..spec.feature_map_size {
      for i in 0..spec.feature_map_size {
        let cx = (i as f32 + 0.5) / scale;
        let cy = (j as f32 + 0.5) / scale;

        priors.push(CenterBox::new(cx, cy, small, small));
        priors.push(CenterBox::new(cx, cy, big, big));
        for ratio in &ratios {
          priors.push(CenterBox::new(cx, cy, small * ratio, small / ratio));
          priors.push(CenterBox::new(cx, cy, small / ratio, small * ratio));
        }
      }
    }

    debug!(
      "特征图 {}x{} (步长 {}): 生成 {} 个先验框",
      spec.feature_map_size,
      spec.feature_map_size,
      spec.shrinkage,
      spec.num_priors()
    );
  }

  if clamp {
    for prior in priors.iter_mut() {
      *prior = prior.clamp01();
    }
  }

  debug!("先验框总数: {}", priors.len());
  Ok(PriorSet::from_center_boxes(priors))
}
