// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/config.rs - 检测配置
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
  label::LabelMap,
  location::Variance,
  matcher::PriorMatcher,
  postprocess::PostProcess,
  prior::{Backbone, FeatureMapSpec, PriorError, PriorSet, generate_priors},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// 检测配置，可从 JSON 文件读取，未给出的字段取默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsdConfig {
  /// 模型输入尺寸 (宽, 高)
  pub image_size: (u32, u32),
  /// 类别数量（含背景）
  pub num_classes: usize,
  pub backbone: Backbone,
  /// 自定义检测头配置，给出时替代 `backbone` 的配置表
  pub specs: Option<Vec<FeatureMapSpec>>,
  /// 是否将先验框截断到 [0, 1]
  pub clamp: bool,
  pub variance: Variance,
  /// 训练目标匹配的 IoU 阈值
  pub iou_threshold: f32,
  pub confidence_threshold: f32,
  pub nms_threshold: f32,
  pub softmax: bool,
  pub max_detections: Option<usize>,
}

impl Default for SsdConfig {
  fn default() -> Self {
    Self {
      image_size: (300, 300),
      num_classes: 21,
      backbone: Backbone::default(),
      specs: None,
      clamp: true,
      variance: Variance::default(),
      iou_threshold: 0.45,
      confidence_threshold: 0.5,
      nms_threshold: 0.5,
      softmax: false,
      max_detections: None,
    }
  }
}

fn unit_interval(name: &str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::Invalid(format!("{} 必须位于 [0, 1]: {}", name, value)))
  }
}

impl SsdConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("读取配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let (w, h) = self.image_size;
    if w == 0 || h == 0 {
      return Err(ConfigError::Invalid(format!("图像尺寸无效: {}x{}", w, h)));
    }
    if self.num_classes == 0 {
      return Err(ConfigError::Invalid("类别数量必须大于 0".to_string()));
    }
    unit_interval("iou_threshold", self.iou_threshold)?;
    unit_interval("confidence_threshold", self.confidence_threshold)?;
    unit_interval("nms_threshold", self.nms_threshold)?;
    let positive = |v: f32| v.is_finite() && v > 0.0;
    if !positive(self.variance.center) || !positive(self.variance.size) {
      return Err(ConfigError::Invalid(format!(
        "方差必须为正数: {:?}",
        self.variance
      )));
    }
    Ok(())
  }

  pub fn feature_map_specs(&self) -> Vec<FeatureMapSpec> {
    match &self.specs {
      Some(specs) => specs.clone(),
      None => self.backbone.specs(),
    }
  }

  /// 以输入宽度作为先验框的图像边长
  pub fn build_priors(&self) -> Result<PriorSet, PriorError> {
    generate_priors(
      &self.feature_map_specs(),
      self.image_size.0 as f32,
      self.clamp,
    )
  }

  pub fn matcher(&self) -> Result<PriorMatcher, PriorError> {
    Ok(PriorMatcher::new(
      self.build_priors()?,
      self.variance,
      self.iou_threshold,
    ))
  }

  pub fn post_process(&self) -> PostProcess {
    PostProcess {
      variance: self.variance,
      confidence_threshold: self.confidence_threshold,
      nms_threshold: self.nms_threshold,
      softmax: self.softmax,
      max_detections: self.max_detections,
    }
  }

  pub fn label_map(&self) -> LabelMap {
    LabelMap::for_num_classes(self.num_classes)
  }
}
