// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/detector.rs - SSD 目标检测器
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
use tracing::{debug, info};

use crate::{
  config::SsdConfig,
  label::LabelMap,
  model::{DetectResult, Model, RawPrediction},
  postprocess::{PostProcess, PostProcessError},
  prior::{PriorError, PriorSet},
};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("模型推理错误: {0}")]
  ModelError(Box<dyn std::error::Error + Send + Sync>),
  #[error("后处理错误: {0}")]
  PostProcessError(#[from] PostProcessError),
  #[error("先验框生成错误: {0}")]
  PriorError(#[from] PriorError),
  #[error("类别数不匹配: 配置为 {expected}, 模型输出 {actual}")]
  ClassMismatch { expected: usize, actual: usize },
}

/// 将模型原始输出解码为检测结果
pub struct SsdDetector<M> {
  model: M,
  priors: PriorSet,
  post: PostProcess,
  labels: LabelMap,
}

impl<M> SsdDetector<M> {
  pub fn new(model: M, priors: PriorSet, post: PostProcess, labels: LabelMap) -> Self {
    Self {
      model,
      priors,
      post,
      labels,
    }
  }

  pub fn from_config(model: M, config: &SsdConfig) -> Result<Self, DetectorError> {
    let priors = config.build_priors()?;
    info!("检测器已创建: {} 个先验框, {} 个类别", priors.len(), config.num_classes);
    Ok(Self::new(
      model,
      priors,
      config.post_process(),
      config.label_map(),
    ))
  }

  pub fn priors(&self) -> &PriorSet {
    &self.priors
  }

  pub fn labels(&self) -> &LabelMap {
    &self.labels
  }
}

impl<M, E> Model for SsdDetector<M>
where
  M: Model<Output = RawPrediction, Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  type Input = M::Input;
  type Output = DetectResult;
  type Error = DetectorError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("执行模型推理");
    let prediction = self
      .model
      .infer(input)
      .map_err(|e| DetectorError::ModelError(Box::new(e)))?;

    if prediction.num_classes != self.labels.len() {
      return Err(DetectorError::ClassMismatch {
        expected: self.labels.len(),
        actual: prediction.num_classes,
      });
    }

    debug!("后处理模型输出");
    Ok(self.post.run(&prediction, &self.priors)?)
  }
}
