// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/prior/backbone.rs - 各骨干网络的检测头配置
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

use super::{BoxSizes, FeatureMapSpec};

const SSD300_IMAGE_SIZE: u32 = 300;

/// (特征图尺寸, 步长, (最小, 最大), 宽高比)
const SSD300_HEADS: [(u32, u32, (f32, f32), &[f32]); 6] = [
  (38, 8, (30.0, 60.0), &[2.0]),
  (19, 16, (60.0, 111.0), &[2.0, 3.0]),
  (10, 32, (111.0, 162.0), &[2.0, 3.0]),
  (5, 64, (162.0, 213.0), &[2.0, 3.0]),
  (3, 100, (213.0, 264.0), &[2.0]),
  (1, 300, (264.0, 315.0), &[2.0]),
];

/// 内置的检测头配置表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
  #[default]
  Ssd300,
}

impl Backbone {
  pub fn specs(&self) -> Vec<FeatureMapSpec> {
    match self {
      Backbone::Ssd300 => SSD300_HEADS
        .iter()
        .map(|&(size, shrinkage, (min, max), ratios)| {
          FeatureMapSpec::new(size, shrinkage, BoxSizes::new(min, max), ratios)
        })
        .collect(),
    }
  }

  /// 该配置表对应的输入边长
  pub fn image_size(&self) -> u32 {
    match self {
      Backbone::Ssd300 => SSD300_IMAGE_SIZE,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prior::generate_priors;

  #[test]
  fn ssd300_has_8732_priors() {
    let backbone = Backbone::Ssd300;
    let priors = generate_priors(&backbone.specs(), backbone.image_size() as f32, true).unwrap();
    assert_eq!(priors.len(), 8732);
  }

  #[test]
  fn parses_from_lowercase_name() {
    let backbone: Backbone = serde_json::from_str("\"ssd300\"").unwrap();
    assert_eq!(backbone, Backbone::Ssd300);
  }
}
