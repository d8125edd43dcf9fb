// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/input.rs - 网络输出回放输入
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

use std::convert::Infallible;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Model, RawPrediction},
};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("回放文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 从 JSON 文件回放记录下来的网络原始输出，文件内容为 `RawPrediction` 数组
pub struct PredictionFileInput {
  frames: std::vec::IntoIter<RawPrediction>,
}

impl FromUrlWithScheme for PredictionFileInput {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for PredictionFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    let text = std::fs::read_to_string(url.path())?;
    let frames: Vec<RawPrediction> = serde_json::from_str(&text)?;
    info!("回放文件 {} 共 {} 帧", url.path(), frames.len());

    Ok(Self::from(frames))
  }
}

impl From<Vec<RawPrediction>> for PredictionFileInput {
  fn from(frames: Vec<RawPrediction>) -> Self {
    Self {
      frames: frames.into_iter(),
    }
  }
}

impl Iterator for PredictionFileInput {
  type Item = RawPrediction;

  fn next(&mut self) -> Option<Self::Item> {
    self.frames.next()
  }
}

/// 直接返回回放帧的模型
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayModel;

impl Model for ReplayModel {
  type Input = RawPrediction;
  type Output = RawPrediction;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(input.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::location::Location;

  #[test]
  fn reads_frames_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.json");
    std::fs::write(
      &path,
      r#"[
        { "locations": [[0, 0, 0, 0]], "scores": [0.2, 0.8], "num_classes": 2 },
        { "locations": [[1, 0, 0, 0]], "scores": [0.9, 0.1], "num_classes": 2 }
      ]"#,
    )
    .unwrap();

    let url = Url::parse(&format!("replay://{}", path.display())).unwrap();
    let frames: Vec<RawPrediction> = PredictionFileInput::from_url(&url).unwrap().collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].locations[0], Location::from([1.0, 0.0, 0.0, 0.0]));
    assert_eq!(ReplayModel.infer(&frames[0]).unwrap(), frames[0]);
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/frames.json").unwrap();
    assert!(matches!(
      PredictionFileInput::from_url(&url),
      Err(InputError::SchemeMismatch(_))
    ));
  }
}
