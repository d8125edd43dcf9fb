// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/location.rs - 回归目标编码与解码
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

use crate::boxes::CenterBox;

/// 中心偏移与尺寸的方差系数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variance {
  pub center: f32,
  pub size: f32,
}

impl Default for Variance {
  fn default() -> Self {
    Self {
      center: 0.1,
      size: 0.2,
    }
  }
}

/// 相对先验框的偏移编码 `[dx, dy, dw, dh]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Location {
  pub dx: f32,
  pub dy: f32,
  pub dw: f32,
  pub dh: f32,
}

impl From<[f32; 4]> for Location {
  fn from(v: [f32; 4]) -> Self {
    Self {
      dx: v[0],
      dy: v[1],
      dw: v[2],
      dh: v[3],
    }
  }
}

impl From<Location> for [f32; 4] {
  fn from(l: Location) -> Self {
    [l.dx, l.dy, l.dw, l.dh]
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum LocationError {
  #[error("长度不匹配: 边界框 {boxes} 个, 先验框 {priors} 个")]
  LengthMismatch { boxes: usize, priors: usize },
}

/// 先验框宽高必须非零
pub fn encode(matched: &CenterBox, prior: &CenterBox, variance: Variance) -> Location {
  Location {
    dx: (matched.cx - prior.cx) / prior.w / variance.center,
    dy: (matched.cy - prior.cy) / prior.h / variance.center,
    dw: (matched.w / prior.w).ln() / variance.size,
    dh: (matched.h / prior.h).ln() / variance.size,
  }
}

pub fn decode(location: &Location, prior: &CenterBox, variance: Variance) -> CenterBox {
  CenterBox {
    cx: location.dx * variance.center * prior.w + prior.cx,
    cy: location.dy * variance.center * prior.h + prior.cy,
    w: (location.dw * variance.size).exp() * prior.w,
    h: (location.dh * variance.size).exp() * prior.h,
  }
}

pub fn encode_all(
  matched: &[CenterBox],
  priors: &[CenterBox],
  variance: Variance,
) -> Result<Vec<Location>, LocationError> {
  if matched.len() != priors.len() {
    return Err(LocationError::LengthMismatch {
      boxes: matched.len(),
      priors: priors.len(),
    });
  }
  Ok(
    matched
      .iter()
      .zip(priors)
      .map(|(m, p)| encode(m, p, variance))
      .collect(),
  )
}

pub fn decode_all(
  locations: &[Location],
  priors: &[CenterBox],
  variance: Variance,
) -> Result<Vec<CenterBox>, LocationError> {
  if locations.len() != priors.len() {
    return Err(LocationError::LengthMismatch {
      boxes: locations.len(),
      priors: priors.len(),
    });
  }
  Ok(
    locations
      .iter()
      .zip(priors)
      .map(|(l, p)| decode(l, p, variance))
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
  }

  #[test]
  fn decode_inverts_encode() {
    let prior = CenterBox::new(0.25, 0.25, 0.1, 0.1);
    let boxes = [
      CenterBox::new(0.2, 0.3, 0.2, 0.05),
      CenterBox::new(0.9, 0.1, 0.5, 0.7),
      CenterBox::new(0.25, 0.25, 0.1, 0.1),
    ];
    for b in boxes {
      for variance in [Variance::default(), Variance { center: 1.0, size: 1.0 }] {
        let back = decode(&encode(&b, &prior, variance), &prior, variance);
        assert!(close(back.cx, b.cx), "{:?} vs {:?}", back, b);
        assert!(close(back.cy, b.cy));
        assert!(close(back.w, b.w));
        assert!(close(back.h, b.h));
      }
    }
  }

  #[test]
  fn box_equal_to_prior_encodes_to_zero() {
    let prior = CenterBox::new(0.5, 0.5, 0.2, 0.3);
    let loc = encode(&prior, &prior, Variance::default());
    assert_eq!(loc, Location::default());
  }

  #[test]
  fn encode_applies_variance() {
    let prior = CenterBox::new(0.5, 0.5, 0.2, 0.2);
    let matched = CenterBox::new(0.52, 0.5, 0.2, 0.2 * std::f32::consts::E);
    let loc = encode(&matched, &prior, Variance::default());
    assert!(close(loc.dx, 1.0));
    assert!(close(loc.dy, 0.0));
    assert!(close(loc.dh, 5.0));
  }

  #[test]
  fn slices_must_line_up() {
    let priors = [CenterBox::new(0.5, 0.5, 0.2, 0.2)];
    let err = decode_all(&[], &priors, Variance::default()).unwrap_err();
    assert_eq!(err, LocationError::LengthMismatch { boxes: 0, priors: 1 });
    assert_eq!(
      encode_all(&priors, &priors, Variance::default()).unwrap(),
      vec![Location::default()]
    );
  }
}
