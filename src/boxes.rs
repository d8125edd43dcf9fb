// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/boxes.rs - 边界框坐标转换与 IoU
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

/// 中心形式边界框 `[center_x, center_y, width, height]`，坐标相对图像尺寸归一化
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct CenterBox {
  pub cx: f32,
  pub cy: f32,
  pub w: f32,
  pub h: f32,
}

/// 角点形式边界框 `[x_min, y_min, x_max, y_max]`，坐标相对图像尺寸归一化
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct CornerBox {
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

impl CenterBox {
  pub const fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
    Self { cx, cy, w, h }
  }

  pub fn to_corner(&self) -> CornerBox {
    center_to_corner(self)
  }

  /// 将四个分量逐一截断到 [0, 1]
  ///
  /// 宽高也会被截断，这不是几何意义上的边框裁剪，仅用于生成的先验框。
  pub fn clamp01(&self) -> Self {
    Self {
      cx: self.cx.clamp(0.0, 1.0),
      cy: self.cy.clamp(0.0, 1.0),
      w: self.w.clamp(0.0, 1.0),
      h: self.h.clamp(0.0, 1.0),
    }
  }
}

impl CornerBox {
  pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
    }
  }

  pub fn to_center(&self) -> CenterBox {
    corner_to_center(self)
  }

  pub fn width(&self) -> f32 {
    (self.x_max - self.x_min).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y_max - self.y_min).max(0.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn is_finite(&self) -> bool {
    [self.x_min, self.y_min, self.x_max, self.y_max]
      .iter()
      .all(|v| v.is_finite())
  }

  /// 计算两个边界框的 IoU，面积为零时返回 0
  pub fn iou(&self, other: &CornerBox) -> f32 {
    iou(self, other)
  }
}

impl From<[f32; 4]> for CenterBox {
  fn from(v: [f32; 4]) -> Self {
    Self::new(v[0], v[1], v[2], v[3])
  }
}

impl From<CenterBox> for [f32; 4] {
  fn from(b: CenterBox) -> Self {
    [b.cx, b.cy, b.w, b.h]
  }
}

impl From<[f32; 4]> for CornerBox {
  fn from(v: [f32; 4]) -> Self {
    Self::new(v[0], v[1], v[2], v[3])
  }
}

impl From<CornerBox> for [f32; 4] {
  fn from(b: CornerBox) -> Self {
    [b.x_min, b.y_min, b.x_max, b.y_max]
  }
}

pub fn center_to_corner(b: &CenterBox) -> CornerBox {
  CornerBox {
    x_min: b.cx - b.w / 2.0,
    y_min: b.cy - b.h / 2.0,
    x_max: b.cx + b.w / 2.0,
    y_max: b.cy + b.h / 2.0,
  }
}

pub fn corner_to_center(b: &CornerBox) -> CenterBox {
  CenterBox {
    cx: (b.x_min + b.x_max) / 2.0,
    cy: (b.y_min + b.y_max) / 2.0,
    w: b.x_max - b.x_min,
    h: b.y_max - b.y_min,
  }
}

pub fn iou(a: &CornerBox, b: &CornerBox) -> f32 {
  let x1 = a.x_min.max(b.x_min);
  let y1 = a.y_min.max(b.y_min);
  let x2 = a.x_max.min(b.x_max);
  let y2 = a.y_max.min(b.y_max);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let union = a.area() + b.area() - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}

/// 两组边界框之间的两两 IoU，按行主序存储
#[derive(Debug, Clone, PartialEq)]
pub struct IouMatrix {
  rows: usize,
  cols: usize,
  data: Box<[f32]>,
}

impl IouMatrix {
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn get(&self, row: usize, col: usize) -> f32 {
    self.data[row * self.cols + col]
  }

  pub fn row(&self, row: usize) -> &[f32] {
    &self.data[row * self.cols..(row + 1) * self.cols]
  }
}

/// 计算 `a` 中每个框与 `b` 中每个框的 IoU，结果 `[i][j] = iou(a[i], b[j])`
pub fn iou_matrix(a: &[CornerBox], b: &[CornerBox]) -> IouMatrix {
  let mut data = Vec::with_capacity(a.len() * b.len());
  for box_a in a {
    data.extend(b.iter().map(|box_b| iou(box_a, box_b)));
  }

  IouMatrix {
    rows: a.len(),
    cols: b.len(),
    data: data.into_boxed_slice(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
  }

  #[test]
  fn corner_center_round_trip() {
    let b = CornerBox::new(0.1, 0.2, 0.5, 0.9);
    let back = center_to_corner(&corner_to_center(&b));
    assert!(close(back.x_min, b.x_min));
    assert!(close(back.y_min, b.y_min));
    assert!(close(back.x_max, b.x_max));
    assert!(close(back.y_max, b.y_max));
  }

  #[test]
  fn center_to_corner_halves_extent() {
    let c = CenterBox::new(0.5, 0.5, 0.2, 0.4).to_corner();
    assert!(close(c.x_min, 0.4));
    assert!(close(c.y_min, 0.3));
    assert!(close(c.x_max, 0.6));
    assert!(close(c.y_max, 0.7));
  }

  #[test]
  fn iou_of_identical_and_disjoint() {
    let a = CornerBox::new(0.1, 0.1, 0.3, 0.3);
    let b = CornerBox::new(0.6, 0.6, 0.9, 0.9);
    assert!(close(a.iou(&a), 1.0));
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn iou_partial_overlap() {
    let a = CornerBox::new(0.0, 0.0, 0.2, 0.2);
    let b = CornerBox::new(0.1, 0.0, 0.3, 0.2);
    // 交集 0.02，并集 0.06
    assert!(close(a.iou(&b), 1.0 / 3.0));
  }

  #[test]
  fn iou_of_degenerate_boxes_is_zero() {
    let p = CornerBox::new(0.5, 0.5, 0.5, 0.5);
    let iou = p.iou(&p);
    assert_eq!(iou, 0.0);
    assert!(!iou.is_nan());
  }

  #[test]
  fn matrix_layout() {
    let a = [
      CornerBox::new(0.0, 0.0, 0.5, 0.5),
      CornerBox::new(0.5, 0.5, 1.0, 1.0),
    ];
    let b = [CornerBox::new(0.0, 0.0, 0.5, 0.5)];
    let m = iou_matrix(&a, &b);
    assert_eq!((m.rows(), m.cols()), (2, 1));
    assert!(close(m.get(0, 0), 1.0));
    assert_eq!(m.get(1, 0), 0.0);
    assert_eq!(m.row(1), &[0.0]);
  }

  #[test]
  fn clamp_touches_size_too() {
    let b = CenterBox::new(-0.1, 0.5, 1.4, 0.2).clamp01();
    assert_eq!(b, CenterBox::new(0.0, 0.5, 1.0, 0.2));
  }

  #[test]
  fn serde_as_array() {
    let b = CornerBox::new(0.25, 0.5, 0.75, 1.0);
    let text = serde_json::to_string(&b).unwrap();
    assert_eq!(text, "[0.25,0.5,0.75,1.0]");
    let back: CornerBox = serde_json::from_str(&text).unwrap();
    assert_eq!(back, b);
  }
}
