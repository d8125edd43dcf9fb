// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/label.rs - 类别名称表
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

/// PASCAL VOC 类别名称（含背景）
pub const VOC_CLASSES: [&str; 21] = [
  "background",
  "aeroplane",
  "bicycle",
  "bird",
  "boat",
  "bottle",
  "bus",
  "car",
  "cat",
  "chair",
  "cow",
  "diningtable",
  "dog",
  "horse",
  "motorbike",
  "person",
  "pottedplant",
  "sheep",
  "sofa",
  "train",
  "tvmonitor",
];

/// COCO 数据集类别名称（含背景）
pub const COCO_CLASSES: [&str; 81] = [
  "background",
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 类别编号到名称的映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMap {
  Voc,
  Coco,
  Numeric(usize),
}

impl LabelMap {
  /// 21 与 81 分别对应 VOC 与 COCO，其余类别数使用数字名称
  pub fn for_num_classes(num_classes: usize) -> Self {
    match num_classes {
      21 => LabelMap::Voc,
      81 => LabelMap::Coco,
      n => LabelMap::Numeric(n),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      LabelMap::Voc => VOC_CLASSES.len(),
      LabelMap::Coco => COCO_CLASSES.len(),
      LabelMap::Numeric(n) => *n,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn name(&self, class_id: u32) -> String {
    let id = class_id as usize;
    match self {
      LabelMap::Voc => VOC_CLASSES.get(id).unwrap_or(&"unknown").to_string(),
      LabelMap::Coco => COCO_CLASSES.get(id).unwrap_or(&"unknown").to_string(),
      LabelMap::Numeric(n) if id < *n => id.to_string(),
      LabelMap::Numeric(_) => "unknown".to_string(),
    }
  }
}
