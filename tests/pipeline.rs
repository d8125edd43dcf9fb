// 该文件是 SSD Prior （先验框） 项目的一部分。
// tests/pipeline.rs - 训练目标编码与推理解码的整体流程
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

use ssd_prior::{
  FromUrl,
  boxes::CornerBox,
  config::SsdConfig,
  detector::SsdDetector,
  input::{PredictionFileInput, ReplayModel},
  matcher::MatchTargets,
  model::{Model, RawPrediction},
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

/// 把训练目标当作一次完美的网络输出
fn perfect_prediction(targets: &MatchTargets, num_classes: usize) -> RawPrediction {
  let mut scores = vec![0.0; targets.labels.len() * num_classes];
  for (prior, &label) in targets.labels.iter().enumerate() {
    scores[prior * num_classes + label as usize] = 1.0;
  }
  RawPrediction {
    locations: targets.locations.clone(),
    scores,
    num_classes,
  }
}

fn assert_box_close(a: &CornerBox, b: &CornerBox) {
  let a: [f32; 4] = (*a).into();
  let b: [f32; 4] = (*b).into();
  for (x, y) in a.iter().zip(&b) {
    assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
  }
}

#[test]
fn encoded_targets_decode_back_to_ground_truth() {
  let config = SsdConfig::default();
  let matcher = config.matcher().unwrap();
  assert_eq!(matcher.priors().len(), 8732);

  let gt = [
    CornerBox::new(0.1, 0.1, 0.3, 0.3),
    CornerBox::new(0.5, 0.4, 0.9, 0.95),
  ];
  let labels = [15, 7];
  let targets = matcher.encode_targets(&gt, &labels).unwrap();
  assert_eq!(targets.locations.len(), 8732);
  for label in labels {
    assert!(targets.labels.contains(&label));
  }

  let prediction = perfect_prediction(&targets, config.num_classes);
  let detector = SsdDetector::from_config(ReplayModel, &config).unwrap();
  let result = detector.infer(&prediction).unwrap();

  // 同类别的正样本解码到同一个框，NMS 后每个真值只剩一个
  assert_eq!(result.len(), 2);
  for (gt_box, label) in gt.iter().zip(labels) {
    let item = result
      .items
      .iter()
      .find(|item| item.class_id == label)
      .unwrap();
    assert_box_close(&item.bbox, gt_box);
    assert_eq!(detector.labels().name(label), if label == 15 { "person" } else { "car" });
  }
}

#[test]
fn replay_task_records_every_frame() {
  let config = SsdConfig::from_json(
    r#"{
      "num_classes": 3,
      "specs": [
        { "feature_map_size": 2, "shrinkage": 150,
          "box_sizes": { "min": 30, "max": 60 }, "aspect_ratios": [2] }
      ]
    }"#,
  )
  .unwrap();
  let matcher = config.matcher().unwrap();
  let targets = matcher
    .encode_targets(&[CornerBox::new(0.2, 0.2, 0.3, 0.3)], &[2])
    .unwrap();
  let empty = matcher.encode_targets(&[], &[]).unwrap();

  let frames = vec![
    perfect_prediction(&targets, 3),
    perfect_prediction(&empty, 3),
  ];

  let dir = tempfile::tempdir().unwrap();
  let replay = dir.path().join("frames.json");
  std::fs::write(&replay, serde_json::to_string(&frames).unwrap()).unwrap();
  let records = dir.path().join("records");

  let input =
    PredictionFileInput::from_url(&url::Url::parse(&format!("replay://{}", replay.display())).unwrap())
      .unwrap();
  let output = OutputWrapper::from_url(
    &url::Url::parse(&format!("folder://{}?always", records.display())).unwrap(),
  )
  .unwrap()
  .with_labels(config.label_map());
  let detector = SsdDetector::from_config(ReplayModel, &config).unwrap();

  ContinuousTask::default()
    .run_task(input, detector, output)
    .unwrap();

  let mut written = Vec::new();
  let mut stack = vec![records];
  while let Some(path) = stack.pop() {
    for entry in std::fs::read_dir(path).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        stack.push(path);
      } else {
        written.push(path);
      }
    }
  }
  written.sort();
  assert_eq!(written.len(), 2);

  let first: serde_json::Value =
    serde_json::from_slice(&std::fs::read(&written[0]).unwrap()).unwrap();
  assert_eq!(first["detections"][0]["label"], "2");
}
