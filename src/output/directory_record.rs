// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  boxes::CornerBox,
  label::LabelMap,
  model::DetectResult,
  output::Render,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
  Name,
  Id,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
  frame: u32,
  timestamp: String,
  detections: Vec<ItemRecord<'a>>,
}

#[derive(Serialize)]
struct ItemRecord<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  label: Option<String>,
  class_id: u32,
  score: f32,
  bbox: &'a CornerBox,
}

/// 按日期目录逐帧记录检测结果
///
/// `folder:///path?always&record=id`，默认只记录有检测结果的帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  kind: RecordKind,
  labels: LabelMap,
  frame_counter: AtomicU32,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| if v == "id" { RecordKind::Id } else { RecordKind::Name })
      .unwrap_or(RecordKind::Name);

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      kind,
      labels: LabelMap::Numeric(0),
      frame_counter: AtomicU32::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn with_labels(mut self, labels: LabelMap) -> Self {
    self.labels = labels;
    self
  }

  fn frame_id(&self) -> u32 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  fn frame_path(&self, now: &DateTime<Utc>, id: u32) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!("{}-{:04X}.json", now.format("%H-%M-%S"), id)))
  }

  fn record<'a>(&self, id: u32, now: &DateTime<Utc>, result: &'a DetectResult) -> FrameRecord<'a> {
    let detections = result
      .items
      .iter()
      .map(|item| ItemRecord {
        label: (self.kind == RecordKind::Name).then(|| self.labels.name(item.class_id)),
        class_id: item.class_id,
        score: item.score,
        bbox: &item.bbox,
      })
      .collect();

    FrameRecord {
      frame: id,
      timestamp: now.to_rfc3339(),
      detections,
    }
  }
}

impl<F> Render<F, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, _frame: &F, result: &DetectResult) -> Result<(), Self::Error> {
    let id = self.frame_id();
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let now = Utc::now();
    let path = self.frame_path(&now, id)?;
    let record = self.record(id, &now, result);
    std::fs::write(&path, serde_json::to_vec_pretty(&record)?)?;
    debug!("检测结果已记录到: {}", path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;

  fn records_in(dir: &std::path::Path) -> Vec<serde_json::Value> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(path) = stack.pop() {
      for entry in std::fs::read_dir(path).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else {
          files.push(path);
        }
      }
    }
    files.sort();
    files
      .iter()
      .map(|p| serde_json::from_slice(&std::fs::read(p).unwrap()).unwrap())
      .collect()
  }

  fn one_person() -> DetectResult {
    DetectResult {
      items: vec![DetectItem {
        class_id: 15,
        score: 0.75,
        bbox: CornerBox::new(0.1, 0.2, 0.3, 0.4),
      }]
      .into_boxed_slice(),
    }
  }

  #[test]
  fn records_named_detections_and_skips_empty_frames() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url)
      .unwrap()
      .with_labels(LabelMap::Voc);

    output.render_result(&(), &DetectResult::default()).unwrap();
    output.render_result(&(), &one_person()).unwrap();

    let records = records_in(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["frame"], 2);
    assert_eq!(records[0]["detections"][0]["label"], "person");
    assert_eq!(records[0]["detections"][0]["class_id"], 15);
  }

  #[test]
  fn records_ids_for_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let url =
      url::Url::parse(&format!("folder://{}?always&record=id", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    output.render_result(&(), &DetectResult::default()).unwrap();
    output.render_result(&(), &one_person()).unwrap();

    let records = records_in(dir.path());
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["detections"]
      .as_array()
      .unwrap()
      .iter()
      .all(|d| d.get("label").is_none())));
  }
}
