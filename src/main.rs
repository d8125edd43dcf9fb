// 该文件是 SSD Prior （先验框） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use ssd_prior::{
  FromUrl,
  boxes::CornerBox,
  config::SsdConfig,
  detector::SsdDetector,
  input::{PredictionFileInput, ReplayModel},
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, Task},
};

/// SSD 先验框工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// JSON 配置文件路径，缺省使用内置 SSD300 配置
  #[arg(long, global = true, value_name = "FILE")]
  pub config: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 生成先验框并输出为 JSON
  Priors {
    /// 输出文件路径，缺省输出到标准输出
    #[arg(long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// 输出角点形式
    #[arg(long)]
    corner: bool,
  },
  /// 将真值框匹配到先验框并编码为训练目标
  Assign {
    /// 真值文件: {"boxes": [[x_min, y_min, x_max, y_max], ...], "labels": [...]}
    #[arg(long, value_name = "FILE")]
    targets: PathBuf,
    #[arg(long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
  },
  /// 回放网络原始输出并解码检测结果
  Replay {
    /// 输入来源，例如 replay:///path/to/predictions.json
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    /// 输出路径，例如 log:// 或 folder:///path?always
    #[arg(long, value_name = "OUTPUT", default_value = "log://")]
    output: Url,
    /// 只处理第一帧
    #[arg(long)]
    oneshot: bool,
    #[arg(long, value_name = "FRAME_NUMBER")]
    frame_number: Option<usize>,
  },
}

#[derive(Deserialize)]
struct GroundTruth {
  boxes: Vec<CornerBox>,
  labels: Vec<u32>,
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
  let text = serde_json::to_string_pretty(value)?;
  match output {
    Some(path) => {
      std::fs::write(path, text).with_context(|| format!("无法写入: {}", path.display()))?;
      info!("结果已写入: {}", path.display());
    }
    None => println!("{}", text),
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = match &args.config {
    Some(path) => SsdConfig::from_file(path)?,
    None => SsdConfig::default(),
  };
  info!(
    "配置: 输入 {}x{}, {} 个类别",
    config.image_size.0, config.image_size.1, config.num_classes
  );

  match args.command {
    Command::Priors { output, corner } => {
      let priors = config.build_priors()?;
      info!("生成 {} 个先验框", priors.len());
      if corner {
        write_json(&priors.corner_form(), output.as_deref())?;
      } else {
        write_json(&priors.center_form(), output.as_deref())?;
      }
    }
    Command::Assign { targets, output } => {
      let text = std::fs::read_to_string(&targets)
        .with_context(|| format!("无法读取真值文件: {}", targets.display()))?;
      let gt: GroundTruth = serde_json::from_str(&text)?;
      let matcher = config.matcher()?;
      let encoded = matcher.encode_targets(&gt.boxes, &gt.labels)?;
      write_json(&encoded, output.as_deref())?;
    }
    Command::Replay {
      input,
      output,
      oneshot,
      frame_number,
    } => {
      info!("输入来源: {}", input);
      info!("输出路径: {}", output);

      let frames = PredictionFileInput::from_url(&input)?;
      let detector = SsdDetector::from_config(ReplayModel, &config)?;
      let output = OutputWrapper::from_url(&output)?.with_labels(config.label_map());

      if oneshot {
        OneShotTask.run_task(frames, detector, output)?;
      } else {
        ContinuousTask::default()
          .with_frame_number(frame_number)
          .with_interrupt(true)
          .run_task(frames, detector, output)?;
      }
    }
  }

  Ok(())
}
