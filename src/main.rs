// 该文件是 Biaozhu （标注） 项目的一部分。
// src/main.rs - 单张图像标注程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Wareless Group

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use biaozhu::{
  FromUrl,
  decode::{DEFAULT_MIN_SCORE, DetectionDecoder},
  input::InputWrapper,
  label_map::LabelCatalog,
  model::TensorDump,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// Biaozhu 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 标签映射文件路径（如 mscoco_label_map.pbtxt）
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,
  /// 输入图像，如 image:///images/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 模型输出张量文件，如 tensors:///images/input.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输出路径，可重复指定，如 image:///images/output.jpg 或 record:///images/output.json；
  /// image 输出仅在指定 ?font=<TTF 文件> 时绘制 "标签:分数%" 文字（可选 &font_size=<像素>），
  /// 否则只绘制边框，如 image:///images/output.jpg?font=/usr/share/fonts/DejaVuSans.ttf
  #[arg(long, value_name = "OUTPUT", required = true)]
  pub output: Vec<Url>,
  /// 置信度阈值 (0.0 - 1.0)，分数必须严格大于该值
  #[arg(long, default_value_t = DEFAULT_MIN_SCORE, value_name = "THRESHOLD")]
  pub min_score: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("标签映射文件: {}", args.labels.display());
  info!("输入来源: {}", args.input);
  info!("模型输出: {}", args.model);
  info!("置信度阈值: {}", args.min_score);

  let catalog = LabelCatalog::from_path(&args.labels)?;
  info!("标签数量: {}", catalog.len());

  let input = InputWrapper::from_url(&args.input)?;
  let model = TensorDump::from_url(&args.model)?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let task = OneShotTask::new(catalog, DetectionDecoder::new(args.min_score));
  let annotations = task.run_task(input, model, outputs)?;

  for annotation in &annotations {
    info!(
      "  - {} at ({}, {}, {}x{})",
      annotation.caption(),
      annotation.rect.x,
      annotation.rect.y,
      annotation.rect.width,
      annotation.rect.height
    );
  }
  info!("共标注 {} 个对象", annotations.len());

  Ok(())
}
