// 该文件是 Biaozhu （标注） 项目的一部分。
// src/task.rs - 推理任务
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

use image::RgbImage;
use tracing::info;

use crate::{
  decode::{Annotation, DetectionDecoder, RawDetectionBatch},
  label_map::LabelCatalog,
  model::Model,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 对输入的第一帧执行一次推理、解码与渲染，返回解码得到的标注
pub struct OneShotTask {
  catalog: LabelCatalog,
  decoder: DetectionDecoder,
}

impl OneShotTask {
  pub fn new(catalog: LabelCatalog, decoder: DetectionDecoder) -> Self {
    Self { catalog, decoder }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbImage>,
  M: Model<Input = RgbImage, Output = RawDetectionBatch, Error = ME>,
  O: Render<RgbImage, [Annotation], Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = Vec<Annotation>;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = std::time::Instant::now();
    let batch = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let annotations = self
      .decoder
      .decode(&batch, frame.width(), frame.height(), &self.catalog)?;
    info!(
      "解码完成，{} 个检测中保留 {} 个",
      batch.len(),
      annotations.len()
    );

    output.render_result(&frame, &annotations)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(annotations)
  }
}
