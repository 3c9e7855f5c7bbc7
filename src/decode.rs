// 该文件是 Biaozhu （标注） 项目的一部分。
// src/decode.rs - 检测结果解码
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

use thiserror::Error;
use tracing::{debug, trace};

use crate::label_map::LabelCatalog;

/// 默认置信度阈值，分数必须严格大于该值才会保留
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

const BOX_COORDS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("张量形状不匹配: {tensor} 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch {
    tensor: &'static str,
    expected: usize,
    actual: usize,
  },
}

/// 单张图像的原始检测输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetectionBatch {
  /// 置信度，模型已按降序排列
  pub scores: Vec<f32>,
  /// 归一化坐标 [top, left, bottom, right]，每个检测 4 个值
  pub boxes: Vec<f32>,
  /// 以浮点数存放的类别 id
  pub class_ids: Vec<f32>,
}

impl RawDetectionBatch {
  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  /// 只保留前 `n` 个检测。长度不足的数组保持原样，留给解码时校验。
  pub fn truncate(&mut self, n: usize) {
    self.scores.truncate(n);
    self.boxes.truncate(n.saturating_mul(BOX_COORDS));
    self.class_ids.truncate(n);
  }

  fn validate(&self) -> Result<(), DecodeError> {
    let n = self.scores.len();
    if self.boxes.len() != BOX_COORDS * n {
      return Err(DecodeError::ShapeMismatch {
        tensor: "boxes",
        expected: BOX_COORDS * n,
        actual: self.boxes.len(),
      });
    }
    if self.class_ids.len() != n {
      return Err(DecodeError::ShapeMismatch {
        tensor: "class_ids",
        expected: n,
        actual: self.class_ids.len(),
      });
    }
    Ok(())
  }
}

/// 像素坐标矩形，宽高可能为负（异常检测框原样保留）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl Rect {
  pub fn right(&self) -> i32 {
    self.x.saturating_add(self.width)
  }

  pub fn is_degenerate(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  pub rect: Rect,
  pub score: f32,
  /// 类别未在标签目录中时为空字符串
  pub label: String,
}

impl Annotation {
  /// 绘制用的标注文本，如 `person:93%`
  pub fn caption(&self) -> String {
    format!("{}:{}%", self.label, (self.score * 100.0).round() as i32)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionDecoder {
  min_score: f32,
}

impl Default for DetectionDecoder {
  fn default() -> Self {
    Self::new(DEFAULT_MIN_SCORE)
  }
}

impl DetectionDecoder {
  pub fn new(min_score: f32) -> Self {
    Self { min_score }
  }

  pub fn min_score(&self) -> f32 {
    self.min_score
  }

  /// 将原始检测输出解码为标注序列。
  ///
  /// 检测按输入顺序处理，不重新排序，也不做 NMS。分数不大于阈值的检测被丢弃；
  /// 未知类别得到空标签，异常几何原样输出。只有张量长度不一致时才返回错误。
  pub fn decode(
    &self,
    batch: &RawDetectionBatch,
    image_width: u32,
    image_height: u32,
    catalog: &LabelCatalog,
  ) -> Result<Vec<Annotation>, DecodeError> {
    batch.validate()?;

    let (w, h) = (image_width as f32, image_height as f32);
    let mut annotations = Vec::new();

    for (i, (&score, bbox)) in batch
      .scores
      .iter()
      .zip(batch.boxes.chunks_exact(BOX_COORDS))
      .enumerate()
    {
      if score.is_nan() || score <= self.min_score {
        trace!("检测 {}: 分数 {} 未超过阈值 {}, 跳过", i, score, self.min_score);
        continue;
      }

      let (top, left, bottom, right) = (bbox[0], bbox[1], bbox[2], bbox[3]);
      let x = (left * w).floor() as i32;
      let y = (top * h).floor() as i32;
      // 非有限或超出 i32 的坐标在转换时饱和，宽高相减同样饱和
      let rect = Rect {
        x,
        y,
        width: ((right * w).floor() as i32).saturating_sub(x),
        height: ((bottom * h).floor() as i32).saturating_sub(y),
      };

      let class_id = batch.class_ids[i].round() as i64;
      let label = catalog
        .display_name(class_id)
        .map(str::to_string)
        .unwrap_or_default();
      if label.is_empty() {
        debug!("检测 {}: 类别 {} 不在标签目录中", i, class_id);
      }

      annotations.push(Annotation { rect, score, label });
    }

    debug!(
      "解码 {} 个检测, 保留 {} 个 (阈值 {})",
      batch.len(),
      annotations.len(),
      self.min_score
    );

    Ok(annotations)
  }
}
