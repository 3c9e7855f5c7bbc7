// 该文件是 Biaozhu （标注） 项目的一部分。
// src/model/tensor_dump.rs - 回放已导出的模型输出张量
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
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode::RawDetectionBatch, model::Model};

const TENSOR_NUM: &str = "num_detections";
const TENSOR_BOXES: &str = "detection_boxes";
const TENSOR_SCORES: &str = "detection_scores";
const TENSOR_CLASSES: &str = "detection_classes";

#[derive(Error, Debug)]
pub enum TensorDumpError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("缺少张量: {0}")]
  MissingTensor(&'static str),
  #[error("张量 {0} 包含非数值元素")]
  InvalidTensor(&'static str),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的文件路径: {0}")]
  InvalidPath(String),
}

/// 外部推理引擎导出的 SSD 输出张量。
///
/// 文件为 JSON 对象，包含 `detection_scores`、`detection_boxes`、`detection_classes`
/// 以及可选的 `num_detections`，张量可以是任意嵌套的数值数组（如 `[1, 100, 4]`）。
#[derive(Debug, Clone)]
pub struct TensorDump {
  batch: RawDetectionBatch,
}

impl FromUrlWithScheme for TensorDump {
  const SCHEME: &'static str = "tensors";
}

impl FromUrl for TensorDump {
  type Error = TensorDumpError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(TensorDumpError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = url
      .to_file_path()
      .map_err(|_| TensorDumpError::InvalidPath(url.to_string()))?;
    info!("加载张量文件: {}", path.display());
    let text = std::fs::read_to_string(&path)?;
    Self::from_json_str(&text)
  }
}

impl TensorDump {
  pub fn from_json_str(text: &str) -> Result<Self, TensorDumpError> {
    let root: Value = serde_json::from_str(text)?;

    let mut batch = RawDetectionBatch {
      scores: flatten_tensor(&root, TENSOR_SCORES)?,
      boxes: flatten_tensor(&root, TENSOR_BOXES)?,
      class_ids: flatten_tensor(&root, TENSOR_CLASSES)?,
    };

    if root.get(TENSOR_NUM).is_some() {
      let num = flatten_tensor(&root, TENSOR_NUM)?
        .first()
        .copied()
        .ok_or(TensorDumpError::InvalidTensor(TENSOR_NUM))?;
      debug!("num_detections = {}", num);
      batch.truncate(num.max(0.0) as usize);
    }

    debug!(
      "张量长度: scores={}, boxes={}, classes={}",
      batch.scores.len(),
      batch.boxes.len(),
      batch.class_ids.len()
    );

    Ok(TensorDump { batch })
  }

  pub fn batch(&self) -> &RawDetectionBatch {
    &self.batch
  }
}

impl Model for TensorDump {
  type Input = RgbImage;
  type Output = RawDetectionBatch;
  type Error = TensorDumpError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!(
      "回放张量输出, 输入图像 {}x{}",
      input.width(),
      input.height()
    );
    Ok(self.batch.clone())
  }
}

fn flatten_tensor(root: &Value, name: &'static str) -> Result<Vec<f32>, TensorDumpError> {
  let value = root.get(name).ok_or(TensorDumpError::MissingTensor(name))?;
  let mut out = Vec::new();
  flatten_into(value, name, &mut out)?;
  Ok(out)
}

fn flatten_into(value: &Value, name: &'static str, out: &mut Vec<f32>) -> Result<(), TensorDumpError> {
  match value {
    Value::Number(n) => {
      let v = n.as_f64().ok_or(TensorDumpError::InvalidTensor(name))?;
      out.push(v as f32);
    }
    Value::Array(items) => {
      for item in items {
        flatten_into(item, name, out)?;
      }
    }
    _ => return Err(TensorDumpError::InvalidTensor(name)),
  }
  Ok(())
}
