// 该文件是 Biaozhu （标注） 项目的一部分。
// src/output/record_file.rs - 标注记录文件输出
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

use image::RgbImage;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decode::Annotation, output::Render};

#[derive(Error, Debug)]
pub enum RecordFileError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无效的文件路径: {0}")]
  InvalidPath(String),
  #[error("未知的记录格式: {0}")]
  UnknownFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
  #[default]
  Json,
  /// 每行一个标注: `label, score, x, y, width, height`
  Text,
}

/// 将标注写入记录文件，如 `record:///out.json` 或 `record:///out.txt?format=txt`
pub struct RecordFileOutput {
  path: PathBuf,
  format: RecordFormat,
}

impl FromUrlWithScheme for RecordFileOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordFileOutput {
  type Error = RecordFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordFileError::SchemeMismatch);
    }

    let path = uri
      .to_file_path()
      .map_err(|_| RecordFileError::InvalidPath(uri.to_string()))?;

    let mut format = RecordFormat::default();
    for (k, v) in uri.query_pairs() {
      if k == "format" {
        format = match &*v {
          "json" => RecordFormat::Json,
          "txt" | "text" => RecordFormat::Text,
          other => return Err(RecordFileError::UnknownFormat(other.to_string())),
        };
      }
    }

    Ok(RecordFileOutput { path, format })
  }
}

impl RecordFileOutput {
  pub fn new(path: impl Into<PathBuf>, format: RecordFormat) -> Self {
    Self {
      path: path.into(),
      format,
    }
  }

  fn to_json(frame: &RgbImage, result: &[Annotation]) -> Result<String, RecordFileError> {
    let annotations: Vec<_> = result
      .iter()
      .map(|a| {
        json!({
          "label": a.label,
          "score": a.score,
          "caption": a.caption(),
          "rect": {
            "x": a.rect.x,
            "y": a.rect.y,
            "width": a.rect.width,
            "height": a.rect.height,
          },
        })
      })
      .collect();

    let record = json!({
      "width": frame.width(),
      "height": frame.height(),
      "annotations": annotations,
    });
    Ok(serde_json::to_string_pretty(&record)?)
  }

  fn to_text(result: &[Annotation]) -> String {
    result
      .iter()
      .map(|a| {
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          a.label, a.score, a.rect.x, a.rect.y, a.rect.width, a.rect.height
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

impl Render<RgbImage, [Annotation]> for RecordFileOutput {
  type Error = RecordFileError;

  fn render_result(&self, frame: &RgbImage, result: &[Annotation]) -> Result<(), Self::Error> {
    let content = match self.format {
      RecordFormat::Json => Self::to_json(frame, result)?,
      RecordFormat::Text => Self::to_text(result),
    };

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, content)?;
    info!("保存 {} 条标注到文件: {}", result.len(), self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::Rect;

  fn annotations() -> Vec<Annotation> {
    vec![
      Annotation {
        rect: Rect {
          x: 40,
          y: 10,
          width: 120,
          height: 50,
        },
        score: 0.75,
        label: "person".to_string(),
      },
      Annotation {
        rect: Rect {
          x: 5,
          y: 5,
          width: -2,
          height: 3,
        },
        score: 0.5625,
        label: String::new(),
      },
    ]
  }

  #[test]
  fn test_json_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    RecordFileOutput::new(&path, RecordFormat::Json)
      .render_result(&RgbImage::new(200, 100), &annotations())
      .unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["width"], 200);
    assert_eq!(value["annotations"][0]["label"], "person");
    assert_eq!(value["annotations"][0]["caption"], "person:75%");
    assert_eq!(value["annotations"][0]["rect"]["width"], 120);
    assert_eq!(value["annotations"][1]["rect"]["width"], -2);
    assert_eq!(value["annotations"][1]["label"], "");
  }

  #[test]
  fn test_text_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    RecordFileOutput::new(&path, RecordFormat::Text)
      .render_result(&RgbImage::new(200, 100), &annotations())
      .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
      content,
      "person, 0.7500, 40, 10, 120, 50\n, 0.5625, 5, 5, -2, 3"
    );
  }

  #[test]
  fn test_format_from_query() {
    let url = Url::parse("record:///tmp/out.txt?format=txt").unwrap();
    assert_eq!(
      RecordFileOutput::from_url(&url).unwrap().format,
      RecordFormat::Text
    );

    let url = Url::parse("record:///tmp/out.csv?format=csv").unwrap();
    assert!(matches!(
      RecordFileOutput::from_url(&url),
      Err(RecordFileError::UnknownFormat(_))
    ));
  }

  #[test]
  fn test_percent_encoded_path_is_decoded() {
    let url = Url::parse("record:///tmp/out dir/%E7%BB%93%E6%9E%9C.json").unwrap();
    assert_eq!(
      RecordFileOutput::from_url(&url).unwrap().path,
      PathBuf::from("/tmp/out dir/结果.json")
    );

    let url = Url::parse("record://remote-host/tmp/out.json").unwrap();
    assert!(matches!(
      RecordFileOutput::from_url(&url),
      Err(RecordFileError::InvalidPath(_))
    ));
  }
}
