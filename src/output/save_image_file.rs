// 该文件是 Biaozhu （标注） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  decode::Annotation,
  output::{
    Render,
    draw::{Draw, FontLoadError},
  },
};

/// 将标注绘制到图像上并保存，如 `image:///out.jpg?font=/usr/share/fonts/DejaVuSans.ttf`
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体错误: {0}")]
  FontError(#[from] FontLoadError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的文件路径: {0}")]
  InvalidPath(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = uri
      .to_file_path()
      .map_err(|_| SaveImageFileError::InvalidPath(uri.to_string()))?;

    let mut draw = Draw::default();
    for (k, v) in uri.query_pairs() {
      match &*k {
        "font" => draw = draw.with_font_file(v.into_owned())?,
        "font_size" => {
          if let Ok(size) = v.parse::<f32>() {
            draw = draw.with_font_size(size);
          }
        }
        _ => {}
      }
    }

    Ok(SaveImageFileOutput { path, draw })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      path: path.into(),
      draw,
    }
  }

  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RgbImage, [Annotation]> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &[Annotation]) -> Result<(), Self::Error> {
    let mut image = frame.clone();
    self.draw.draw_annotations(&mut image, result);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decode::Rect;

  #[test]
  fn test_saves_annotated_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("output.png");
    let output = SaveImageFileOutput::new(&path, Draw::default());

    let annotations = vec![Annotation {
      rect: Rect {
        x: 1,
        y: 1,
        width: 6,
        height: 6,
      },
      score: 0.9,
      label: "cat".to_string(),
    }];
    output
      .render_result(&RgbImage::new(10, 10), &annotations)
      .unwrap();

    let saved = image::open(&path).unwrap().into_rgb8();
    assert_eq!(saved.dimensions(), (10, 10));
    assert_eq!(saved.get_pixel(1, 1).0, [255, 0, 0]);
  }

  #[test]
  fn test_scheme_mismatch() {
    let url = Url::parse("record:///tmp/output.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn test_saves_to_path_with_spaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out dir").join("output.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    assert!(url.path().contains("%20"));

    SaveImageFileOutput::from_url(&url)
      .unwrap()
      .render_result(&RgbImage::new(4, 4), &[])
      .unwrap();
    assert!(path.exists());
  }
}
