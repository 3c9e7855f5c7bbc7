// 该文件是 Biaozhu （标注） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontVec, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::decode::Annotation;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 14.0;
const LABEL_OFFSET: i32 = 5; // 文本相对于框右上角的偏移
const BOX_LINE_WIDTH: i32 = 2;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色

#[derive(Error, Debug)]
pub enum FontLoadError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  line_width: i32,
  color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      line_width: BOX_LINE_WIDTH,
      color: BOX_COLOR,
    }
  }
}

impl Draw {
  /// 从字体文件加载标签字体，未加载字体时只绘制边框
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, FontLoadError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn draw_annotations(&self, image: &mut RgbImage, annotations: &[Annotation]) {
    if self.font.is_none() && !annotations.is_empty() {
      warn!("未配置字体, 仅绘制边框");
    }
    for annotation in annotations {
      self.draw_annotation(image, annotation);
    }
  }

  fn draw_annotation(&self, image: &mut RgbImage, annotation: &Annotation) {
    let rect = annotation.rect;
    if rect.is_degenerate() {
      warn!(
        "跳过无法绘制的检测框 '{}': ({}, {}, {}x{})",
        annotation.label, rect.x, rect.y, rect.width, rect.height
      );
      return;
    }

    let color = Rgb(self.color);

    let (img_w, img_h) = (image.width() as i64, image.height() as i64);

    // 逐像素向内收缩绘制加粗边框，边界在 i64 下计算并裁剪到图像外一像素
    for t in 0..self.line_width as i64 {
      let left = rect.x as i64 + t;
      let top = rect.y as i64 + t;
      let right = rect.x as i64 + rect.width as i64 - 1 - t;
      let bottom = rect.y as i64 + rect.height as i64 - 1 - t;
      if left > right || top > bottom {
        break;
      }
      if right < 0 || bottom < 0 || left >= img_w || top >= img_h {
        continue;
      }

      let (left, top) = (left.max(-1), top.max(-1));
      let (right, bottom) = (right.min(img_w), bottom.min(img_h));
      let r = Rect::at(left as i32, top as i32)
        .of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, r, color);
    }

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        color,
        rect.right().saturating_add(LABEL_OFFSET),
        rect.y.saturating_add(LABEL_OFFSET),
        PxScale::from(self.font_size),
        font,
        &annotation.caption(),
      );
    }
  }
}
