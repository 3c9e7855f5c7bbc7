// 该文件是 Biaozhu （标注） 项目的一部分。
// src/label_map.rs - 标签映射文件解析
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

//! 标签映射（label map）解析。
//!
//! 标签映射文件由若干个块组成：
//!
//! ```text
//! item {
//!   name: "/m/01g317"
//!   id: 1
//!   display_name: "person"
//! }
//! ```
//!
//! 每个块解析为一个 [`LabelEntry`]，整个文件解析为一个 [`LabelCatalog`]。

use std::{collections::HashMap, path::Path, str::FromStr};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

#[derive(Error, Debug)]
pub enum LabelMapError {
  #[error("标签映射格式错误 (第 {line} 行): {reason}")]
  Malformed { line: usize, reason: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

impl LabelMapError {
  fn malformed(line: usize, reason: impl Into<String>) -> Self {
    LabelMapError::Malformed {
      line,
      reason: reason.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
  pub id: i64,
  pub name: String,
  pub display_name: String,
}

/// 类别 id 到显示名称的目录，条目顺序与文件顺序一致
#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
  items: Vec<LabelEntry>,
  index: HashMap<i64, usize>,
}

impl LabelCatalog {
  /// 由条目构建目录。重复的 id 以后出现者为准，并占据先出现者的位置。
  pub fn from_entries(entries: impl IntoIterator<Item = LabelEntry>) -> Self {
    let mut items: Vec<LabelEntry> = Vec::new();
    let mut index = HashMap::new();

    for entry in entries {
      match index.get(&entry.id) {
        Some(&pos) => {
          warn!("标签 id {} 重复出现, 使用后出现的定义", entry.id);
          items[pos] = entry;
        }
        None => {
          index.insert(entry.id, items.len());
          items.push(entry);
        }
      }
    }

    LabelCatalog { items, index }
  }

  pub fn parse(text: &str) -> Result<Self, LabelMapError> {
    let entries = LabelMapParser::default().parse(text)?;
    debug!("解析得到 {} 个标签", entries.len());
    Ok(Self::from_entries(entries))
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelMapError> {
    let path = path.as_ref();
    info!("加载标签映射文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::parse(&text)
  }

  pub fn items(&self) -> &[LabelEntry] {
    &self.items
  }

  pub fn get(&self, id: i64) -> Option<&LabelEntry> {
    self.index.get(&id).map(|&pos| &self.items[pos])
  }

  pub fn display_name(&self, id: i64) -> Option<&str> {
    self.get(id).map(|entry| entry.display_name.as_str())
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl FromStr for LabelCatalog {
  type Err = LabelMapError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

#[derive(Default)]
struct PartialEntry {
  opened_at: usize,
  id: Option<i64>,
  name: String,
  display_name: String,
}

impl PartialEntry {
  fn set(&mut self, line: usize, key: &str, value: &str) -> Result<(), LabelMapError> {
    match key {
      "id" => {
        let id = value
          .parse::<i64>()
          .map_err(|e| LabelMapError::malformed(line, format!("id 不是整数 '{}': {}", value, e)))?;
        self.id = Some(id);
      }
      "name" => self.name = unquote(value).to_string(),
      "display_name" => self.display_name = unquote(value).to_string(),
      _ => debug!("第 {} 行: 忽略未知字段 '{}'", line, key),
    }
    Ok(())
  }

  fn finish(self, line: usize) -> Result<LabelEntry, LabelMapError> {
    let id = self.id.ok_or_else(|| {
      LabelMapError::malformed(line, format!("第 {} 行开始的块缺少 id", self.opened_at))
    })?;
    Ok(LabelEntry {
      id,
      name: self.name,
      display_name: self.display_name,
    })
  }
}

#[derive(Default)]
struct LabelMapParser {
  current: Option<PartialEntry>,
  entries: Vec<LabelEntry>,
}

impl LabelMapParser {
  fn parse(mut self, text: &str) -> Result<Vec<LabelEntry>, LabelMapError> {
    for (idx, raw) in text.lines().enumerate() {
      self.feed(idx + 1, raw)?;
    }

    if let Some(open) = self.current {
      return Err(LabelMapError::malformed(
        open.opened_at,
        "块没有闭合",
      ));
    }

    Ok(self.entries)
  }

  fn feed(&mut self, line: usize, raw: &str) -> Result<(), LabelMapError> {
    let content = raw.trim();
    trace!("第 {} 行: {}", line, content);

    if content.is_empty() {
      return Err(LabelMapError::malformed(line, "不允许空行"));
    }

    if let Some(tag) = content.strip_suffix('{') {
      let tag = tag.trim();
      if !tag.is_empty() && !is_keyword(tag) {
        return Err(LabelMapError::malformed(
          line,
          format!("块起始行包含无法识别的内容 '{}'", tag),
        ));
      }
      if self.current.is_some() {
        return Err(LabelMapError::malformed(line, "不支持嵌套块"));
      }
      self.current = Some(PartialEntry {
        opened_at: line,
        ..Default::default()
      });
      return Ok(());
    }

    if content == "}" {
      let open = self
        .current
        .take()
        .ok_or_else(|| LabelMapError::malformed(line, "'}' 没有对应的块起始"))?;
      self.entries.push(open.finish(line)?);
      return Ok(());
    }

    let (key, value) = content
      .split_once(':')
      .ok_or_else(|| LabelMapError::malformed(line, format!("无法识别的行 '{}'", content)))?;
    let key = key.trim();
    if key.is_empty() {
      return Err(LabelMapError::malformed(line, "字段名为空"));
    }

    let entry = self
      .current
      .as_mut()
      .ok_or_else(|| LabelMapError::malformed(line, format!("字段 '{}' 不在任何块内", key)))?;
    entry.set(line, key, value.trim())
  }
}

fn is_keyword(token: &str) -> bool {
  let mut chars = token.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// 去掉一层外围双引号，不做其他反转义
fn unquote(value: &str) -> &str {
  value
    .strip_prefix('"')
    .and_then(|v| v.strip_suffix('"'))
    .unwrap_or(value)
}
