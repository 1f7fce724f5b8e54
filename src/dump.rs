// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/dump.rs - 张量转储输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use serde::Deserialize;
use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  segment::{SEGMENT_INPUT_H, SEGMENT_INPUT_W, SegmentPipeline},
  tensor::{Prototype, RawPrediction, TensorError},
};

#[derive(Error, Debug)]
pub enum TensorDumpError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("张量错误: {0}")]
  TensorError(#[from] TensorError),
}

fn default_model_width() -> u32 {
  SEGMENT_INPUT_W
}

fn default_model_height() -> u32 {
  SEGMENT_INPUT_H
}

/// 推理端导出的张量转储。
///
/// 字段对应推理端两路输出: `prediction` 是列主序的检测头张量,
/// `prototype` 是展平的原型平面。模型输入尺寸缺省取 640x640。
#[derive(Debug, Clone, Deserialize)]
pub struct TensorDump {
  pub num_classes: usize,
  pub num_masks: usize,
  pub classes: Vec<String>,
  #[serde(default)]
  pub colors: HashMap<String, String>,
  #[serde(default = "default_model_width")]
  pub model_width: u32,
  #[serde(default = "default_model_height")]
  pub model_height: u32,
  pub image_width: u32,
  pub image_height: u32,
  pub prediction: Vec<f32>,
  pub prototype: Vec<f32>,
  pub prototype_height: usize,
  pub prototype_width: usize,
}

pub struct TensorDumpInput {
  dump: TensorDump,
}

impl FromUrlWithScheme for TensorDumpInput {
  const SCHEME: &'static str = "tensor";
}

impl FromUrl for TensorDumpInput {
  type Error = TensorDumpError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(TensorDumpError::SchemeMismatch);
    }

    let file = File::open(url.path())?;
    let dump = serde_json::from_reader(BufReader::new(file))?;

    Ok(TensorDumpInput { dump })
  }
}

impl TensorDumpInput {
  pub fn image_size(&self) -> (u32, u32) {
    (self.dump.image_width, self.dump.image_height)
  }

  /// 按转储里的类别表、配色与模型输入尺寸组装流水线
  pub fn pipeline(&self) -> SegmentPipeline {
    SegmentPipeline::new(self.dump.classes.clone())
      .with_colors(self.dump.colors.clone())
      .with_model_size(self.dump.model_width, self.dump.model_height)
  }

  pub fn tensors(&self) -> Result<(RawPrediction, Prototype), TensorDumpError> {
    let prediction = RawPrediction::new(
      self.dump.prediction.clone(),
      self.dump.num_classes,
      self.dump.num_masks,
    )?;
    let prototype = Prototype::from_flat(
      self.dump.prototype.clone(),
      self.dump.num_masks,
      self.dump.prototype_height,
      self.dump.prototype_width,
    )?;
    Ok((prediction, prototype))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_json() -> String {
    r#"{
      "num_classes": 2,
      "num_masks": 1,
      "classes": ["cat", "dog"],
      "image_width": 1280,
      "image_height": 960,
      "prediction": [320.0, 320.0, 100.0, 100.0, 0.9, 0.1, 1.0],
      "prototype": [1.0, 1.0, 1.0, 1.0],
      "prototype_height": 2,
      "prototype_width": 2
    }"#
      .to_string()
  }

  #[test]
  fn load_fills_defaults() {
    let dump: TensorDump = serde_json::from_str(&sample_json()).unwrap();

    assert_eq!(dump.model_width, SEGMENT_INPUT_W);
    assert_eq!(dump.model_height, SEGMENT_INPUT_H);
    assert!(dump.colors.is_empty());
    assert_eq!(dump.classes, vec!["cat", "dog"]);
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("file:///tmp/dump.json").unwrap();
    assert!(matches!(
      TensorDumpInput::from_url(&url),
      Err(TensorDumpError::SchemeMismatch)
    ));
  }

  #[test]
  fn loads_dump_and_builds_tensors() {
    let path = std::env::temp_dir().join("goule-dump-input-test.json");
    std::fs::write(&path, sample_json()).unwrap();

    let url = Url::parse(&format!("tensor://{}", path.display())).unwrap();
    let input = TensorDumpInput::from_url(&url).unwrap();

    assert_eq!(input.image_size(), (1280, 960));

    let (prediction, prototype) = input.tensors().unwrap();
    assert_eq!(prediction.num_detections(), 1);
    assert_eq!(prototype.channels(), 1);

    let pipeline = input.pipeline();
    assert_eq!(pipeline.classes(), ["cat", "dog"]);

    std::fs::remove_file(&path).ok();
  }
}
