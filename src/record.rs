// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/record.rs - 记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, predict::Prediction};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(serde_json::Error),
  #[cfg(feature = "save_mask_file")]
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

impl From<std::io::Error> for RecordOutputError {
  fn from(err: std::io::Error) -> Self {
    RecordOutputError::IoError(err)
  }
}

impl From<serde_json::Error> for RecordOutputError {
  fn from(err: serde_json::Error) -> Self {
    RecordOutputError::JsonError(err)
  }
}

/// 把预测结果写成 JSON 文件。
/// URI 形如 `json:///path/to/out.json`，带 `?pretty` 参数时缩进输出。
pub struct JsonRecordOutput {
  path: PathBuf,
  pretty: bool,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = RecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    let pretty = url.query_pairs().any(|(k, _)| k == "pretty");

    Ok(JsonRecordOutput {
      path: PathBuf::from(url.path()),
      pretty,
    })
  }
}

impl JsonRecordOutput {
  pub fn write(&self, predictions: &[Prediction]) -> Result<(), RecordOutputError> {
    let file = File::create(&self.path)?;
    let writer = BufWriter::new(file);

    if self.pretty {
      serde_json::to_writer_pretty(writer, predictions)?;
    } else {
      serde_json::to_writer(writer, predictions)?;
    }

    info!("预测结果已写入 {}", self.path.display());
    Ok(())
  }
}

/// 把保留的二值掩膜逐张存成灰度 PNG。
/// URI 形如 `masks:///path/to/dir`，文件名按预测序号编号。
#[cfg(feature = "save_mask_file")]
pub struct MaskDumpOutput {
  directory: PathBuf,
}

#[cfg(feature = "save_mask_file")]
impl FromUrlWithScheme for MaskDumpOutput {
  const SCHEME: &'static str = "masks";
}

#[cfg(feature = "save_mask_file")]
impl FromUrl for MaskDumpOutput {
  type Error = RecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    Ok(MaskDumpOutput {
      directory: PathBuf::from(url.path()),
    })
  }
}

#[cfg(feature = "save_mask_file")]
impl MaskDumpOutput {
  pub fn write(&self, predictions: &[Prediction]) -> Result<(), RecordOutputError> {
    std::fs::create_dir_all(&self.directory)?;

    let mut saved = 0usize;
    for (index, prediction) in predictions.iter().enumerate() {
      let Prediction::InstanceSegmentation {
        mask: Some(mask), ..
      } = prediction
      else {
        continue;
      };
      if mask.is_empty() {
        continue;
      }

      let Some(image) =
        image::GrayImage::from_raw(mask.width as u32, mask.height as u32, mask.data.to_vec())
      else {
        continue;
      };

      let path = self.directory.join(format!("mask-{index:03}.png"));
      image.save(&path)?;
      saved += 1;
    }

    info!("已保存 {} 张掩膜到 {}", saved, self.directory.display());
    Ok(())
  }
}
