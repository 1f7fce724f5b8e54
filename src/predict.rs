// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/predict.rs - 预测结果定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::segment::BinaryMask;

/// 类别缺省颜色
pub const DEFAULT_COLOR_HEX: &str = "#ff0000";

const FALLBACK_GRAY: Color = Color([128, 128, 128]);

/// RGB 颜色，序列化为 [r, g, b] 数组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
  /// 解析 `#rrggbb` 形式的十六进制颜色。
  /// 先去除首尾空白与 `#` 前缀；格式不合法时退回灰色。
  pub fn from_hex(hex: &str) -> Color {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 {
      warn!("颜色格式不合法: {:?}", hex);
      return FALLBACK_GRAY;
    }
    match u32::from_str_radix(digits, 16) {
      Ok(value) => Color([
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
      ]),
      Err(_) => {
        warn!("颜色格式不合法: {:?}", hex);
        FALLBACK_GRAY
      }
    }
  }
}

/// 查询类别显示颜色，颜色表中缺失时使用默认红色
pub fn class_color(colors: &HashMap<String, String>, class_name: &str) -> Color {
  let hex = colors
    .get(class_name)
    .map(String::as_str)
    .unwrap_or(DEFAULT_COLOR_HEX);
  Color::from_hex(hex)
}

/// 多边形顶点，原图像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolyPoint {
  pub x: f32,
  pub y: f32,
}

/// 预测结果。
///
/// 不同任务的结果共用一个枚举，JSON 中以 kind 字段区分种类。
/// 检测与分割结果的 x, y 为边界框中心，坐标系为 y 向下的原图像素。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Prediction {
  /// 分类结果
  #[serde(rename_all = "camelCase")]
  Classification {
    #[serde(rename = "class")]
    class_name: String,
    confidence: f32,
    class_index: usize,
  },
  /// 目标检测结果
  #[serde(rename_all = "camelCase")]
  ObjectDetection {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(rename = "class")]
    class_name: String,
    confidence: f32,
    color: Color,
  },
  /// 实例分割结果
  #[serde(rename_all = "camelCase")]
  InstanceSegmentation {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(rename = "class")]
    class_name: String,
    confidence: f32,
    color: Color,
    /// 闭合轮廓顶点，掩膜退化时为空
    points: Vec<PolyPoint>,
    /// 仅在配置要求保留时填充，不参与序列化
    #[serde(skip)]
    mask: Option<BinaryMask>,
  },
}

impl Prediction {
  pub fn class_name(&self) -> &str {
    match self {
      Prediction::Classification { class_name, .. }
      | Prediction::ObjectDetection { class_name, .. }
      | Prediction::InstanceSegmentation { class_name, .. } => class_name,
    }
  }

  pub fn confidence(&self) -> f32 {
    match self {
      Prediction::Classification { confidence, .. }
      | Prediction::ObjectDetection { confidence, .. }
      | Prediction::InstanceSegmentation { confidence, .. } => *confidence,
    }
  }

  /// 序列化为 JSON 值
  pub fn to_value(&self) -> serde_json::Value {
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hex_color_parsing() {
    assert_eq!(Color::from_hex("#ff0000"), Color([255, 0, 0]));
    assert_eq!(Color::from_hex("00ff7f"), Color([0, 255, 127]));
    assert_eq!(Color::from_hex("  #4892EA \n"), Color([0x48, 0x92, 0xea]));
  }

  #[test]
  fn malformed_hex_falls_back_to_gray() {
    assert_eq!(Color::from_hex(""), FALLBACK_GRAY);
    assert_eq!(Color::from_hex("#fff"), FALLBACK_GRAY);
    assert_eq!(Color::from_hex("#zzzzzz"), FALLBACK_GRAY);
    assert_eq!(Color::from_hex("#ff00001"), FALLBACK_GRAY);
  }

  #[test]
  fn missing_class_uses_default_red() {
    let mut colors = HashMap::new();
    colors.insert("cat".to_string(), "#00ff00".to_string());

    assert_eq!(class_color(&colors, "cat"), Color([0, 255, 0]));
    assert_eq!(class_color(&colors, "dog"), Color([255, 0, 0]));
  }

  #[test]
  fn classification_json_shape() {
    let prediction = Prediction::Classification {
      class_name: "cat".to_string(),
      confidence: 0.9,
      class_index: 3,
    };
    let value = prediction.to_value();

    assert_eq!(value["kind"], "classification");
    assert_eq!(value["class"], "cat");
    assert_eq!(value["classIndex"], 3);
  }

  #[test]
  fn segmentation_json_skips_mask() {
    let prediction = Prediction::InstanceSegmentation {
      x: 10.0,
      y: 20.0,
      width: 4.0,
      height: 6.0,
      class_name: "cat".to_string(),
      confidence: 0.75,
      color: Color([255, 0, 0]),
      points: vec![PolyPoint { x: 1.0, y: 2.0 }, PolyPoint { x: 1.0, y: 2.0 }],
      mask: Some(BinaryMask {
        width: 1,
        height: 1,
        origin_x: 0,
        origin_y: 0,
        data: vec![255].into_boxed_slice(),
      }),
    };
    let value = prediction.to_value();

    assert_eq!(value["kind"], "instanceSegmentation");
    assert_eq!(value["color"], serde_json::json!([255, 0, 0]));
    assert_eq!(value["points"][0]["x"], 1.0);
    assert!(value.get("mask").is_none());
  }
}
