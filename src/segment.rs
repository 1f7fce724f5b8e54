// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/segment.rs - 实例分割流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::config::SegmentConfig;
use crate::predict::{class_color, PolyPoint, Prediction};
use crate::tensor::{Prototype, RawPrediction};

pub const SEGMENT_INPUT_W: u32 = 640;
pub const SEGMENT_INPUT_H: u32 = 640;

#[derive(Error, Debug)]
pub enum SegmentError {
  #[error("类别数量不匹配: 张量含 {tensor} 类, 标签表含 {labels} 类")]
  ClassCountMismatch { tensor: usize, labels: usize },
  #[error("掩膜系数长度不匹配: 原型含 {expected} 通道, 系数长度 {actual}")]
  CoeffLengthMismatch { expected: usize, actual: usize },
}

/// 轴对齐边界框，角点坐标形式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  /// 退化的框（宽或高不为正）面积记为零
  pub fn area(&self) -> f32 {
    self.width().max(0.0) * self.height().max(0.0)
  }

  /// 计算两个边界框的交并比，并集不为正时返回 0
  pub fn iou(&self, other: &BBox) -> f32 {
    let x1 = self.x1.max(other.x1);
    let y1 = self.y1.max(other.y1);
    let x2 = self.x2.min(other.x2);
    let y2 = self.y2.min(other.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 { intersection / union } else { 0.0 }
  }
}

/// 掩膜网格坐标系（y 向下）中的整数点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
  pub x: i32,
  pub y: i32,
}

/// 通过阈值筛选的检测候选
#[derive(Debug, Clone)]
pub struct Candidate {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: usize,
  pub coeffs: Box<[f32]>,
}

/// 裁剪后的二值掩膜，像素值为 0 或 255。
/// origin 记录裁剪窗口在处理分辨率坐标系中的整数原点。
#[derive(Debug, Clone)]
pub struct BinaryMask {
  pub width: usize,
  pub height: usize,
  pub origin_x: usize,
  pub origin_y: usize,
  pub data: Box<[u8]>,
}

impl BinaryMask {
  pub fn empty() -> Self {
    BinaryMask {
      width: 0,
      height: 0,
      origin_x: 0,
      origin_y: 0,
      data: Vec::new().into_boxed_slice(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  #[inline]
  pub fn at(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }
}

/// 实例分割流水线。
///
/// 持有模型侧的不变数据（标签表、颜色表、模型输入尺寸）；
/// 配置作为不可变值随每次调用传入，见 [`SegmentConfig`]。
pub struct SegmentPipeline {
  classes: Box<[String]>,
  colors: HashMap<String, String>,
  model_width: u32,
  model_height: u32,
}

impl SegmentPipeline {
  pub fn new(classes: Vec<String>) -> Self {
    SegmentPipeline {
      classes: classes.into_boxed_slice(),
      colors: HashMap::new(),
      model_width: SEGMENT_INPUT_W,
      model_height: SEGMENT_INPUT_H,
    }
  }

  /// 类别到 `#rrggbb` 颜色的映射
  pub fn with_colors(mut self, colors: HashMap<String, String>) -> Self {
    self.colors = colors;
    self
  }

  /// 模型输入分辨率，预测张量中的框坐标以此为准
  pub fn with_model_size(mut self, width: u32, height: u32) -> Self {
    self.model_width = width;
    self.model_height = height;
    self
  }

  pub fn classes(&self) -> &[String] {
    &self.classes
  }

  /// 运行完整的分割流水线: 解析、NMS、掩膜重建、轮廓跟踪、结果组装。
  ///
  /// 解析不到候选或 NMS 全部抑制时返回空表，这是正常的"无目标"结果；
  /// 张量形状与标签表冲突时返回错误。
  pub fn run(
    &self,
    prediction: &RawPrediction,
    prototype: &Prototype,
    image_width: u32,
    image_height: u32,
    config: &SegmentConfig,
  ) -> Result<Vec<Prediction>, SegmentError> {
    if prediction.num_classes() != self.classes.len() {
      return Err(SegmentError::ClassCountMismatch {
        tensor: prediction.num_classes(),
        labels: self.classes.len(),
      });
    }

    let (proc_w, proc_h) = config.processing_mode.processing_size(
      (image_width, image_height),
      (self.model_width, self.model_height),
    );
    let scale = (
      proc_w as f32 / self.model_width as f32,
      proc_h as f32 / self.model_height as f32,
    );

    let candidates = parse_candidates(prediction, config.confidence_threshold, scale);
    debug!("阈值筛选后剩余 {} 个候选框", candidates.len());

    let mut kept = non_max_suppression(candidates, config.iou_threshold);
    kept.truncate(config.max_objects);
    debug!("NMS 后保留 {} 个检测", kept.len());

    if kept.is_empty() {
      return Ok(Vec::new());
    }

    let masks = reconstruct_masks(prototype, &kept, proc_w as usize, proc_h as usize)?;

    let scale_x = image_width as f32 / proc_w as f32;
    let scale_y = image_height as f32 / proc_h as f32;

    let mut predictions = Vec::with_capacity(kept.len());
    for (det, mask) in kept.iter().zip(masks) {
      let polygons = mask_to_polygons(&mask);
      let ring = select_polygon(&polygons)
        .map(|poly| decimate_ring(poly, config.max_polygon_points))
        .unwrap_or_default();

      // 轮廓点从裁剪窗口坐标平移回处理分辨率，再缩放到原图
      let points = ring
        .iter()
        .map(|p| PolyPoint {
          x: (p.x + mask.origin_x as i32) as f32 * scale_x,
          y: (p.y + mask.origin_y as i32) as f32 * scale_y,
        })
        .collect();

      let class_name = self.classes[det.class_id].clone();
      let color = class_color(&self.colors, &class_name);

      predictions.push(Prediction::InstanceSegmentation {
        x: (det.bbox.x1 + det.bbox.x2) / 2.0 * scale_x,
        y: (det.bbox.y1 + det.bbox.y2) / 2.0 * scale_y,
        width: det.bbox.width() * scale_x,
        height: det.bbox.height() * scale_y,
        class_name,
        confidence: det.score,
        color,
        points,
        mask: config.keep_masks.then_some(mask),
      });
    }

    debug!("组装 {} 条分割预测", predictions.len());
    Ok(predictions)
  }

  /// 仅运行解析与 NMS 两个阶段，产出检测框预测，无需原型张量
  pub fn run_boxes(
    &self,
    prediction: &RawPrediction,
    image_width: u32,
    image_height: u32,
    config: &SegmentConfig,
  ) -> Result<Vec<Prediction>, SegmentError> {
    if prediction.num_classes() != self.classes.len() {
      return Err(SegmentError::ClassCountMismatch {
        tensor: prediction.num_classes(),
        labels: self.classes.len(),
      });
    }

    let (proc_w, proc_h) = config.processing_mode.processing_size(
      (image_width, image_height),
      (self.model_width, self.model_height),
    );
    let scale = (
      proc_w as f32 / self.model_width as f32,
      proc_h as f32 / self.model_height as f32,
    );

    let candidates = parse_candidates(prediction, config.confidence_threshold, scale);
    let mut kept = non_max_suppression(candidates, config.iou_threshold);
    kept.truncate(config.max_objects);

    let scale_x = image_width as f32 / proc_w as f32;
    let scale_y = image_height as f32 / proc_h as f32;

    let predictions = kept
      .iter()
      .map(|det| {
        let class_name = self.classes[det.class_id].clone();
        let color = class_color(&self.colors, &class_name);
        Prediction::ObjectDetection {
          x: (det.bbox.x1 + det.bbox.x2) / 2.0 * scale_x,
          y: (det.bbox.y1 + det.bbox.y2) / 2.0 * scale_y,
          width: det.bbox.width() * scale_x,
          height: det.bbox.height() * scale_y,
          class_name,
          confidence: det.score,
          color,
        }
      })
      .collect();

    Ok(predictions)
  }

  /// 按阈值筛选各类别得分，降序给出分类预测
  pub fn classify_scores(
    &self,
    scores: &[f32],
    config: &SegmentConfig,
  ) -> Result<Vec<Prediction>, SegmentError> {
    if scores.len() != self.classes.len() {
      return Err(SegmentError::ClassCountMismatch {
        tensor: scores.len(),
        labels: self.classes.len(),
      });
    }

    let mut predictions: Vec<Prediction> = scores
      .iter()
      .enumerate()
      .filter(|&(_, &score)| score >= config.confidence_threshold)
      .map(|(index, &score)| Prediction::Classification {
        class_name: self.classes[index].clone(),
        confidence: score,
        class_index: index,
      })
      .collect();

    predictions.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
    Ok(predictions)
  }
}

mod contour;
mod mask;
mod nms;
mod parse;

pub use self::contour::{decimate_ring, mask_to_polygons, select_polygon};
pub use self::mask::reconstruct_masks;
pub use self::nms::non_max_suppression;
pub use self::parse::parse_candidates;
