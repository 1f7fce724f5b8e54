// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/config.rs - 流水线配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 掩膜处理分辨率模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
  /// 按原图分辨率处理，掩膜最精细
  Quality,
  /// 按模型输入分辨率处理
  #[default]
  Balanced,
  /// 按原图一半分辨率处理，速度优先
  Performance,
}

impl ProcessingMode {
  /// 给定原图尺寸与模型输入尺寸，返回处理分辨率
  pub fn processing_size(&self, image: (u32, u32), model: (u32, u32)) -> (u32, u32) {
    match self {
      ProcessingMode::Quality => image,
      ProcessingMode::Balanced => model,
      ProcessingMode::Performance => ((image.0 / 2).max(1), (image.1 / 2).max(1)),
    }
  }
}

impl std::str::FromStr for ProcessingMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "quality" => Ok(ProcessingMode::Quality),
      "balanced" => Ok(ProcessingMode::Balanced),
      "performance" => Ok(ProcessingMode::Performance),
      _ => Err(format!("未知的处理模式: {}", s)),
    }
  }
}

/// 流水线配置。
///
/// 配置是不可变值，在每次调用时显式传入，
/// 不同配置的并发调用互不影响。
#[derive(Debug, Clone)]
pub struct SegmentConfig {
  /// 置信度阈值，最佳类别得分低于该值的候选直接丢弃
  pub confidence_threshold: f32,
  /// NMS 交并比阈值
  pub iou_threshold: f32,
  /// NMS 之后保留的最大目标数量
  pub max_objects: usize,
  /// 掩膜处理分辨率模式
  pub processing_mode: ProcessingMode,
  /// 多边形顶点数量上限，超出时做等步长抽稀
  pub max_polygon_points: usize,
  /// 是否在预测结果中保留二值掩膜
  pub keep_masks: bool,
}

impl Default for SegmentConfig {
  fn default() -> Self {
    SegmentConfig {
      confidence_threshold: 0.5,
      iou_threshold: 0.4,
      max_objects: 20,
      processing_mode: ProcessingMode::Balanced,
      max_polygon_points: 500,
      keep_masks: false,
    }
  }
}

impl SegmentConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_max_objects(mut self, max_objects: usize) -> Self {
    self.max_objects = max_objects;
    self
  }

  pub fn with_processing_mode(mut self, mode: ProcessingMode) -> Self {
    self.processing_mode = mode;
    self
  }

  pub fn with_max_polygon_points(mut self, max_points: usize) -> Self {
    self.max_polygon_points = max_points;
    self
  }

  pub fn with_keep_masks(mut self, keep: bool) -> Self {
    self.keep_masks = keep;
    self
  }
}
