// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/tensor.rs - 张量容器定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// 边界框字段数量: cx, cy, w, h
pub const BOX_FIELDS: usize = 4;

#[derive(Error, Debug)]
pub enum TensorError {
  #[error("预测张量长度错误: 长度 {len} 无法按步长 {stride} 整除")]
  PredictionLength { len: usize, stride: usize },
  #[error("原型张量长度错误: 期望 {expected}, 实际 {actual}")]
  PrototypeLength { expected: usize, actual: usize },
  #[error("类别数量不能为零")]
  NoClasses,
}

/// 模型输出的扁平预测张量。
///
/// 布局按字段连续（列主序）: 同一字段的所有检测值连续存放，
/// 寻址方式为 `field * num_detections + index`，而非按检测连续。
/// 字段顺序: cx, cy, w, h, 各类别得分, 各掩膜系数。
#[derive(Debug, Clone)]
pub struct RawPrediction {
  data: Box<[f32]>,
  num_classes: usize,
  num_masks: usize,
  num_detections: usize,
}

impl RawPrediction {
  pub fn new(data: Vec<f32>, num_classes: usize, num_masks: usize) -> Result<Self, TensorError> {
    if num_classes == 0 {
      return Err(TensorError::NoClasses);
    }

    let stride = BOX_FIELDS + num_classes + num_masks;
    if data.len() % stride != 0 {
      return Err(TensorError::PredictionLength {
        len: data.len(),
        stride,
      });
    }

    let num_detections = data.len() / stride;
    Ok(RawPrediction {
      data: data.into_boxed_slice(),
      num_classes,
      num_masks,
      num_detections,
    })
  }

  pub fn num_detections(&self) -> usize {
    self.num_detections
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn num_masks(&self) -> usize {
    self.num_masks
  }

  /// 读取第 index 个检测的第 field 行数值
  #[inline]
  pub fn at(&self, field: usize, index: usize) -> f32 {
    self.data[field * self.num_detections + index]
  }
}

/// 原型张量，语义形状为 [通道, 高, 宽]。
///
/// 所有检测的掩膜都由这些通道线性组合而来。
/// 数据内部按 [通道, 高×宽] 存放，推理调用期间只读共享。
#[derive(Debug, Clone)]
pub struct Prototype {
  data: Array2<f32>,
  height: usize,
  width: usize,
}

impl Prototype {
  pub fn from_flat(
    data: Vec<f32>,
    channels: usize,
    height: usize,
    width: usize,
  ) -> Result<Self, TensorError> {
    let expected = channels * height * width;
    let actual = data.len();
    let data = Array2::from_shape_vec((channels, height * width), data)
      .map_err(|_| TensorError::PrototypeLength { expected, actual })?;
    Ok(Prototype {
      data,
      height,
      width,
    })
  }

  pub fn channels(&self) -> usize {
    self.data.nrows()
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  /// 形状为 [通道, 高×宽] 的视图
  pub fn view(&self) -> ArrayView2<'_, f32> {
    self.data.view()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prediction_column_major_addressing() {
    // 2 个检测, 1 类, 1 掩膜通道: 步长 6
    // 字段行依次为 cx, cy, w, h, score, coeff
    let data = vec![
      10.0, 20.0, // cx
      11.0, 21.0, // cy
      12.0, 22.0, // w
      13.0, 23.0, // h
      0.9, 0.8, // score
      1.5, -1.5, // coeff
    ];
    let pred = RawPrediction::new(data, 1, 1).unwrap();

    assert_eq!(pred.num_detections(), 2);
    assert_eq!(pred.at(0, 0), 10.0);
    assert_eq!(pred.at(0, 1), 20.0);
    assert_eq!(pred.at(3, 1), 23.0);
    assert_eq!(pred.at(4, 0), 0.9);
    assert_eq!(pred.at(5, 1), -1.5);
  }

  #[test]
  fn prediction_rejects_bad_length() {
    let err = RawPrediction::new(vec![0.0; 7], 1, 1).unwrap_err();
    assert!(matches!(
      err,
      TensorError::PredictionLength { len: 7, stride: 6 }
    ));
  }

  #[test]
  fn prediction_rejects_zero_classes() {
    let err = RawPrediction::new(vec![0.0; 4], 0, 0).unwrap_err();
    assert!(matches!(err, TensorError::NoClasses));
  }

  #[test]
  fn prediction_empty_is_valid() {
    let pred = RawPrediction::new(Vec::new(), 2, 4).unwrap();
    assert_eq!(pred.num_detections(), 0);
  }

  #[test]
  fn prototype_shape_check() {
    let proto = Prototype::from_flat(vec![0.0; 24], 2, 3, 4).unwrap();
    assert_eq!(proto.channels(), 2);
    assert_eq!(proto.height(), 3);
    assert_eq!(proto.width(), 4);
    assert_eq!(proto.view().shape(), &[2, 12]);

    let err = Prototype::from_flat(vec![0.0; 23], 2, 3, 4).unwrap_err();
    assert!(matches!(
      err,
      TensorError::PrototypeLength {
        expected: 24,
        actual: 23
      }
    ));
  }
}
