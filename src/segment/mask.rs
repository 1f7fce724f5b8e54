// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/segment/mask.rs - 掩膜重建
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ndarray::Array2;
use tracing::debug;

use crate::segment::{BBox, BinaryMask, Candidate, SegmentError};
use crate::tensor::Prototype;

/// 前景阈值: sigmoid 输出不小于该值的像素记为前景
const MASK_THRESHOLD: f32 = 0.5;
const FOREGROUND: u8 = 255;

/// 由掩膜系数与原型张量重建每个保留检测的二值掩膜。
///
/// 系数矩阵 [N, C] 与原型 [C, 高×宽] 相乘后逐元素过 sigmoid，
/// 每行掩膜平面按检测框在处理分辨率下的整数裁剪窗口采样、二值化。
/// 任一系数向量长度与原型通道数不符即整个调用报错；
/// 裁剪窗口退化的检测产出空掩膜，由下游跳过。
pub fn reconstruct_masks(
  prototype: &Prototype,
  kept: &[Candidate],
  proc_w: usize,
  proc_h: usize,
) -> Result<Vec<BinaryMask>, SegmentError> {
  if kept.is_empty() {
    return Ok(Vec::new());
  }

  let channels = prototype.channels();
  for det in kept {
    if det.coeffs.len() != channels {
      return Err(SegmentError::CoeffLengthMismatch {
        expected: channels,
        actual: det.coeffs.len(),
      });
    }
  }

  let proto_h = prototype.height();
  let proto_w = prototype.width();
  let spatial = proto_h * proto_w;
  if spatial == 0 {
    return Ok(kept.iter().map(|_| BinaryMask::empty()).collect());
  }

  debug!(
    "重建 {} 个掩膜, 原型 {}x{}x{}, 处理分辨率 {}x{}",
    kept.len(),
    channels,
    proto_h,
    proto_w,
    proc_w,
    proc_h
  );

  // [N, C] × [C, 高×宽] -> [N, 高×宽]
  let coeffs = Array2::from_shape_fn((kept.len(), channels), |(i, j)| kept[i].coeffs[j]);
  let planes = coeffs.dot(&prototype.view()).mapv_into(sigmoid);
  let flat = planes.into_raw_vec();

  let masks = kept
    .iter()
    .enumerate()
    .map(|(i, det)| {
      let plane = &flat[i * spatial..(i + 1) * spatial];
      crop_threshold(plane, proto_w, proto_h, proc_w, proc_h, &det.bbox)
    })
    .collect();

  Ok(masks)
}

/// 按检测框裁剪掩膜平面并二值化。
///
/// 裁剪窗口为 floor(min)..ceil(max) 与处理分辨率范围的交集，
/// 双线性采样只在窗口内计算，数值与先整幅缩放再裁剪完全一致。
fn crop_threshold(
  plane: &[f32],
  src_w: usize,
  src_h: usize,
  dst_w: usize,
  dst_h: usize,
  bbox: &BBox,
) -> BinaryMask {
  let col_start = bbox.x1.floor().max(0.0) as usize;
  let col_end = bbox.x2.ceil().min(dst_w as f32).max(0.0) as usize;
  let row_start = bbox.y1.floor().max(0.0) as usize;
  let row_end = bbox.y2.ceil().min(dst_h as f32).max(0.0) as usize;

  if col_end <= col_start || row_end <= row_start {
    return BinaryMask::empty();
  }

  let scale_x = src_w as f32 / dst_w as f32;
  let scale_y = src_h as f32 / dst_h as f32;

  let width = col_end - col_start;
  let height = row_end - row_start;
  let mut data = Vec::with_capacity(width * height);

  for y in row_start..row_end {
    for x in col_start..col_end {
      let value = sample_bilinear(plane, src_w, src_h, scale_x, scale_y, x, y);
      data.push(if value >= MASK_THRESHOLD { FOREGROUND } else { 0 });
    }
  }

  BinaryMask {
    width,
    height,
    origin_x: col_start,
    origin_y: row_start,
    data: data.into_boxed_slice(),
  }
}

/// 双线性采样。
/// 目标像素中心映射到源坐标 `(i + 0.5) * scale - 0.5`（不对齐角点），
/// 越界部分钳制到边缘像素。
#[inline]
fn sample_bilinear(
  plane: &[f32],
  src_w: usize,
  src_h: usize,
  scale_x: f32,
  scale_y: f32,
  x: usize,
  y: usize,
) -> f32 {
  let src_x = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (src_w - 1) as f32);
  let src_y = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (src_h - 1) as f32);

  let x0 = src_x.floor() as usize;
  let y0 = src_y.floor() as usize;
  let x1 = (x0 + 1).min(src_w - 1);
  let y1 = (y0 + 1).min(src_h - 1);
  let fx = src_x - x0 as f32;
  let fy = src_y - y0 as f32;

  let top = plane[y0 * src_w + x0] * (1.0 - fx) + plane[y0 * src_w + x1] * fx;
  let bottom = plane[y1 * src_w + x0] * (1.0 - fx) + plane[y1 * src_w + x1] * fx;
  top * (1.0 - fy) + bottom * fy
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
