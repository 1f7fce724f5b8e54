// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/segment/parse.rs - 候选框解析
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use rayon::prelude::*;

use crate::segment::{BBox, Candidate};
use crate::tensor::{RawPrediction, BOX_FIELDS};

const FIELD_CX: usize = 0;
const FIELD_CY: usize = 1;
const FIELD_W: usize = 2;
const FIELD_H: usize = 3;

/// 解析扁平预测张量中的检测候选。
///
/// 每个检测索引的扫描彼此独立，在 rayon 线程池上并行执行，
/// 收集的结果保持检测索引顺序。最佳类别得分不足阈值的候选
/// 在复制掩膜系数之前就被丢弃。框坐标按 scale 从模型空间
/// 缩放到处理分辨率空间。
pub fn parse_candidates(pred: &RawPrediction, threshold: f32, scale: (f32, f32)) -> Vec<Candidate> {
  let num_classes = pred.num_classes();
  let num_masks = pred.num_masks();
  let coeff_base = BOX_FIELDS + num_classes;

  (0..pred.num_detections())
    .into_par_iter()
    .filter_map(|index| {
      // 类别得分取第一个最大值, 同分取更小的类别编号
      let mut best_score = pred.at(BOX_FIELDS, index);
      let mut best_class = 0usize;
      for class in 1..num_classes {
        let score = pred.at(BOX_FIELDS + class, index);
        if score > best_score {
          best_score = score;
          best_class = class;
        }
      }

      if best_score < threshold {
        return None;
      }

      let cx = pred.at(FIELD_CX, index);
      let cy = pred.at(FIELD_CY, index);
      let w = pred.at(FIELD_W, index);
      let h = pred.at(FIELD_H, index);

      let coeffs: Box<[f32]> = (0..num_masks)
        .map(|m| pred.at(coeff_base + m, index))
        .collect();

      Some(Candidate {
        bbox: BBox {
          x1: (cx - w / 2.0) * scale.0,
          y1: (cy - h / 2.0) * scale.1,
          x2: (cx + w / 2.0) * scale.0,
          y2: (cy + h / 2.0) * scale.1,
        },
        score: best_score,
        class_id: best_class,
        coeffs,
      })
    })
    .collect()
}
