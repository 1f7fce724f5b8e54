// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/segment/nms.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use crate::segment::Candidate;

/// 非极大值抑制。
///
/// 候选按得分降序排序（稳定排序，同分保持解析顺序），每轮取出
/// 得分最高者，剔除与之交并比超过阈值的其余候选。抑制不区分类别，
/// 输出按得分降序排列。
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
  let total = candidates.len();
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept = Vec::new();

  while !candidates.is_empty() {
    let best = candidates.remove(0);
    candidates.retain(|det| best.bbox.iou(&det.bbox) <= iou_threshold);
    kept.push(best);
  }

  debug!("NMS: {} 个候选保留 {} 个", total, kept.len());
  kept
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::segment::BBox;

  fn candidate(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: usize) -> Candidate {
    Candidate {
      bbox: BBox { x1, y1, x2, y2 },
      score,
      class_id,
      coeffs: Vec::new().into_boxed_slice(),
    }
  }

  fn crowded() -> Vec<Candidate> {
    vec![
      candidate(0.0, 0.0, 10.0, 10.0, 0.8, 0),
      candidate(1.0, 1.0, 11.0, 11.0, 0.9, 0),
      candidate(2.0, 2.0, 12.0, 12.0, 0.7, 1),
      candidate(50.0, 50.0, 60.0, 60.0, 0.6, 0),
    ]
  }

  #[test]
  fn suppresses_overlaps_and_sorts_by_score() {
    let kept = non_max_suppression(crowded(), 0.4);

    assert_eq!(kept.len(), 2);
    assert!((kept[0].score - 0.9).abs() < 1e-6);
    assert!((kept[1].score - 0.6).abs() < 1e-6);
  }

  #[test]
  fn suppression_ignores_class() {
    // 类别不同的高重叠框仍被抑制
    let kept = non_max_suppression(
      vec![
        candidate(0.0, 0.0, 10.0, 10.0, 0.9, 0),
        candidate(0.0, 0.0, 10.0, 10.0, 0.8, 1),
      ],
      0.5,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 0);
  }

  #[test]
  fn idempotent_on_own_output() {
    let once = non_max_suppression(crowded(), 0.4);
    let twice = non_max_suppression(once.clone(), 0.4);

    assert_eq!(once.len(), twice.len());
    for (a, b) in once.iter().zip(&twice) {
      assert_eq!(a.bbox, b.bbox);
      assert_eq!(a.score, b.score);
    }
  }

  #[test]
  fn higher_threshold_never_keeps_fewer() {
    let thresholds = [0.0, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0];
    let mut previous = 0usize;
    for threshold in thresholds {
      let kept = non_max_suppression(crowded(), threshold).len();
      assert!(kept >= previous, "阈值 {} 保留数下降", threshold);
      previous = kept;
    }
  }

  #[test]
  fn equal_scores_keep_parse_order() {
    let kept = non_max_suppression(
      vec![
        candidate(0.0, 0.0, 10.0, 10.0, 0.8, 0),
        candidate(100.0, 100.0, 110.0, 110.0, 0.8, 1),
      ],
      0.4,
    );
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].class_id, 0);
    assert_eq!(kept[1].class_id, 1);
  }

  #[test]
  fn empty_input_is_empty_output() {
    assert!(non_max_suppression(Vec::new(), 0.5).is_empty());
  }
}
