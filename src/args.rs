// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

use goule::config::ProcessingMode;

/// Goule 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 张量转储输入
  /// 支持格式:
  /// - 张量转储: tensor:///path/to/dump.json
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 预测结果输出
  /// 支持格式:
  /// - JSON 记录: json:///path/to/out.json 或 json:///path/to/out.json?pretty
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 掩膜图像输出目录（masks:///path/to/dir, 可选）
  #[cfg(feature = "save_mask_file")]
  #[arg(long, value_name = "OUTPUT")]
  pub masks: Option<Url>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub overlap: f32,

  /// 保留的最大目标数
  #[arg(long, default_value = "20", value_name = "COUNT")]
  pub max_objects: usize,

  /// 处理模式 (quality / balanced / performance)
  #[arg(long, default_value = "balanced", value_name = "MODE")]
  pub mode: ProcessingMode,

  /// 单个轮廓保留的最大顶点数
  #[arg(long, default_value = "500", value_name = "COUNT")]
  pub max_points: usize,

  /// 只输出检测框, 跳过掩膜与轮廓阶段
  #[arg(long)]
  pub boxes_only: bool,
}
