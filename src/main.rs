// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use goule::{
  FromUrl,
  config::SegmentConfig,
  dump::TensorDumpInput,
  record::JsonRecordOutput,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("张量转储输入: {}", args.input);
  info!("预测结果输出: {}", args.output);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS IOU 阈值: {}", args.overlap);
  info!("处理模式: {:?}", args.mode);

  let input = TensorDumpInput::from_url(&args.input)?;
  let output = JsonRecordOutput::from_url(&args.output)?;

  let config = SegmentConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.overlap)
    .with_max_objects(args.max_objects)
    .with_processing_mode(args.mode)
    .with_max_polygon_points(args.max_points);
  #[cfg(feature = "save_mask_file")]
  let config = if args.masks.is_some() {
    config.with_keep_masks(true)
  } else {
    config
  };

  let pipeline = input.pipeline();
  let (prediction, prototype) = input.tensors()?;
  let (image_width, image_height) = input.image_size();

  info!("开始后处理...");
  let now = std::time::Instant::now();
  let predictions = if args.boxes_only {
    pipeline.run_boxes(&prediction, image_width, image_height, &config)?
  } else {
    pipeline.run(&prediction, &prototype, image_width, image_height, &config)?
  };
  info!("后处理完成，耗时: {:.2?}", now.elapsed());

  info!("共 {} 个预测结果", predictions.len());
  for record in &predictions {
    info!("  - {}: {:.2}%", record.class_name(), record.confidence() * 100.0);
  }

  output.write(&predictions)?;

  #[cfg(feature = "save_mask_file")]
  if let Some(masks) = &args.masks {
    let masks = goule::record::MaskDumpOutput::from_url(masks)?;
    masks.write(&predictions)?;
  }

  Ok(())
}
