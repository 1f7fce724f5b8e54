// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/bin/benchmark_contour.rs - 轮廓跟踪基准测试
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

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use goule::segment::{BinaryMask, mask_to_polygons};

/// Goule 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 掩膜宽度
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub width: usize,
  /// 掩膜高度
  #[arg(long, default_value = "640", value_name = "PIXELS")]
  pub height: usize,
  /// 重复轮数
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub rounds: u32,
}

/// 居中实心圆掩膜, 半径取短边三分之一
fn synthetic_mask(width: usize, height: usize) -> BinaryMask {
  let cx = width as f32 / 2.0;
  let cy = height as f32 / 2.0;
  let radius = (width.min(height) as f32) / 3.0;

  let mut data = vec![0u8; width * height];
  for y in 0..height {
    for x in 0..width {
      let dx = x as f32 - cx;
      let dy = y as f32 - cy;
      if dx * dx + dy * dy <= radius * radius {
        data[y * width + x] = 255;
      }
    }
  }

  BinaryMask {
    width,
    height,
    origin_x: 0,
    origin_y: 0,
    data: data.into_boxed_slice(),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let rounds = args.rounds.max(1);

  info!("掩膜尺寸: {}x{}", args.width, args.height);
  info!("重复轮数: {}", rounds);

  let mask = synthetic_mask(args.width, args.height);

  let mut total = Duration::ZERO;
  let mut fastest = Duration::MAX;
  let mut slowest = Duration::ZERO;
  let mut vertices = 0usize;

  for _ in 0..rounds {
    let now = Instant::now();
    let polygons = mask_to_polygons(&mask);
    let elapsed = now.elapsed();

    total += elapsed;
    fastest = fastest.min(elapsed);
    slowest = slowest.max(elapsed);
    vertices = polygons.iter().map(Vec::len).sum();
  }

  info!("总耗时: {:.2?}", total);
  info!("平均耗时: {:.2?}", total / rounds);
  info!("最快: {:.2?}", fastest);
  info!("最慢: {:.2?}", slowest);
  info!("轮廓顶点数: {}", vertices);

  Ok(())
}
