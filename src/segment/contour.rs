// 该文件是 Goule （勾勒丹青） 项目的一部分。
// src/segment/contour.rs - 轮廓跟踪
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::segment::{BinaryMask, Point};

/// 8 邻域方向表，从正右起顺时针（y 轴向下）
const DIRECTIONS: [(i32, i32); 8] = [
  (1, 0),
  (1, 1),
  (0, 1),
  (-1, 1),
  (-1, 0),
  (-1, -1),
  (0, -1),
  (1, -1),
];

/// 行向量化处理的通道宽度
const LANES: usize = 16;

/// 提取掩膜的全部闭合轮廓。空掩膜返回空表。
///
/// 边缘图是本次调用独占的缓冲，跟踪过程中清除访问标记
/// 不会影响掩膜本身，同一掩膜重复跟踪结果一致。
pub fn mask_to_polygons(mask: &BinaryMask) -> Vec<Vec<Point>> {
  if mask.is_empty() {
    return Vec::new();
  }
  let mut edges = build_edge_map(mask);
  trace_polygons(&mut edges, mask.width, mask.height)
}

/// 选出顶点最多的轮廓，数量相同时取先跟踪到的一条。
/// 顶点数是边界精细程度的代理指标，不保证面积最大。
pub fn select_polygon(polygons: &[Vec<Point>]) -> Option<&Vec<Point>> {
  let mut best: Option<&Vec<Point>> = None;
  for ring in polygons {
    match best {
      Some(current) if ring.len() <= current.len() => {}
      _ => best = Some(ring),
    }
  }
  best
}

/// 等步长抽稀轮廓顶点。
///
/// 游标从半步长处出发、按 count/(maxPoints-1) 前进并取整采样，
/// 末尾回接第一个采样点保持闭合；不超上限的轮廓原样返回。
pub fn decimate_ring(ring: &[Point], max_points: usize) -> Vec<Point> {
  if max_points == 0 {
    return Vec::new();
  }
  if ring.len() <= max_points {
    return ring.to_vec();
  }
  if max_points == 1 {
    return vec![ring[0]];
  }

  let count = ring.len();
  let keep = max_points - 1;
  let stride = count as f64 / keep as f64;
  let mut cursor = stride / 2.0;
  let mut points = Vec::with_capacity(max_points);

  for _ in 0..keep {
    let index = (cursor.round() as usize) % count;
    points.push(ring[index]);
    cursor += stride;
  }

  points.push(points[0]);
  points
}

/// 构建边缘图: 前景像素若有任一 4 邻域背景（越界视为背景）则为边缘。
///
/// 行主体按 LANES 宽度分块比较，行首、行尾与余数走标量路径，
/// 两条路径的结果逐位一致。
fn build_edge_map(mask: &BinaryMask) -> Vec<bool> {
  let width = mask.width;
  let height = mask.height;
  let data = &mask.data;
  let mut edges = vec![false; width * height];

  for y in 0..height {
    let row = &data[y * width..(y + 1) * width];
    let up = (y > 0).then(|| &data[(y - 1) * width..y * width]);
    let down = (y + 1 < height).then(|| &data[(y + 1) * width..(y + 2) * width]);
    let out = &mut edges[y * width..(y + 1) * width];

    // 行首像素左侧越界, 单独走标量
    scalar_edges(row, up, down, out, 0, 1.min(width));

    let mut x = 1;
    while x + LANES < width {
      lane_edges(row, up, down, out, x);
      x += LANES;
    }
    scalar_edges(row, up, down, out, x.min(width), width);
  }

  edges
}

fn scalar_edges(
  row: &[u8],
  up: Option<&[u8]>,
  down: Option<&[u8]>,
  out: &mut [bool],
  start: usize,
  end: usize,
) {
  let width = row.len();
  for x in start..end {
    if row[x] == 0 {
      continue;
    }
    let left_bg = x == 0 || row[x - 1] == 0;
    let right_bg = x + 1 >= width || row[x + 1] == 0;
    let up_bg = up.map_or(true, |r| r[x] == 0);
    let down_bg = down.map_or(true, |r| r[x] == 0);
    out[x] = left_bg || right_bg || up_bg || down_bg;
  }
}

/// 对 [x, x+LANES) 区间做一组通道比较，调用方保证左右邻居都在行内
fn lane_edges(row: &[u8], up: Option<&[u8]>, down: Option<&[u8]>, out: &mut [bool], x: usize) {
  let cur = &row[x..x + LANES];
  let left = &row[x - 1..x - 1 + LANES];
  let right = &row[x + 1..x + 1 + LANES];

  let mut neighbor_bg = [false; LANES];
  for i in 0..LANES {
    neighbor_bg[i] = left[i] == 0 || right[i] == 0;
  }
  match up {
    Some(r) => {
      let lane = &r[x..x + LANES];
      for i in 0..LANES {
        neighbor_bg[i] = neighbor_bg[i] || lane[i] == 0;
      }
    }
    None => neighbor_bg = [true; LANES],
  }
  match down {
    Some(r) => {
      let lane = &r[x..x + LANES];
      for i in 0..LANES {
        neighbor_bg[i] = neighbor_bg[i] || lane[i] == 0;
      }
    }
    None => neighbor_bg = [true; LANES],
  }

  for i in 0..LANES {
    out[x + i] = cur[i] != 0 && neighbor_bg[i];
  }
}

/// Moore 邻域边界跟踪。
///
/// 逐行扫描未访问的边缘像素；每到一个像素即清除其边缘标记，
/// 从进入方向的下一个方向起顺时针找首个未访问的边缘邻居，
/// 邻域耗尽（起点已清除，绕行一圈后必然耗尽）即结束本环。
/// 末尾补上起点使环闭合。每个像素至多访问一次，步数必然有界。
fn trace_polygons(edges: &mut [bool], width: usize, height: usize) -> Vec<Vec<Point>> {
  let mut polygons = Vec::new();

  for y in 0..height {
    for x in 0..width {
      if !edges[y * width + x] {
        continue;
      }

      let start = Point {
        x: x as i32,
        y: y as i32,
      };
      let mut ring = Vec::new();
      let mut cur = start;
      let mut incoming = 6usize;

      loop {
        ring.push(cur);
        edges[cur.y as usize * width + cur.x as usize] = false;

        let mut next = None;
        for step in 1..=8 {
          let dir = (incoming + step) & 7;
          let (dx, dy) = DIRECTIONS[dir];
          let nx = cur.x + dx;
          let ny = cur.y + dy;
          if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
            continue;
          }
          if edges[ny as usize * width + nx as usize] {
            next = Some((Point { x: nx, y: ny }, dir));
            break;
          }
        }

        match next {
          Some((point, dir)) => {
            cur = point;
            incoming = (dir + 4) & 7;
          }
          None => break,
        }
      }

      if ring.first() != ring.last() {
        ring.push(start);
      }

      polygons.push(ring);
    }
  }

  polygons
}
