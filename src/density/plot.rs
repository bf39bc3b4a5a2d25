//! # 密度切片预览图
//!
//! 使用 `plotters` 将密度网格中心 x 切片渲染为 PNG 热图，用于快速检查
//! 栅格化与滤波结果。
//!
//! ## 依赖关系
//! - 被 `commands/make.rs` 调用
//! - 使用 `models/grid.rs`
//! - 使用 `plotters` 渲染图表

use crate::error::{QdensError, Result};
use crate::models::DensityGrid;

use plotters::prelude::*;
use std::path::Path;

/// 中心 x 切片（ny × nz，行主序）及其最大值
pub fn central_slice(grid: &DensityGrid) -> (Vec<f64>, f64) {
    let [nx, ny, nz] = grid.shape;
    let i = nx / 2;
    let start = i * ny * nz;
    let slice = grid.data[start..start + ny * nz].to_vec();
    let max = slice.iter().copied().fold(0.0, f64::max);
    (slice, max)
}

/// 归一化密度 → 颜色（黑 → 红 → 黄 → 白）
pub fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |lo: f64, hi: f64| (((t - lo) / (hi - lo)).clamp(0.0, 1.0) * 255.0).round() as u8;
    RGBColor(channel(0.0, 0.4), channel(0.3, 0.75), channel(0.7, 1.0))
}

/// 渲染中心切片热图
pub fn render_slice(grid: &DensityGrid, output_path: &Path, width: u32, height: u32) -> Result<()> {
    if grid.is_empty() {
        return Err(QdensError::PlotError("cannot plot an empty grid".to_string()));
    }

    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    draw_slice(&root, grid)?;
    root.present().map_err(|e| QdensError::PlotError(e.to_string()))?;
    Ok(())
}

fn draw_slice<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    grid: &DensityGrid,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(|e| QdensError::PlotError(format!("{:?}", e)))?;

    let [nx, ny, nz] = grid.shape;
    let (slice, max) = central_slice(grid);
    let scale = if max > 0.0 { 1.0 / max } else { 0.0 };

    // 坐标轴使用 Å
    let h = grid.spacing;
    let y0 = grid.origin[1] - 0.5 * h;
    let z0 = grid.origin[2] - 0.5 * h;
    let y1 = y0 + ny as f64 * h;
    let z1 = z0 + nz as f64 * h;

    let x_mid = grid.position_of(nx / 2, 0, 0)[0];
    let title = format!("Density slice x = {:.2} Å", x_mid);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(z0..z1, y0..y1)
        .map_err(|e| QdensError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("z (Å)")
        .y_desc("y (Å)")
        .x_label_style(("sans-serif", 14))
        .y_label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| QdensError::PlotError(format!("{:?}", e)))?;

    let cells = &slice;
    chart
        .draw_series((0..ny).flat_map(move |j| {
            (0..nz).map(move |k| {
                let color = heat_color(cells[j * nz + k] * scale);
                let ya = y0 + j as f64 * h;
                let za = z0 + k as f64 * h;
                Rectangle::new([(za, ya), (za + h, ya + h)], color.filled())
            })
        }))
        .map_err(|e| QdensError::PlotError(format!("{:?}", e)))?;

    Ok(())
}
