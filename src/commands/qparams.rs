//! # qparams 命令实现
//!
//! 由实验配置中的探测器几何计算倒空间采样参数并打印。
//!
//! ## 依赖关系
//! - 使用 `cli/qparams.rs` 定义的参数
//! - 使用 `config/`, `density/qspace.rs`
//! - 使用 `tabled` 输出表格

use crate::cli::qparams::QparamsArgs;
use crate::config::ExperimentConfig;
use crate::density::qspace::compute_q_params;
use crate::error::{QdensError, Result};
use crate::models::{DetectorGeometry, ReciprocalSamplingParams};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 参数表中的一行
#[derive(Debug, Clone, Tabled)]
pub struct ParamRow {
    #[tabled(rename = "Parameter")]
    pub name: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Unit")]
    pub unit: &'static str,
}

fn row(name: &'static str, value: String, unit: &'static str) -> ParamRow {
    ParamRow { name, value, unit }
}

/// 几何与采样参数表
pub fn sampling_rows(geometry: &DetectorGeometry, q: &ReciprocalSamplingParams) -> Vec<ParamRow> {
    vec![
        row("Detector distance", format!("{}", geometry.detector_distance()), "mm"),
        row(
            "Detector pixels",
            format!("{} x {}", geometry.pixels_x(), geometry.pixels_y()),
            "",
        ),
        row("Pixel size", format!("{}", geometry.pixel_size()), "mm"),
        row("Wavelength", format!("{}", geometry.wavelength()), "Å"),
        row("Ewald radius", format!("{:.6}", geometry.ewald_radius()), "Å⁻¹"),
        row(
            "Max scattering angle 2θ",
            format!("{:.4}", q.max_scattering_angle.to_degrees()),
            "°",
        ),
        row(
            "Min scattering angle 2θ",
            format!("{:.4}", q.min_scattering_angle.to_degrees()),
            "°",
        ),
        row("q_max", format!("{:.6e}", q.q_max), "Å⁻¹"),
        row("q_min", format!("{:.6e}", q.q_min), "Å⁻¹"),
        row("Field of view", format!("{:.3}", q.field_of_view), "Å"),
        row(
            "Half-period resolution",
            format!("{:.4}", q.half_period_resolution),
            "Å",
        ),
        row("q voxels per axis", q.q_voxels().to_string(), ""),
    ]
}

/// 执行 qparams 命令
pub fn execute(args: QparamsArgs) -> Result<()> {
    let config = ExperimentConfig::load(&args.config, None)?;
    let g = config.geometry;
    let ewald_radius = g.ewald_radius.unwrap_or(1.0 / g.wavelength);

    let q = compute_q_params(
        g.distance,
        g.pixels_x,
        g.pixels_y,
        g.pixel_size,
        g.wavelength,
        ewald_radius,
    )?;

    if args.toml {
        let text = toml::to_string(&q).map_err(|e| {
            QdensError::InvalidArgument(format!("cannot encode sampling parameters: {}", e))
        })?;
        print!("{}", text);
        return Ok(());
    }

    output::print_header("Reciprocal-Space Sampling");
    let geometry = g.resolve()?;
    println!("{}", Table::new(sampling_rows(&geometry, &q)));
    Ok(())
}
