//! # 倒空间采样参数计算
//!
//! 将探测器/光束几何换算为倒空间（q 空间）采样参数。
//!
//! ## 算法概述
//! 1. 探测器半宽 hx = p·(Nx−1)/2，hy 同理；角点半径 r = √(hx² + hy²)
//! 2. 最大散射角 2θ_max = atan(r / D)，最小散射角 2θ_min = atan(p / D)
//! 3. 考虑 Ewald 球曲率：q = 2R·sin(2θ / 2)
//! 4. 半周期分辨率 = 1 / (2 q_max)，视场 = 1 / q_min
//!
//! ## 依赖关系
//! - 被 `density/pipeline.rs`, `commands/qparams.rs` 调用
//! - 使用 `models/geometry.rs`

use crate::error::{QdensError, Result};
use crate::models::{DetectorGeometry, ReciprocalSamplingParams};

impl ReciprocalSamplingParams {
    /// 由已校验的几何导出采样参数（纯函数）
    pub fn from_geometry(geometry: &DetectorGeometry) -> Result<Self> {
        let d = geometry.detector_distance();
        let p = geometry.pixel_size();
        let radius = geometry.ewald_radius();

        let half_x = p * (geometry.pixels_x() - 1) as f64 / 2.0;
        let half_y = p * (geometry.pixels_y() - 1) as f64 / 2.0;
        let corner = half_x.hypot(half_y);

        let max_angle = (corner / d).atan();
        let min_angle = (p / d).atan();

        let q_max = 2.0 * radius * (0.5 * max_angle).sin();
        let q_min = 2.0 * radius * (0.5 * min_angle).sin();

        let half_period_resolution = 0.5 / q_max;
        if !half_period_resolution.is_finite() || half_period_resolution <= 0.0 {
            return Err(QdensError::InvalidGeometryError(format!(
                "geometry yields a non-finite half-period resolution (q_max = {})",
                q_max
            )));
        }

        Ok(Self {
            max_scattering_angle: max_angle,
            min_scattering_angle: min_angle,
            q_max,
            q_min,
            field_of_view: 1.0 / q_min,
            half_period_resolution,
        })
    }

    /// 每个轴上覆盖 ±q_max 所需的 q 体素数（奇数）
    pub fn q_voxels(&self) -> usize {
        2 * (self.q_max / self.q_min).ceil() as usize + 1
    }
}

/// 计算倒空间采样参数
///
/// 单位：`detector_distance`, `pixel_size` 为 mm；`wavelength` 为 Å；
/// `ewald_radius` 为 Å⁻¹。
pub fn compute_q_params(
    detector_distance: f64,
    pixels_x: usize,
    pixels_y: usize,
    pixel_size: f64,
    wavelength: f64,
    ewald_radius: f64,
) -> Result<ReciprocalSamplingParams> {
    let geometry = DetectorGeometry::new(
        detector_distance,
        pixels_x,
        pixels_y,
        pixel_size,
        wavelength,
        ewald_radius,
    )?;
    ReciprocalSamplingParams::from_geometry(&geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_invalid_geometry(result: Result<ReciprocalSamplingParams>) -> bool {
        matches!(result, Err(QdensError::InvalidGeometryError(_)))
    }

    #[test]
    fn test_q_params_bit_identical() {
        let a = compute_q_params(586.0, 150, 150, 0.3, 7.75, 1.0 / 7.75).unwrap();
        let b = compute_q_params(586.0, 150, 150, 0.3, 7.75, 1.0 / 7.75).unwrap();
        assert_eq!(a.half_period_resolution.to_bits(), b.half_period_resolution.to_bits());
        assert_eq!(a.q_max.to_bits(), b.q_max.to_bits());
        assert_eq!(a.q_min.to_bits(), b.q_min.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn test_q_params_known_values() {
        // 101 x 101 像素，p = 1 mm，D = 50 mm，λ = 2 Å
        let params = compute_q_params(50.0, 101, 101, 1.0, 2.0, 0.5).unwrap();

        let corner = (50.0_f64 * 50.0 * 2.0).sqrt();
        let max_angle = (corner / 50.0).atan();
        let q_max = 2.0 * 0.5 * (0.5 * max_angle).sin();

        assert!((params.max_scattering_angle - max_angle).abs() < 1e-12);
        assert!((params.q_max - q_max).abs() < 1e-12);
        assert!((params.half_period_resolution - 0.5 / q_max).abs() < 1e-12);
        assert!(params.q_min < params.q_max);
        assert!((params.field_of_view * params.q_min - 1.0).abs() < 1e-12);
        assert_eq!(params.q_voxels() % 2, 1);
    }

    #[test]
    fn test_larger_detector_gives_finer_resolution() {
        let small = compute_q_params(100.0, 64, 64, 0.5, 1.5, 1.0 / 1.5).unwrap();
        let large = compute_q_params(100.0, 256, 256, 0.5, 1.5, 1.0 / 1.5).unwrap();
        assert!(large.half_period_resolution < small.half_period_resolution);
    }

    #[test]
    fn test_rejects_zero_pixels() {
        assert!(is_invalid_geometry(compute_q_params(100.0, 0, 128, 0.5, 1.5, 1.0 / 1.5)));
    }

    #[test]
    fn test_rejects_single_pixel_detector() {
        assert!(is_invalid_geometry(compute_q_params(100.0, 1, 1, 0.5, 1.5, 1.0 / 1.5)));
    }

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        assert!(is_invalid_geometry(compute_q_params(-1.0, 64, 64, 0.5, 1.5, 1.0 / 1.5)));
        assert!(is_invalid_geometry(compute_q_params(100.0, 64, 64, f64::NAN, 1.5, 1.0 / 1.5)));
        assert!(is_invalid_geometry(compute_q_params(100.0, 64, 64, 0.5, 0.0, 1.0)));
    }

    #[test]
    fn test_rejects_wavelength_beyond_ewald_diameter() {
        let result = compute_q_params(100.0, 64, 64, 0.5, 3.0, 1.0);
        match result {
            Err(QdensError::InvalidGeometryError(msg)) => {
                assert!(msg.contains("diameter"), "unexpected message: {}", msg)
            }
            other => panic!("expected InvalidGeometryError, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_radius_wavelength_mismatch() {
        assert!(is_invalid_geometry(compute_q_params(100.0, 64, 64, 0.5, 1.5, 0.6)));
        // 容差内的偏差是允许的
        assert!(compute_q_params(100.0, 64, 64, 0.5, 1.5, 1.0005 / 1.5).is_ok());
    }

    #[test]
    fn test_derived_radius_matches_explicit() {
        let geometry = DetectorGeometry::with_derived_radius(100.0, 64, 64, 0.5, 1.5).unwrap();
        let derived = ReciprocalSamplingParams::from_geometry(&geometry).unwrap();
        let explicit = compute_q_params(100.0, 64, 64, 0.5, 1.5, 1.0 / 1.5).unwrap();
        assert_eq!(derived, explicit);
    }
}
