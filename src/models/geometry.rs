//! # 探测器几何与倒空间采样数据模型
//!
//! 定义实验几何（探测器 + 入射光束）及由其导出的倒空间采样参数。
//! `GeometryInput` 是未经校验的原始输入，`DetectorGeometry` 只能通过校验得到。
//!
//! ## 单位约定
//! - 探测器距离、像素尺寸：mm
//! - 波长：Å
//! - Ewald 球半径、q：Å⁻¹（晶体学约定 q = 2 sin θ / λ，不含 2π）
//!
//! ## 依赖关系
//! - 被 `density/qspace.rs` 构造和计算
//! - 被 `config/`, `commands/` 使用

use crate::error::{QdensError, Result};

use serde::{Deserialize, Serialize};

/// Ewald 半径与 1/λ 之间允许的相对偏差
pub const EWALD_TOLERANCE: f64 = 1e-3;

/// 探测器与光束几何（构造后不可变）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorGeometry {
    detector_distance: f64,
    pixels_x: usize,
    pixels_y: usize,
    pixel_size: f64,
    wavelength: f64,
    ewald_radius: f64,
}

impl DetectorGeometry {
    /// 校验并创建探测器几何
    pub fn new(
        detector_distance: f64,
        pixels_x: usize,
        pixels_y: usize,
        pixel_size: f64,
        wavelength: f64,
        ewald_radius: f64,
    ) -> Result<Self> {
        for (name, value) in [
            ("detector distance", detector_distance),
            ("pixel size", pixel_size),
            ("wavelength", wavelength),
            ("Ewald radius", ewald_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(QdensError::InvalidGeometryError(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }

        if pixels_x == 0 || pixels_y == 0 {
            return Err(QdensError::InvalidGeometryError(format!(
                "pixel counts must be positive, got {} x {}",
                pixels_x, pixels_y
            )));
        }

        if pixels_x == 1 && pixels_y == 1 {
            return Err(QdensError::InvalidGeometryError(
                "a 1 x 1 detector cannot resolve any scattering angle".to_string(),
            ));
        }

        // 球在长度空间中的直径为 2/R
        if wavelength > 2.0 / ewald_radius {
            return Err(QdensError::InvalidGeometryError(format!(
                "wavelength {} Å exceeds the Ewald-sphere diameter {} Å",
                wavelength,
                2.0 / ewald_radius
            )));
        }

        let mismatch = (wavelength * ewald_radius - 1.0).abs();
        if mismatch > EWALD_TOLERANCE {
            return Err(QdensError::InvalidGeometryError(format!(
                "Ewald radius {} Å⁻¹ disagrees with 1/wavelength = {} Å⁻¹",
                ewald_radius,
                1.0 / wavelength
            )));
        }

        Ok(Self {
            detector_distance,
            pixels_x,
            pixels_y,
            pixel_size,
            wavelength,
            ewald_radius,
        })
    }

    /// 由波长导出 Ewald 半径创建几何
    pub fn with_derived_radius(
        detector_distance: f64,
        pixels_x: usize,
        pixels_y: usize,
        pixel_size: f64,
        wavelength: f64,
    ) -> Result<Self> {
        Self::new(
            detector_distance,
            pixels_x,
            pixels_y,
            pixel_size,
            wavelength,
            1.0 / wavelength,
        )
    }

    pub fn detector_distance(&self) -> f64 {
        self.detector_distance
    }

    pub fn pixels_x(&self) -> usize {
        self.pixels_x
    }

    pub fn pixels_y(&self) -> usize {
        self.pixels_y
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    pub fn ewald_radius(&self) -> f64 {
        self.ewald_radius
    }
}

/// 倒空间采样参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReciprocalSamplingParams {
    /// 探测器角点对应的最大散射角 2θ（弧度）
    pub max_scattering_angle: f64,
    /// 相邻像素对应的最小散射角 2θ（弧度）
    pub min_scattering_angle: f64,
    /// 最大可探测空间频率（Å⁻¹）
    pub q_max: f64,
    /// 最小可分辨空间频率（Å⁻¹）
    pub q_min: f64,
    /// 视场（Å）= 1/q_min
    pub field_of_view: f64,
    /// 半周期分辨率（Å）= 1/(2 q_max)，即网格体素间距
    pub half_period_resolution: f64,
}

/// 未经校验的几何输入（配置文件 `[detector]` 段）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryInput {
    /// 探测器距离（mm）
    pub distance: f64,
    pub pixels_x: usize,
    pub pixels_y: usize,
    /// 像素尺寸（mm）
    pub pixel_size: f64,
    /// 波长（Å）
    pub wavelength: f64,
    /// Ewald 半径（Å⁻¹），缺省时由 1/λ 导出
    #[serde(default)]
    pub ewald_radius: Option<f64>,
}

impl GeometryInput {
    /// 校验为 DetectorGeometry
    pub fn resolve(&self) -> Result<DetectorGeometry> {
        match self.ewald_radius {
            Some(radius) => DetectorGeometry::new(
                self.distance,
                self.pixels_x,
                self.pixels_y,
                self.pixel_size,
                self.wavelength,
                radius,
            ),
            None => DetectorGeometry::with_derived_radius(
                self.distance,
                self.pixels_x,
                self.pixels_y,
                self.pixel_size,
                self.wavelength,
            ),
        }
    }
}
