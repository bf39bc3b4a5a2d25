//! # 原子数据模型
//!
//! 定义从结构文件解析出的原子，以及加载时解析好的散射描述符。
//!
//! ## 依赖关系
//! - 被 `parsers/pdb.rs`, `density/loader.rs` 构造
//! - 被 `density/rasterize.rs` 使用

use serde::{Deserialize, Serialize};

/// 元素在给定波长下的散射描述符
///
/// `f1` 为前向散射因子实部（含反常散射修正，单位：电子），
/// `f2` 为虚部。配置文件中 `f2` 可省略。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScatteringDescriptor {
    pub f1: f64,
    #[serde(default)]
    pub f2: f64,
}

impl ScatteringDescriptor {
    pub fn new(f1: f64, f2: f64) -> Self {
        Self { f1, f2 }
    }

    /// 仅含实部的描述符
    pub fn real(f1: f64) -> Self {
        Self { f1, f2: 0.0 }
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号（规范大小写，如 "Fe"）
    pub element: String,

    /// 笛卡尔坐标 [x, y, z]（Å）
    pub position: [f64; 3],

    /// 可选：原子名（PDB 第 13-16 列）
    pub label: Option<String>,

    /// 可选：占有率
    pub occupancy: Option<f64>,

    /// 可选：温度因子 B（Å²）
    pub b_factor: Option<f64>,

    /// 加载时解析的散射描述符
    pub scattering: ScatteringDescriptor,
}

impl Atom {
    /// 栅格化时该原子贡献的总电子数：f1 × 占有率
    pub fn weight(&self) -> f64 {
        self.scattering.f1 * self.occupancy.unwrap_or(1.0)
    }
}

#[cfg(test)]
impl Atom {
    pub fn new(
        element: impl Into<String>,
        position: [f64; 3],
        scattering: ScatteringDescriptor,
    ) -> Self {
        Atom {
            element: element.into(),
            position,
            label: None,
            occupancy: None,
            b_factor: None,
            scattering,
        }
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = Some(occupancy);
        self
    }
}
