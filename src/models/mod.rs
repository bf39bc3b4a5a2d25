//! # 数据模型模块
//!
//! 定义探测器几何、原子与密度网格数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `density/` 和 `commands/` 使用
//! - 子模块: geometry, atom, grid

pub mod atom;
pub mod geometry;
pub mod grid;

pub use atom::{Atom, ScatteringDescriptor};
pub use geometry::{DetectorGeometry, GeometryInput, ReciprocalSamplingParams};
pub use grid::DensityGrid;
