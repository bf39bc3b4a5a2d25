//! # 电子密度合成模块
//!
//! 从探测器几何和 PDB 结构生成低通滤波后的电子密度体数据。
//!
//! ## 处理流程
//! ```text
//! qspace     (几何 → 倒空间采样参数，给出体素间距)
//!   → loader     (PDB → 原子 + 散射描述符，查 scattering 表)
//!   → rasterize  (原子 → 密度网格)
//!   → filter     (并行低通滤波)
//!   → export / plot
//! ```
//! `pipeline` 按上述顺序串联各阶段。
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/`, `parsers/`

pub mod export;
pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod plot;
pub mod qspace;
pub mod rasterize;
pub mod scattering;
