//! # 解析器模块
//!
//! 提供 PDB 坐标文件和 Henke 散射因子表的解析器。
//!
//! ## 依赖关系
//! - 被 `density/` 模块使用
//! - 子模块: pdb, henke

pub mod henke;
pub mod pdb;
