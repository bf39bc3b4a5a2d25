//! # Henke 散射因子表解析器
//!
//! 解析 Henke 原子散射因子表（`<element>.nff`），并按光子能量插值。
//!
//! ## .nff 格式说明
//! ```text
//! E(eV)      f1         f2
//! 10.0000    -9999.     0.2
//! 10.1617    -9999.     0.2
//! ...
//! 30000.0    6.0006     1.1e-05
//! ```
//! f1 = -9999 表示该能量下无有效数据，解析时丢弃。
//!
//! ## 依赖关系
//! - 被 `density/scattering.rs` 使用
//! - 使用 `models/atom.rs`

use crate::error::{QdensError, Result};
use crate::models::ScatteringDescriptor;
use std::fs;
use std::path::Path;

/// 表中无效 f1 的占位值
const MISSING_F1: f64 = -9999.0;

/// 单个元素的 Henke 表
#[derive(Debug, Clone)]
pub struct HenkeTable {
    /// (能量 eV, f1, f2)，按能量严格升序，均为有限值
    pub rows: Vec<(f64, f64, f64)>,
}

impl HenkeTable {
    /// 表覆盖的能量范围
    pub fn energy_range(&self) -> Option<(f64, f64)> {
        Some((self.rows.first()?.0, self.rows.last()?.0))
    }

    /// 在给定光子能量处线性插值
    pub fn interpolate(&self, energy: f64) -> Option<ScatteringDescriptor> {
        let (lo, hi) = self.energy_range()?;
        if energy < lo || energy > hi {
            return None;
        }

        // 第一个能量 >= energy 的行
        let upper = self.rows.partition_point(|row| row.0 < energy);
        if upper == 0 {
            let (_, f1, f2) = self.rows[0];
            return Some(ScatteringDescriptor::new(f1, f2));
        }

        let (e0, f1_0, f2_0) = self.rows[upper - 1];
        let (e1, f1_1, f2_1) = self.rows[upper];
        let t = (energy - e0) / (e1 - e0);

        Some(ScatteringDescriptor::new(
            f1_0 + t * (f1_1 - f1_0),
            f2_0 + t * (f2_1 - f2_0),
        ))
    }
}

/// 解析 .nff 文件
pub fn parse_nff_file(path: &Path) -> Result<HenkeTable> {
    let content = fs::read_to_string(path).map_err(|e| QdensError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_nff_content(&content).map_err(|reason| QdensError::ScatteringTableError {
        path: path.display().to_string(),
        reason,
    })
}

/// 从字符串内容解析 .nff 格式
pub fn parse_nff_content(content: &str) -> std::result::Result<HenkeTable, String> {
    let mut rows: Vec<(f64, f64, f64)> = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        // 表头 "E(eV) f1 f2"
        if parts[0].parse::<f64>().is_err() {
            if rows.is_empty() {
                continue;
            }
            return Err(format!("Unexpected text at line {}: '{}'", lineno + 1, line));
        }

        if parts.len() < 3 {
            return Err(format!("Expected 3 columns at line {}", lineno + 1));
        }

        let values: Vec<f64> = parts[..3]
            .iter()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| format!("Invalid number at line {}: '{}'", lineno + 1, line))?;

        // "nan" / "inf" 也能被 f64 解析
        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("Non-finite value at line {}: '{}'", lineno + 1, line));
        }

        if values[1] <= MISSING_F1 {
            continue;
        }

        if let Some(&(last_e, _, _)) = rows.last() {
            if values[0] <= last_e {
                return Err(format!(
                    "Energies must increase strictly (line {})",
                    lineno + 1
                ));
            }
        }

        rows.push((values[0], values[1], values[2]));
    }

    if rows.is_empty() {
        return Err("No valid (E, f1, f2) rows".to_string());
    }

    Ok(HenkeTable { rows })
}
