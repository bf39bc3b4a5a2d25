//! # PDB 格式解析器
//!
//! 解析 Protein Data Bank 坐标文件中的 ATOM / HETATM 记录。
//!
//! ## PDB 固定列格式（1 起始，闭区间）
//! ```text
//!  1- 6  记录名 "ATOM  " / "HETATM"
//! 13-16  原子名
//!    17  altLoc
//! 31-38  x (Å)
//! 39-46  y (Å)
//! 47-54  z (Å)
//! 55-60  占有率
//! 61-66  温度因子
//! 77-78  元素符号（右对齐）
//! ```
//! 其他记录类型直接跳过；多模型文件只读取第一个模型。
//!
//! ## 依赖关系
//! - 被 `density/loader.rs` 使用
//! - 使用 `density/scattering.rs` 规范化元素符号

use crate::density::scattering::normalize_element;
use crate::error::{QdensError, Result};
use std::fs;
use std::path::Path;

/// 一条 ATOM/HETATM 记录
#[derive(Debug, Clone, PartialEq)]
pub struct PdbRecord {
    /// 所在行号（1 起始）
    pub line: usize,
    /// 规范化的元素符号
    pub element: String,
    /// 原子名
    pub name: String,
    /// 笛卡尔坐标（Å）
    pub position: [f64; 3],
    pub occupancy: Option<f64>,
    pub b_factor: Option<f64>,
}

/// 解析 PDB 文件
pub fn parse_pdb_file(path: &Path) -> Result<Vec<PdbRecord>> {
    let content = fs::read_to_string(path).map_err(|e| QdensError::StructureParseError {
        path: path.display().to_string(),
        reason: format!("Cannot read file: {}", e),
    })?;

    parse_pdb_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 PDB 格式
pub fn parse_pdb_content(content: &str, source_name: &str) -> Result<Vec<PdbRecord>> {
    let mut records = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let lineno = idx + 1;
        let record_name = column(raw, 1, 6).trim_end();

        match record_name {
            "ATOM" | "HETATM" => {
                let record = parse_atom_record(raw, lineno).map_err(|reason| {
                    QdensError::StructureParseError {
                        path: source_name.to_string(),
                        reason,
                    }
                })?;
                records.push(record);
            }
            "ENDMDL" | "END" => break,
            _ => {}
        }
    }

    if records.is_empty() {
        return Err(QdensError::StructureParseError {
            path: source_name.to_string(),
            reason: "No ATOM/HETATM records found".to_string(),
        });
    }

    Ok(records)
}

/// 解析单条 ATOM/HETATM 记录
fn parse_atom_record(line: &str, lineno: usize) -> std::result::Result<PdbRecord, String> {
    let coord = |start: usize, end: usize, axis: &str| -> std::result::Result<f64, String> {
        let field = column(line, start, end).trim();
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                format!(
                    "Invalid {} coordinate '{}' at line {} (columns {}-{})",
                    axis, field, lineno, start, end
                )
            })
    };

    let position = [coord(31, 38, "x")?, coord(39, 46, "y")?, coord(47, 54, "z")?];
    let occupancy = column(line, 55, 60).trim().parse::<f64>().ok();
    let b_factor = column(line, 61, 66).trim().parse::<f64>().ok();

    let name_field = column(line, 13, 16);
    let element = element_symbol(column(line, 77, 78), name_field);
    if element.is_empty() {
        return Err(format!(
            "Cannot determine element at line {} (atom name '{}')",
            lineno,
            name_field.trim()
        ));
    }

    Ok(PdbRecord {
        line: lineno,
        element,
        name: name_field.trim().to_string(),
        position,
        occupancy,
        b_factor,
    })
}

/// 取元素符号：优先第 77-78 列，否则由原子名推断
fn element_symbol(element_field: &str, name_field: &str) -> String {
    let explicit = normalize_element(element_field);
    if !explicit.is_empty() {
        return explicit;
    }

    // 原子名中元素占第 13-14 列（右对齐）
    let bytes = name_field.as_bytes();
    let col13 = bytes.first().copied().unwrap_or(b' ');
    let col14 = bytes.get(1).copied().unwrap_or(b' ');

    if !col13.is_ascii_alphabetic() {
        return normalize_element(&(col14 as char).to_string());
    }

    // 旧式四字符氢原子名，如 "HG21"
    if col13 == b'H' && name_field.trim().len() == 4 {
        return "H".to_string();
    }

    normalize_element(&String::from_utf8_lossy(&bytes[..bytes.len().min(2)]))
}

/// 取 1 起始的闭区间列；行过短时返回空或截断
fn column(line: &str, start: usize, end: usize) -> &str {
    let begin = start - 1;
    if begin >= line.len() {
        return "";
    }
    let stop = end.min(line.len());
    line.get(begin..stop).unwrap_or("")
}
