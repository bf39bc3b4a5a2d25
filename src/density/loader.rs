//! # 结构加载器
//!
//! 读取 PDB 文件并为每个原子解析好当前波长下的散射描述符。
//! 描述符在加载时一次性解析，栅格化阶段不再查表。
//!
//! ## 依赖关系
//! - 被 `density/pipeline.rs` 调用
//! - 使用 `parsers/pdb.rs` 读取坐标
//! - 使用 `density/scattering.rs` 的 ScatteringTable

use crate::density::scattering::ScatteringTable;
use crate::error::{QdensError, Result};
use crate::models::Atom;
use crate::parsers::pdb;

use std::collections::BTreeMap;
use std::path::Path;

/// 使用内置散射表加载原子
#[cfg_attr(not(test), allow(dead_code))]
pub fn load_atoms(structure_path: &Path, wavelength: f64) -> Result<Vec<Atom>> {
    load_atoms_with(structure_path, &ScatteringTable::builtin(wavelength))
}

/// 使用给定散射表加载原子
pub fn load_atoms_with(structure_path: &Path, table: &ScatteringTable) -> Result<Vec<Atom>> {
    let records = pdb::parse_pdb_file(structure_path)?;

    records
        .into_iter()
        .map(|record| {
            let scattering =
                table
                    .resolve(&record.element)
                    .ok_or_else(|| QdensError::UnknownElementError {
                        element: record.element.clone(),
                        line: record.line,
                    })?;

            Ok(Atom {
                element: record.element,
                position: record.position,
                label: Some(record.name).filter(|n| !n.is_empty()),
                occupancy: record.occupancy,
                b_factor: record.b_factor,
                scattering,
            })
        })
        .collect()
}

/// 按元素统计原子数（按符号排序）
pub fn composition(atoms: &[Atom]) -> BTreeMap<&str, usize> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for atom in atoms {
        *counts.entry(atom.element.as_str()).or_insert(0) += 1;
    }
    counts
}
