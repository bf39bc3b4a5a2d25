//! # 密度体数据导出
//!
//! 将密度网格写为下游重建程序读取的体数据文件，并附带 TOML 头文件。
//!
//! ## 支持格式
//! - 二进制: 小端 f64，C 顺序（x 最慢，z 最快），无文件头
//! - 文本: 每行一个值，`{:.8e}` 格式
//! - 头文件: `<输出文件名>.toml`，记录 shape, voxel_size, origin, order, dtype
//!
//! ## 依赖关系
//! - 被 `commands/make.rs` 调用
//! - 使用 `models/grid.rs`
//! - 使用 `serde` + `toml` 写入头文件

use crate::error::{QdensError, Result};
use crate::models::DensityGrid;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// 体数据头文件内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub shape: [usize; 3],
    /// 体素边长（Å）
    pub voxel_size: f64,
    /// 体素 (0, 0, 0) 中心坐标（Å）
    pub origin: [f64; 3],
    pub order: String,
    pub dtype: String,
}

impl VolumeHeader {
    pub fn for_grid(grid: &DensityGrid, binary: bool) -> Self {
        VolumeHeader {
            shape: grid.shape,
            voxel_size: grid.spacing,
            origin: grid.origin,
            order: "C".to_string(),
            dtype: if binary { "f64-le" } else { "text" }.to_string(),
        }
    }
}

/// 头文件路径：在输出文件名后追加 `.toml`
pub fn header_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(".toml");
    PathBuf::from(name)
}

/// 写出密度体数据
pub fn write_density(output_path: &Path, grid: &DensityGrid, binary: bool) -> Result<()> {
    let write_err = |e: std::io::Error| QdensError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    };

    let file = File::create(output_path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    if binary {
        for value in &grid.data {
            writer.write_all(&value.to_le_bytes()).map_err(write_err)?;
        }
    } else {
        for value in &grid.data {
            writeln!(writer, "{:.8e}", value).map_err(write_err)?;
        }
    }

    writer.flush().map_err(write_err)?;
    Ok(())
}

/// 写出头文件，返回其路径
pub fn write_header(output_path: &Path, grid: &DensityGrid, binary: bool) -> Result<PathBuf> {
    let path = header_path(output_path);
    let header = VolumeHeader::for_grid(grid, binary);

    let content = toml::to_string(&header)
        .map_err(|e| QdensError::InvalidArgument(format!("cannot encode volume header: {}", e)))?;

    std::fs::write(&path, content).map_err(|e| QdensError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(path)
}
