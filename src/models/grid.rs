//! # 三维密度网格
//!
//! 规则立方体素网格上的实值电子密度。
//!
//! ## 存储与坐标约定
//! - `data` 按 C 顺序存储：x 最慢，z 最快，`index = (i * ny + j) * nz + k`
//! - 体素 (i, j, k) 的物理位置为 `origin + (i, j, k) * spacing`（Å）
//! - `origin` 由栅格化器确定：原子包围盒下角再向外留出固定边距
//!
//! ## 依赖关系
//! - 由 `density/rasterize.rs` 创建
//! - 被 `density/filter.rs` 原地修改
//! - 被 `density/export.rs`, `density/plot.rs` 读取

use crate::error::{QdensError, Result};

/// 电子密度网格
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    /// 网格维度 [nx, ny, nz]
    pub shape: [usize; 3],
    /// 体素间距（Å）
    pub spacing: f64,
    /// 体素 (0, 0, 0) 的物理位置（Å）
    pub origin: [f64; 3],
    /// 密度数据
    pub data: Vec<f64>,
}

impl DensityGrid {
    /// 创建全零网格；体素数溢出或内存不足时返回错误
    pub fn zeros(shape: [usize; 3], spacing: f64, origin: [f64; 3]) -> Result<Self> {
        let len = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                QdensError::InvalidArgument(format!(
                    "grid shape {:?} overflows the voxel count",
                    shape
                ))
            })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            QdensError::InvalidArgument(format!(
                "cannot allocate grid of shape {:?}: {}",
                shape, e
            ))
        })?;
        data.resize(len, 0.0);

        Ok(DensityGrid {
            shape,
            spacing,
            origin,
            data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 一个 x 切片（固定 i）包含的体素数
    pub fn slab_len(&self) -> usize {
        self.shape[1] * self.shape[2]
    }

    /// 三维下标 -> 线性下标
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.shape[1] + j) * self.shape[2] + k
    }

    /// 累加到体素
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let idx = self.index(i, j, k);
        self.data[idx] += value;
    }

    /// 体素中心的物理坐标
    pub fn position_of(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        [
            self.origin[0] + i as f64 * self.spacing,
            self.origin[1] + j as f64 * self.spacing,
            self.origin[2] + k as f64 * self.spacing,
        ]
    }

    /// 总密度（所有体素之和）
    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// 最大体素值
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// 最小体素值
    pub fn min_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
impl DensityGrid {
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[self.index(i, j, k)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_z_fastest() {
        let grid = DensityGrid::zeros([2, 3, 4], 1.0, [0.0; 3]).unwrap();
        assert_eq!(grid.data.len(), 24);
        assert_eq!(grid.index(0, 0, 1), 1);
        assert_eq!(grid.index(0, 1, 0), 4);
        assert_eq!(grid.index(1, 0, 0), 12);
        assert_eq!(grid.index(1, 2, 3), 23);
    }

    #[test]
    fn test_position_of_uses_origin_and_spacing() {
        let grid = DensityGrid::zeros([4, 4, 4], 0.5, [-1.0, 2.0, 10.0]).unwrap();
        let p = grid.position_of(2, 0, 3);
        assert!((p[0] - 0.0).abs() < 1e-12);
        assert!((p[1] - 2.0).abs() < 1e-12);
        assert!((p[2] - 11.5).abs() < 1e-12);
    }

    #[test]
    fn test_add_and_total() {
        let mut grid = DensityGrid::zeros([3, 3, 3], 1.0, [0.0; 3]).unwrap();
        grid.add(1, 1, 1, 2.5);
        grid.add(1, 1, 1, 0.5);
        grid.add(0, 2, 1, 1.0);
        assert!((grid.get(1, 1, 1) - 3.0).abs() < 1e-12);
        assert!((grid.total() - 4.0).abs() < 1e-12);
        assert!((grid.max_value() - 3.0).abs() < 1e-12);
        assert_eq!(grid.min_value(), 0.0);
    }

    #[test]
    fn test_zeros_rejects_overflowing_shape() {
        assert!(matches!(
            DensityGrid::zeros([usize::MAX, 2, 1], 1.0, [0.0; 3]),
            Err(QdensError::InvalidArgument(_))
        ));
        // 元素数不溢出但字节数溢出
        assert!(matches!(
            DensityGrid::zeros([usize::MAX / 4, 1, 1], 1.0, [0.0; 3]),
            Err(QdensError::InvalidArgument(_))
        ));
    }
}
