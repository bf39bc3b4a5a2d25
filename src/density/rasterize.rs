//! # 密度栅格化
//!
//! 将原子列表映射到规则三维网格上，得到电子密度体数据。
//!
//! ## 算法概述
//! 1. 计算全部原子坐标的包围盒，各方向外扩 `MARGIN_VOXELS` 个体素
//! 2. 以分辨率为体素间距分配全零网格
//! 3. 每个原子的权重 f1 × 占有率按三线性（cloud-in-cell）核分配到
//!    周围 8 个体素，8 个权重之和恰为 1，因此单个原子的核积分等于其权重
//! 4. 各原子贡献线性叠加，使用 f64 累加，不做截断或取整
//!
//! 网格范围只取决于坐标极值，结果与原子顺序无关（仅差浮点结合律误差）。
//!
//! ## 依赖关系
//! - 被 `density/pipeline.rs` 调用
//! - 使用 `models/atom.rs`, `models/grid.rs`

use crate::error::{QdensError, Result};
use crate::models::{Atom, DensityGrid};

/// 包围盒各方向外扩的体素数
pub const MARGIN_VOXELS: usize = 2;

/// 栅格化选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterOptions {
    /// 生成立方体网格（各轴取最大尺寸，以包围盒中心居中）
    pub cubic: bool,
}

/// 以默认选项栅格化
#[cfg_attr(not(test), allow(dead_code))]
pub fn atoms_to_density(atoms: &[Atom], resolution: f64) -> Result<DensityGrid> {
    atoms_to_density_with(atoms, resolution, &RasterOptions::default())
}

/// 栅格化原子为密度网格
pub fn atoms_to_density_with(
    atoms: &[Atom],
    resolution: f64,
    options: &RasterOptions,
) -> Result<DensityGrid> {
    if atoms.is_empty() {
        return Err(QdensError::EmptyStructureError);
    }

    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(QdensError::InvalidGeometryError(format!(
            "grid resolution must be finite and positive, got {}",
            resolution
        )));
    }

    let (lo, hi) = bounding_box(atoms)?;
    let (shape, origin) = grid_layout(lo, hi, resolution, options.cubic)?;

    let mut grid = DensityGrid::zeros(shape, resolution, origin)?;
    for atom in atoms {
        deposit(&mut grid, atom);
    }

    Ok(grid)
}

/// 原子坐标包围盒
fn bounding_box(atoms: &[Atom]) -> Result<([f64; 3], [f64; 3])> {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];

    for atom in atoms {
        for a in 0..3 {
            let x = atom.position[a];
            if !x.is_finite() {
                return Err(QdensError::InvalidArgument(format!(
                    "non-finite coordinate for {} atom: {:?}",
                    atom.element, atom.position
                )));
            }
            lo[a] = lo[a].min(x);
            hi[a] = hi[a].max(x);
        }
    }

    Ok((lo, hi))
}

/// 由包围盒确定网格形状与原点
fn grid_layout(
    lo: [f64; 3],
    hi: [f64; 3],
    resolution: f64,
    cubic: bool,
) -> Result<([usize; 3], [f64; 3])> {
    let mut shape = [0usize; 3];
    for a in 0..3 {
        // 超出 usize 的跨度饱和为 usize::MAX，随后的加法报错
        let cells = ((hi[a] - lo[a]) / resolution).ceil() as usize;
        shape[a] = cells.checked_add(2 * MARGIN_VOXELS + 1).ok_or_else(|| {
            QdensError::InvalidArgument(format!(
                "structure extent {} Å along axis {} is too large for resolution {} Å",
                hi[a] - lo[a],
                a,
                resolution
            ))
        })?;
    }

    if !cubic {
        let margin = MARGIN_VOXELS as f64 * resolution;
        let origin = [lo[0] - margin, lo[1] - margin, lo[2] - margin];
        return Ok((shape, origin));
    }

    let n = shape.iter().copied().max().unwrap_or(1);
    let half = (n - 1) as f64 / 2.0 * resolution;
    let mut origin = [0.0; 3];
    for a in 0..3 {
        origin[a] = 0.5 * (lo[a] + hi[a]) - half;
    }

    Ok(([n; 3], origin))
}

/// 三线性核沉积单个原子
fn deposit(grid: &mut DensityGrid, atom: &Atom) {
    let weight = atom.weight();
    let mut base = [0usize; 3];
    let mut frac = [0.0f64; 3];

    for a in 0..3 {
        let u = (atom.position[a] - grid.origin[a]) / grid.spacing;
        let f = u.floor();
        base[a] = f as usize;
        frac[a] = u - f;
        debug_assert!(base[a] + 1 < grid.shape[a], "atom outside grid margin");
    }

    for (di, wx) in [(0, 1.0 - frac[0]), (1, frac[0])] {
        for (dj, wy) in [(0, 1.0 - frac[1]), (1, frac[1])] {
            for (dk, wz) in [(0, 1.0 - frac[2]), (1, frac[2])] {
                grid.add(
                    base[0] + di,
                    base[1] + dj,
                    base[2] + dk,
                    weight * wx * wy * wz,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScatteringDescriptor;

    fn atom(element: &str, f1: f64, position: [f64; 3]) -> Atom {
        Atom::new(element, position, ScatteringDescriptor::real(f1))
    }

    fn sample_atoms() -> Vec<Atom> {
        vec![
            atom("C", 6.0, [0.13, 1.71, -2.20]),
            atom("N", 7.0, [3.91, 0.25, 1.04]),
            atom("O", 8.0, [-1.37, 2.66, 0.58]).with_occupancy(0.5),
            atom("S", 16.0, [2.02, -3.33, 4.40]),
            atom("C", 6.0, [0.99, 0.01, 0.77]),
            atom("Fe", 26.0, [1.11, 1.11, 1.11]),
        ]
    }

    #[test]
    fn test_empty_structure_is_error() {
        assert!(matches!(
            atoms_to_density(&[], 1.0),
            Err(QdensError::EmptyStructureError)
        ));
    }

    #[test]
    fn test_invalid_resolution_is_error() {
        let atoms = sample_atoms();
        assert!(matches!(
            atoms_to_density(&atoms, 0.0),
            Err(QdensError::InvalidGeometryError(_))
        ));
        assert!(matches!(
            atoms_to_density(&atoms, f64::INFINITY),
            Err(QdensError::InvalidGeometryError(_))
        ));
    }

    #[test]
    fn test_total_density_equals_sum_of_weights() {
        let atoms = sample_atoms();
        let expected: f64 = atoms.iter().map(|a| a.weight()).sum();
        let grid = atoms_to_density(&atoms, 0.7).unwrap();
        assert!((grid.total() - expected).abs() < 1e-9);
        assert!(grid.min_value() >= 0.0);
    }

    #[test]
    fn test_first_moment_is_preserved() {
        let atoms = sample_atoms();
        let grid = atoms_to_density(&atoms, 0.45).unwrap();

        let total: f64 = atoms.iter().map(|a| a.weight()).sum();
        for axis in 0..3 {
            let expected: f64 = atoms.iter().map(|a| a.weight() * a.position[axis]).sum();
            let mut moment = 0.0;
            for i in 0..grid.shape[0] {
                for j in 0..grid.shape[1] {
                    for k in 0..grid.shape[2] {
                        moment += grid.get(i, j, k) * grid.position_of(i, j, k)[axis];
                    }
                }
            }
            assert!(
                ((moment - expected) / total).abs() < 1e-9,
                "axis {} centroid mismatch",
                axis
            );
        }
    }

    #[test]
    fn test_order_independence() {
        let atoms = sample_atoms();
        let reference = atoms_to_density(&atoms, 0.5).unwrap();

        let mut reversed = atoms.clone();
        reversed.reverse();
        let mut rotated = atoms.clone();
        rotated.rotate_left(2);

        for permuted in [reversed, rotated] {
            let grid = atoms_to_density(&permuted, 0.5).unwrap();
            assert_eq!(grid.shape, reference.shape);
            assert_eq!(grid.origin, reference.origin);
            for (a, b) in grid.data.iter().zip(reference.data.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_atom_layout_and_margin() {
        let atoms = vec![atom("C", 6.0, [10.0, -4.0, 3.0])];
        let grid = atoms_to_density(&atoms, 0.5).unwrap();

        let n = 2 * MARGIN_VOXELS + 1;
        assert_eq!(grid.shape, [n, n, n]);
        assert_eq!(grid.spacing, 0.5);
        assert!((grid.origin[0] - 9.0).abs() < 1e-12);
        assert!((grid.origin[1] + 5.0).abs() < 1e-12);

        // 原子恰好落在体素 (2, 2, 2) 上
        let m = MARGIN_VOXELS;
        assert!((grid.get(m, m, m) - 6.0).abs() < 1e-9);
        assert!((grid.total() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_extent_covers_bounding_box() {
        let atoms = sample_atoms();
        let resolution = 0.8;
        let grid = atoms_to_density(&atoms, resolution).unwrap();

        for atom in &atoms {
            for a in 0..3 {
                let u = (atom.position[a] - grid.origin[a]) / resolution;
                assert!(u >= MARGIN_VOXELS as f64 - 1e-9);
                assert!(u <= (grid.shape[a] - 1 - MARGIN_VOXELS) as f64 + 1e-9);
            }
        }
    }

    #[test]
    fn test_cubic_grid_is_centred() {
        let atoms = sample_atoms();
        let options = RasterOptions { cubic: true };
        let grid = atoms_to_density_with(&atoms, 0.6, &options).unwrap();

        assert_eq!(grid.shape[0], grid.shape[1]);
        assert_eq!(grid.shape[1], grid.shape[2]);

        let plain = atoms_to_density(&atoms, 0.6).unwrap();
        assert_eq!(grid.shape[0], *plain.shape.iter().max().unwrap());
        assert!((grid.total() - plain.total()).abs() < 1e-9);

        let (lo, hi) = bounding_box(&atoms).unwrap();
        let n = grid.shape[0];
        for a in 0..3 {
            let centre = grid.origin[a] + (n - 1) as f64 / 2.0 * grid.spacing;
            assert!((centre - 0.5 * (lo[a] + hi[a])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_non_finite_coordinate_is_error() {
        let atoms = vec![atom("C", 6.0, [f64::NAN, 0.0, 0.0])];
        assert!(matches!(
            atoms_to_density(&atoms, 1.0),
            Err(QdensError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_grid_is_error() {
        // 每轴 1e10 个体素，总数溢出 usize
        let atoms = vec![
            atom("C", 6.0, [0.0, 0.0, 0.0]),
            atom("C", 6.0, [1.0e7, 1.0e7, 1.0e7]),
        ];
        assert!(matches!(
            atoms_to_density(&atoms, 1.0e-3),
            Err(QdensError::InvalidArgument(_))
        ));
        assert!(matches!(
            atoms_to_density_with(&atoms, 1.0e-3, &RasterOptions { cubic: true }),
            Err(QdensError::InvalidArgument(_))
        ));

        // 跨度溢出为无穷大
        let atoms = vec![
            atom("C", 6.0, [-1.0e308, 0.0, 0.0]),
            atom("C", 6.0, [1.0e308, 0.0, 0.0]),
        ];
        assert!(matches!(
            atoms_to_density(&atoms, 1.0),
            Err(QdensError::InvalidArgument(_))
        ));
    }
}
