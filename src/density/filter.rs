//! # 低通滤波
//!
//! 对栅格化后的密度做高斯平滑，抑制离散三线性核带来的高频混叠。
//!
//! ## 算法概述
//! - 可分离的空间域高斯卷积，周期（环绕）边界，等价于频域乘以
//!   exp(-damping · u²)，u 为以 Nyquist 频率归一化的频率
//! - σ = √(2·damping) / π（体素），核半宽 max(1, ⌈4σ⌉)，权重归一化，总密度守恒
//! - 每个周期依次沿 z、y、x 轴卷积；设置阈值时，每个周期结束后将低于
//!   阈值的体素置零
//!
//! ## 并行模型
//! 每一轮卷积先复制一份只读快照，再把网格按 x 切片划分为互不相交的区间，
//! 每个工作线程只写自己的区间、只读快照（fork-join，`install` 返回即屏障）。
//! 每个输出体素的计算顺序与划分无关，因此任意线程数下结果逐位一致。
//!
//! ## 依赖关系
//! - 被 `density/pipeline.rs` 调用
//! - 使用 `models/grid.rs`
//! - 使用 `rayon` 线程池

use crate::error::{QdensError, Result};
use crate::models::DensityGrid;

use rayon::prelude::*;
use std::f64::consts::PI;

/// 低通滤波配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassConfig {
    /// 频域高斯阻尼系数：Nyquist 处衰减 exp(-damping)
    pub damping: f64,
    /// 滤波周期数
    pub cycles: usize,
    /// 每周期后置零的阈值
    pub threshold: Option<f64>,
}

impl Default for LowPassConfig {
    fn default() -> Self {
        LowPassConfig {
            damping: 1.0,
            cycles: 1,
            threshold: None,
        }
    }
}

impl LowPassConfig {
    /// 空间域高斯宽度（体素）
    pub fn sigma_voxels(&self) -> f64 {
        (2.0 * self.damping).sqrt() / PI
    }

    /// 归一化的一维卷积核，长度 2r+1
    pub fn kernel(&self) -> Vec<f64> {
        let sigma = self.sigma_voxels();
        let radius = ((4.0 * sigma).ceil() as usize).max(1) as isize;

        let weights: Vec<f64> = (-radius..=radius)
            .map(|t| (-((t * t) as f64) / (2.0 * sigma * sigma)).exp())
            .collect();
        let sum: f64 = weights.iter().sum();

        weights.into_iter().map(|w| w / sum).collect()
    }

    fn validate(&self) -> Result<()> {
        if !self.damping.is_finite() || self.damping <= 0.0 {
            return Err(QdensError::FilterConfigError(format!(
                "damping must be finite and positive, got {}",
                self.damping
            )));
        }
        if self.cycles == 0 {
            return Err(QdensError::FilterConfigError(
                "at least one filter cycle is required".to_string(),
            ));
        }
        if let Some(thr) = self.threshold {
            if !thr.is_finite() {
                return Err(QdensError::FilterConfigError(format!(
                    "threshold must be finite, got {}",
                    thr
                )));
            }
        }
        Ok(())
    }
}

/// 以默认配置低通滤波（消耗网格，原地滤波后返回）
#[cfg_attr(not(test), allow(dead_code))]
pub fn low_pass_filter(grid: DensityGrid, thread_count: usize) -> Result<DensityGrid> {
    low_pass_filter_with(grid, thread_count, &LowPassConfig::default())
}

/// 低通滤波
pub fn low_pass_filter_with(
    mut grid: DensityGrid,
    thread_count: usize,
    config: &LowPassConfig,
) -> Result<DensityGrid> {
    if thread_count == 0 {
        return Err(QdensError::FilterConfigError(
            "thread count must be a positive integer".to_string(),
        ));
    }
    config.validate()?;

    if grid.is_empty() {
        return Ok(grid);
    }

    // 按 x 切片划分，并行度不超过 nx
    let workers = thread_count.min(grid.shape[0]);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| QdensError::FilterConfigError(format!("cannot build worker pool: {}", e)))?;

    let kernel = config.kernel();

    for _ in 0..config.cycles {
        for axis in [2, 1, 0] {
            convolve_axis(&pool, &mut grid, &kernel, axis, workers);
        }

        if let Some(thr) = config.threshold {
            pool.install(|| {
                grid.data.par_iter_mut().for_each(|v| {
                    if *v < thr {
                        *v = 0.0;
                    }
                })
            });
        }
    }

    Ok(grid)
}

/// 沿一个轴做周期卷积
fn convolve_axis(
    pool: &rayon::ThreadPool,
    grid: &mut DensityGrid,
    kernel: &[f64],
    axis: usize,
    workers: usize,
) {
    let shape = grid.shape;
    let [nx, ny, nz] = shape;
    let slab = grid.slab_len();
    let slabs_per_worker = nx.div_ceil(workers);
    let radius = (kernel.len() / 2) as isize;

    let snapshot = grid.data.clone();
    let src = snapshot.as_slice();

    pool.install(|| {
        grid.data
            .par_chunks_mut(slabs_per_worker * slab)
            .enumerate()
            .for_each(|(part, chunk)| {
                let offset = part * slabs_per_worker * slab;
                for (local, out) in chunk.iter_mut().enumerate() {
                    let idx = offset + local;
                    let mut pos = [idx / slab, (idx / nz) % ny, idx % nz];
                    let centre = pos[axis];

                    let mut acc = 0.0;
                    for (t, w) in kernel.iter().enumerate() {
                        pos[axis] = wrap(centre, t as isize - radius, shape[axis]);
                        acc += w * src[(pos[0] * ny + pos[1]) * nz + pos[2]];
                    }
                    *out = acc;
                }
            });
    });
}

#[inline]
fn wrap(i: usize, offset: isize, n: usize) -> usize {
    (i as isize + offset).rem_euclid(n as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 确定性的伪随机网格，含若干孤立尖峰
    fn noisy_grid(shape: [usize; 3]) -> DensityGrid {
        let mut grid = DensityGrid::zeros(shape, 1.0, [0.0; 3]).unwrap();
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for v in grid.data.iter_mut() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            *v = (state % 1000) as f64 / 100.0;
        }
        grid.add(shape[0] / 2, shape[1] / 2, shape[2] / 2, 50.0);
        grid.add(shape[0] - 1, 0, shape[2] - 1, 80.0);
        grid
    }

    /// 周期差分能量，作为高频能量的度量
    fn gradient_energy(grid: &DensityGrid) -> f64 {
        let [nx, ny, nz] = grid.shape;
        let mut energy = 0.0;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let v = grid.get(i, j, k);
                    let dx = grid.get((i + 1) % nx, j, k) - v;
                    let dy = grid.get(i, (j + 1) % ny, k) - v;
                    let dz = grid.get(i, j, (k + 1) % nz) - v;
                    energy += dx * dx + dy * dy + dz * dz;
                }
            }
        }
        energy
    }

    #[test]
    fn test_zero_threads_is_error() {
        let grid = noisy_grid([4, 4, 4]);
        assert!(matches!(
            low_pass_filter(grid, 0),
            Err(QdensError::FilterConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_error() {
        for config in [
            LowPassConfig {
                damping: 0.0,
                ..Default::default()
            },
            LowPassConfig {
                cycles: 0,
                ..Default::default()
            },
            LowPassConfig {
                threshold: Some(f64::NAN),
                ..Default::default()
            },
        ] {
            let grid = noisy_grid([4, 4, 4]);
            assert!(matches!(
                low_pass_filter_with(grid, 2, &config),
                Err(QdensError::FilterConfigError(_))
            ));
        }
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = LowPassConfig::default().kernel();
        assert_eq!(kernel.len() % 2, 1);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for t in 0..kernel.len() / 2 {
            assert_eq!(kernel[t], kernel[kernel.len() - 1 - t]);
        }
        assert!(kernel[kernel.len() / 2] > kernel[0]);
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        // 7 个切片：对 2、4、8 线程都不能整除
        for shape in [[7, 5, 6], [8, 4, 3]] {
            let reference = low_pass_filter(noisy_grid(shape), 1).unwrap();
            for threads in [2, 4, 8] {
                let filtered = low_pass_filter(noisy_grid(shape), threads).unwrap();
                assert_eq!(
                    filtered.data, reference.data,
                    "shape {:?}, {} threads differ from 1 thread",
                    shape, threads
                );
            }
        }
    }

    #[test]
    fn test_thread_count_invariance_with_threshold() {
        let config = LowPassConfig {
            damping: 2.0,
            cycles: 2,
            threshold: Some(1.0),
        };
        let reference = low_pass_filter_with(noisy_grid([9, 3, 5]), 1, &config).unwrap();
        let parallel = low_pass_filter_with(noisy_grid([9, 3, 5]), 4, &config).unwrap();
        assert_eq!(parallel.data, reference.data);
    }

    #[test]
    fn test_total_density_is_conserved() {
        let grid = noisy_grid([6, 7, 5]);
        let before = grid.total();
        let after = low_pass_filter(grid, 3).unwrap().total();
        assert!(((after - before) / before).abs() < 1e-12);
    }

    #[test]
    fn test_second_pass_does_not_increase_high_frequency_energy() {
        let raw = noisy_grid([8, 6, 7]);
        let raw_energy = gradient_energy(&raw);

        let once = low_pass_filter(raw, 4).unwrap();
        let once_energy = gradient_energy(&once);

        let twice = low_pass_filter(once.clone(), 4).unwrap();
        let twice_energy = gradient_energy(&twice);

        assert!(once_energy < raw_energy);
        assert!(twice_energy <= once_energy * (1.0 + 1e-12));
        // 平滑算子不是投影
        assert_ne!(twice.data, once.data);
    }

    #[test]
    fn test_threshold_zeroes_small_voxels() {
        let mut grid = DensityGrid::zeros([5, 5, 5], 1.0, [0.0; 3]).unwrap();
        grid.add(2, 2, 2, 100.0);
        let config = LowPassConfig {
            damping: 1.0,
            cycles: 2,
            threshold: Some(1e-3),
        };
        let filtered = low_pass_filter_with(grid, 2, &config).unwrap();
        assert!(filtered.data.iter().all(|&v| v == 0.0 || v >= 1e-3));
        assert!(filtered.data.iter().any(|&v| v == 0.0));
        assert!(filtered.get(2, 2, 2) > 0.0);
    }

    #[test]
    fn test_degenerate_axis_is_identity_along_it() {
        // nx = 1：x 方向卷积只会环绕到自身
        let grid = noisy_grid([1, 4, 4]);
        let filtered = low_pass_filter(grid.clone(), 8).unwrap();
        assert_eq!(filtered.shape, grid.shape);
        assert!(((filtered.total() - grid.total()) / grid.total()).abs() < 1e-12);
    }

    #[test]
    fn test_metadata_is_preserved() {
        let mut grid = noisy_grid([4, 4, 4]);
        grid.spacing = 0.37;
        grid.origin = [1.0, -2.0, 3.0];
        let filtered = low_pass_filter(grid, 2).unwrap();
        assert_eq!(filtered.spacing, 0.37);
        assert_eq!(filtered.origin, [1.0, -2.0, 3.0]);
    }
}
