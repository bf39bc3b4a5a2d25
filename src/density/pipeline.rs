//! # 密度合成流水线
//!
//! 串联四个阶段：几何 → 结构 → 栅格化 → 低通滤波。
//! 各阶段严格顺序执行，阶段之间是完全屏障；只有滤波阶段内部并行。
//! 几何在打开结构文件之前校验，错误的实验参数不会触发任何解析。
//!
//! ## 依赖关系
//! - 被 `commands/make.rs` 调用
//! - 使用 `density/` 下的 qspace, scattering, loader, rasterize, filter

use crate::density::filter::{low_pass_filter_with, LowPassConfig};
use crate::density::loader::{composition, load_atoms_with};
use crate::density::rasterize::{atoms_to_density_with, RasterOptions};
use crate::density::scattering::ScatteringTable;
use crate::error::Result;
use crate::models::{
    DensityGrid, DetectorGeometry, GeometryInput, ReciprocalSamplingParams, ScatteringDescriptor,
};

use std::collections::BTreeMap;
use std::path::PathBuf;

/// 散射描述符来源
#[derive(Debug, Clone)]
pub enum ScatteringSource {
    /// 内置 Cromer-Mann 前向散射因子
    Builtin,
    /// Henke `.nff` 表目录
    HenkeDir(PathBuf),
}

/// 一次密度合成任务
#[derive(Debug, Clone)]
pub struct DensityJob {
    /// 未经校验的几何，在第一阶段校验
    pub geometry: GeometryInput,
    pub structure: PathBuf,
    pub scattering: ScatteringSource,
    /// 显式给定的散射描述符，覆盖或补充 `scattering` 表
    pub scattering_overrides: BTreeMap<String, ScatteringDescriptor>,
    pub threads: usize,
    pub raster: RasterOptions,
    pub filter: LowPassConfig,
}

impl DensityJob {
    /// 在给定波长下构建散射表
    fn scattering_table(&self, wavelength: f64) -> Result<ScatteringTable> {
        let table = match &self.scattering {
            ScatteringSource::Builtin => ScatteringTable::builtin(wavelength),
            ScatteringSource::HenkeDir(dir) => ScatteringTable::from_henke_dir(dir, wavelength)?,
        };
        Ok(table.with_overrides(
            self.scattering_overrides
                .iter()
                .map(|(el, d)| (el.as_str(), *d)),
        ))
    }
}

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Geometry,
    Structure,
    Rasterize,
    Filter,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Geometry => "Resolving reciprocal-space sampling",
            Stage::Structure => "Loading structure",
            Stage::Rasterize => "Rasterizing atoms",
            Stage::Filter => "Low-pass filtering",
        }
    }
}

/// 流水线产物
#[derive(Debug, Clone)]
pub struct DensityProduct {
    pub geometry: DetectorGeometry,
    pub q_params: ReciprocalSamplingParams,
    /// 实际使用的散射表
    pub scattering: ScatteringTable,
    pub atom_count: usize,
    /// 元素 → 原子数
    pub composition: BTreeMap<String, usize>,
    /// 滤波前的总密度
    pub raw_total: f64,
    pub grid: DensityGrid,
}

impl DensityProduct {
    /// 化学式字符串
    pub fn formula(&self) -> String {
        self.composition
            .iter()
            .map(|(el, n)| format!("{}{}", el, n))
            .collect()
    }
}

/// 运行流水线；每个阶段开始前回调 `on_stage`
pub fn run(job: &DensityJob, mut on_stage: impl FnMut(Stage)) -> Result<DensityProduct> {
    on_stage(Stage::Geometry);
    let geometry = job.geometry.resolve()?;
    let q_params = ReciprocalSamplingParams::from_geometry(&geometry)?;

    on_stage(Stage::Structure);
    let scattering = job.scattering_table(geometry.wavelength())?;
    let atoms = load_atoms_with(&job.structure, &scattering)?;

    on_stage(Stage::Rasterize);
    let raw = atoms_to_density_with(&atoms, q_params.half_period_resolution, &job.raster)?;
    let raw_total = raw.total();

    on_stage(Stage::Filter);
    let grid = low_pass_filter_with(raw, job.threads, &job.filter)?;

    Ok(DensityProduct {
        geometry,
        q_params,
        scattering,
        atom_count: atoms.len(),
        composition: composition(&atoms)
            .into_iter()
            .map(|(el, n)| (el.to_string(), n))
            .collect(),
        raw_total,
        grid,
    })
}
