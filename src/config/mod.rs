//! # 实验配置文件
//!
//! 读取 TOML 格式的实验配置，得到探测器几何、输入输出路径和滤波参数。
//!
//! ## 文件结构
//! ```toml
//! [detector]
//! distance = 586.0      # mm
//! pixels_x = 150
//! pixels_y = 150
//! pixel_size = 0.3      # mm
//! wavelength = 7.75     # Å
//! ewald_radius = 0.129  # Å⁻¹，可省略（由 1/λ 导出）
//!
//! [make_densities]
//! in_pdb_file = "aux/4BED.pdb"
//! out_density_file = "data/densityMap.bin"
//! scatt_dir = "aux/henke_table"   # 可省略，默认使用内置表
//! num_threads = 4
//! binary = true
//! cubic = true
//!
//! [low_pass]                      # 可省略
//! damping = 1.0
//! cycles = 2
//! threshold = 1e-3
//!
//! [scattering_factors]            # 可省略，覆盖或补充散射表
//! Pu = { f1 = 94.0, f2 = 0.0 }
//! ```
//! 相对路径以主目录为基准（默认为配置文件所在目录）。未知键一律拒绝。
//! 内置表只含常见元素（H 到 U 中的 70 余种），其余元素需由 Henke 表或
//! `[scattering_factors]` 给出，否则加载结构时报 `UnknownElementError`。
//!
//! ## 依赖关系
//! - 被 `commands/make.rs`, `commands/qparams.rs` 使用
//! - 使用 `models/geometry.rs`, `density/pipeline.rs`
//! - 使用 `serde` + `toml`

use crate::density::filter::LowPassConfig;
use crate::density::pipeline::{DensityJob, ScatteringSource};
use crate::density::rasterize::RasterOptions;
use crate::error::{QdensError, Result};
use crate::models::{GeometryInput, ScatteringDescriptor};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_THREADS: usize = 4;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    detector: GeometryInput,
    make_densities: MakeDensitiesSection,
    #[serde(default)]
    low_pass: Option<LowPassSection>,
    #[serde(default)]
    scattering_factors: BTreeMap<String, ScatteringDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct MakeDensitiesSection {
    in_pdb_file: PathBuf,
    out_density_file: PathBuf,
    #[serde(default)]
    scatt_dir: Option<PathBuf>,
    #[serde(default = "default_threads")]
    num_threads: usize,
    #[serde(default = "default_true")]
    binary: bool,
    #[serde(default = "default_true")]
    cubic: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct LowPassSection {
    #[serde(default = "default_damping")]
    damping: f64,
    #[serde(default = "default_cycles")]
    cycles: usize,
    #[serde(default = "default_threshold")]
    threshold: Option<f64>,
}

impl Default for LowPassSection {
    fn default() -> Self {
        LowPassSection {
            damping: default_damping(),
            cycles: default_cycles(),
            threshold: default_threshold(),
        }
    }
}

impl From<LowPassSection> for LowPassConfig {
    fn from(s: LowPassSection) -> Self {
        LowPassConfig {
            damping: s.damping,
            cycles: s.cycles,
            threshold: s.threshold,
        }
    }
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_true() -> bool {
    true
}

fn default_damping() -> f64 {
    1.0
}

fn default_cycles() -> usize {
    2
}

fn default_threshold() -> Option<f64> {
    Some(1e-3)
}

/// 解析并解析路径后的实验配置
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// 配置文件路径
    pub source: PathBuf,
    pub geometry: GeometryInput,
    pub structure: PathBuf,
    pub output: PathBuf,
    pub scatt_dir: Option<PathBuf>,
    pub threads: usize,
    pub binary: bool,
    pub cubic: bool,
    pub low_pass: LowPassConfig,
    /// 元素 → 显式散射描述符
    pub scattering_factors: BTreeMap<String, ScatteringDescriptor>,
}

impl ExperimentConfig {
    /// 读取配置文件；`main_dir` 缺省时以配置文件所在目录为基准
    pub fn load(path: &Path, main_dir: Option<&Path>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| QdensError::ConfigError {
            path: path.display().to_string(),
            reason: format!("Cannot read file: {}", e),
        })?;

        let base = match main_dir {
            Some(dir) => dir.to_path_buf(),
            None => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Self::parse(&content, path, &base)
    }

    /// 从字符串内容解析
    pub fn parse(content: &str, source: &Path, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| QdensError::ConfigError {
            path: source.display().to_string(),
            reason: e.to_string(),
        })?;

        if let Some((element, _)) = file
            .scattering_factors
            .iter()
            .find(|(_, d)| !d.f1.is_finite() || !d.f2.is_finite())
        {
            return Err(QdensError::ConfigError {
                path: source.display().to_string(),
                reason: format!("scattering factor for '{}' must be finite", element),
            });
        }

        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        let section = file.make_densities;
        Ok(ExperimentConfig {
            source: source.to_path_buf(),
            geometry: file.detector,
            structure: resolve(&section.in_pdb_file),
            output: resolve(&section.out_density_file),
            scatt_dir: section.scatt_dir.as_deref().map(resolve),
            threads: section.num_threads,
            binary: section.binary,
            cubic: section.cubic,
            low_pass: file.low_pass.unwrap_or_default().into(),
            scattering_factors: file.scattering_factors,
        })
    }

    /// 构造流水线任务；`threads` 覆盖配置中的线程数
    pub fn to_job(&self, threads: Option<usize>) -> DensityJob {
        DensityJob {
            geometry: self.geometry,
            structure: self.structure.clone(),
            scattering: match &self.scatt_dir {
                Some(dir) => ScatteringSource::HenkeDir(dir.clone()),
                None => ScatteringSource::Builtin,
            },
            scattering_overrides: self.scattering_factors.clone(),
            threads: threads.unwrap_or(self.threads),
            raster: RasterOptions { cubic: self.cubic },
            filter: self.low_pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPERIMENT: &str = r#"
[detector]
distance = 586.0
pixels_x = 150
pixels_y = 150
pixel_size = 0.3
wavelength = 7.75
ewald_radius = 0.129

[make_densities]
in_pdb_file = "aux/4BED.pdb"
out_density_file = "data/densityMap.bin"
scatt_dir = "aux/henke_table"
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config =
            ExperimentConfig::parse(EXPERIMENT, Path::new("exp.toml"), Path::new("/work")).unwrap();

        assert_eq!(config.geometry.distance, 586.0);
        assert_eq!(config.geometry.ewald_radius, Some(0.129));
        assert_eq!(config.structure, PathBuf::from("/work/aux/4BED.pdb"));
        assert_eq!(config.output, PathBuf::from("/work/data/densityMap.bin"));
        assert_eq!(config.scatt_dir, Some(PathBuf::from("/work/aux/henke_table")));
        assert_eq!(config.threads, 4);
        assert!(config.binary);
        assert!(config.cubic);
        assert_eq!(config.low_pass.cycles, 2);
        assert_eq!(config.low_pass.threshold, Some(1e-3));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let content = EXPERIMENT.replace("\"aux/4BED.pdb\"", "\"/data/4BED.pdb\"");
        let config =
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new("/work")).unwrap();
        assert_eq!(config.structure, PathBuf::from("/data/4BED.pdb"));
    }

    #[test]
    fn test_low_pass_section_overrides() {
        let content = format!(
            "{}\n[low_pass]\ndamping = 2.5\ncycles = 3\n",
            EXPERIMENT.replace("scatt_dir = \"aux/henke_table\"\n", "num_threads = 8\nbinary = false\n")
        );
        let config =
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new(".")).unwrap();

        assert_eq!(config.low_pass.damping, 2.5);
        assert_eq!(config.low_pass.cycles, 3);
        assert_eq!(config.low_pass.threshold, Some(1e-3));
        assert_eq!(config.threads, 8);
        assert!(!config.binary);
        assert!(config.scatt_dir.is_none());

        let job = config.to_job(None);
        assert!(matches!(job.scattering, ScatteringSource::Builtin));
        assert_eq!(job.threads, 8);
        assert_eq!(config.to_job(Some(2)).threads, 2);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let content = EXPERIMENT.replace("pixel_size = 0.3", "pixel_size = 0.3\npixel_pitch = 0.3");
        assert!(matches!(
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new(".")),
            Err(QdensError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let content = EXPERIMENT.replace("wavelength = 7.75\n", "");
        assert!(matches!(
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new(".")),
            Err(QdensError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_load_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.toml");
        fs::write(&path, EXPERIMENT).unwrap();

        let config = ExperimentConfig::load(&path, None).unwrap();
        assert_eq!(config.structure, dir.path().join("aux/4BED.pdb"));

        let other = tempfile::tempdir().unwrap();
        let config = ExperimentConfig::load(&path, Some(other.path())).unwrap();
        assert_eq!(config.output, other.path().join("data/densityMap.bin"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(
            ExperimentConfig::load(Path::new("/nonexistent/exp.toml"), None),
            Err(QdensError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_scattering_factors_section() {
        let content = format!("{}\n[scattering_factors]\nPu = {{ f1 = 94.0 }}\n", EXPERIMENT);
        let config =
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new(".")).unwrap();
        assert_eq!(
            config.scattering_factors.get("Pu"),
            Some(&ScatteringDescriptor::real(94.0))
        );
        let job = config.to_job(None);
        assert_eq!(job.scattering_overrides.len(), 1);

        let bad = format!("{}\n[scattering_factors]\nPu = {{ f1 = nan }}\n", EXPERIMENT);
        assert!(matches!(
            ExperimentConfig::parse(&bad, Path::new("exp.toml"), Path::new(".")),
            Err(QdensError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_geometry_is_not_validated_at_load() {
        // 几何校验在流水线第一阶段进行
        let content = EXPERIMENT.replace("wavelength = 7.75", "wavelength = -1.0");
        let config =
            ExperimentConfig::parse(&content, Path::new("exp.toml"), Path::new(".")).unwrap();
        assert!(matches!(
            config.geometry.resolve(),
            Err(QdensError::InvalidGeometryError(_))
        ));
    }
}
