//! # 原子散射因子表
//!
//! 构造按波长解析好的、不可变的元素 → 散射描述符查找表。
//! 散射表由结构加载器构造一次，作为参数显式传递，不存在全局状态。
//!
//! ## 数据来源
//! - 内置表：Cromer–Mann 系数，f(s) = Σᵢ aᵢ exp(-bᵢ s²) + c，取前向值 f(0)；
//!   International Tables for Crystallography, Vol. C, Table 6.1.1.4。
//!   不含反常散射项，与波长无关。
//! - Henke 表：目录下的 `<element>.nff` 文件，按光子能量 E = hc/λ 插值，
//!   在吸收边附近给出随波长变化的 f1/f2。
//!
//! 未收录的元素不会回退到任何默认值。
//!
//! ## 依赖关系
//! - 被 `density/loader.rs` 使用
//! - 使用 `parsers/henke.rs` 读取 Henke 表
//! - 使用 `walkdir` 扫描表目录

use crate::error::{QdensError, Result};
use crate::models::ScatteringDescriptor;
use crate::parsers::henke;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// hc（eV·Å）
pub const HC_EV_ANGSTROM: f64 = 12398.419843320026;

/// 波长（Å）对应的光子能量（eV）
pub fn photon_energy_ev(wavelength: f64) -> f64 {
    HC_EV_ANGSTROM / wavelength
}

/// Cromer–Mann 参数
#[derive(Debug, Clone, Copy)]
pub struct CromerMann {
    pub a: [f64; 4],
    pub b: [f64; 4],
    pub c: f64,
}

impl CromerMann {
    /// 计算散射因子 f(s)，其中 s = sin(θ)/λ
    pub fn calculate(&self, s: f64) -> f64 {
        let s2 = s * s;
        self.a
            .iter()
            .zip(self.b.iter())
            .fold(self.c, |f, (a, b)| f + a * (-b * s2).exp())
    }

    /// 前向散射因子 f(0)
    pub fn forward(&self) -> f64 {
        self.calculate(0.0)
    }
}

/// 内置 Cromer–Mann 系数：(元素, 原子序数, a, b, c)
#[rustfmt::skip]
const CROMER_MANN: &[(&str, u32, [f64; 4], [f64; 4], f64)] = &[
    ("H",   1, [0.493002, 0.322912, 0.140191, 0.040810],  [10.5109, 26.1257, 3.14236, 57.7997],   0.003038),
    ("D",   1, [0.493002, 0.322912, 0.140191, 0.040810],  [10.5109, 26.1257, 3.14236, 57.7997],   0.003038),
    ("He",  2, [0.8734, 0.6309, 0.3112, 0.1780],          [9.1037, 3.3568, 22.9276, 0.9821],      0.0064),
    ("Li",  3, [1.1282, 0.7508, 0.6175, 0.4653],          [3.9546, 1.0524, 85.3905, 168.261],     0.0377),
    ("Be",  4, [1.5919, 1.1278, 0.5391, 0.7029],          [43.6427, 1.8623, 103.483, 0.5420],     0.0385),
    ("B",   5, [2.0545, 1.3326, 1.0979, 0.7068],          [23.2185, 1.0210, 60.3498, 0.1403],     -0.1932),
    ("C",   6, [2.3100, 1.0200, 1.5886, 0.8650],          [20.8439, 10.2075, 0.5687, 51.6512],    0.2156),
    ("N",   7, [12.2126, 3.1322, 2.0125, 1.1663],         [0.0057, 9.8933, 28.9975, 0.5826],      -11.529),
    ("O",   8, [3.0485, 2.2868, 1.5463, 0.8670],          [13.2771, 5.7011, 0.3239, 32.9089],     0.2508),
    ("F",   9, [3.5392, 2.6412, 1.5170, 1.0243],          [10.2825, 4.2944, 0.2615, 26.1476],     0.2776),
    ("Na", 11, [4.7626, 3.1736, 1.2674, 1.1128],          [3.2850, 8.8422, 0.3136, 129.424],      0.6760),
    ("Mg", 12, [5.4204, 2.1735, 1.2269, 2.3073],          [2.8275, 79.2611, 0.3808, 7.1937],      0.8584),
    ("Al", 13, [6.4202, 1.9002, 1.5936, 1.9646],          [3.0387, 0.7426, 31.5472, 85.0886],     1.1151),
    ("Si", 14, [6.2915, 3.0353, 1.9891, 1.5410],          [2.4386, 32.3337, 0.6785, 81.6937],     1.1407),
    ("P",  15, [6.4345, 4.1791, 1.7800, 1.4908],          [1.9067, 27.1570, 0.5260, 68.1645],     1.1149),
    ("S",  16, [6.9053, 5.2034, 1.4379, 1.5863],          [1.4679, 22.2151, 0.2536, 56.1720],     0.8669),
    ("Cl", 17, [11.4604, 7.1964, 6.2556, 1.6455],         [0.0104, 1.1662, 18.5194, 47.7784],     -9.5574),
    ("Ar", 18, [7.4845, 6.7723, 0.6539, 1.6442],          [0.9072, 14.8407, 43.8983, 33.3929],    1.4445),
    ("K",  19, [8.2186, 7.4398, 1.0519, 0.8659],          [12.7949, 0.7748, 213.187, 41.6841],    1.4228),
    ("Ca", 20, [8.6266, 7.3873, 1.5899, 1.0211],          [10.4421, 0.6599, 85.7484, 178.437],    1.3751),
    ("Ti", 22, [9.7595, 7.3558, 1.6991, 1.9021],          [7.8508, 0.5000, 35.6338, 116.105],     1.2807),
    ("V",  23, [10.2971, 7.3511, 2.0703, 2.0571],         [6.8657, 0.4385, 26.8938, 102.478],     1.2199),
    ("Cr", 24, [10.6406, 7.3537, 3.3240, 1.4922],         [6.1038, 0.3920, 20.2626, 98.7399],     1.1832),
    ("Mn", 25, [11.2819, 7.3573, 3.0193, 2.2441],         [5.3409, 0.3432, 17.8674, 83.7543],     1.0896),
    ("Fe", 26, [11.7695, 7.3573, 3.5222, 2.3045],         [4.7611, 0.3072, 15.3535, 76.8805],     1.0369),
    ("Co", 27, [12.2841, 7.3409, 4.0034, 2.3488],         [4.2791, 0.2784, 13.5359, 71.1692],     1.0118),
    ("Ni", 28, [12.8376, 7.2920, 4.4438, 2.3800],         [3.8785, 0.2565, 12.1763, 66.3421],     1.0341),
    ("Cu", 29, [13.3380, 7.1676, 5.6158, 1.6735],         [3.5828, 0.2470, 11.3966, 64.8126],     1.1910),
    ("Zn", 30, [14.0743, 7.0318, 5.1652, 2.4100],         [3.2655, 0.2333, 10.3163, 58.7097],     1.3041),
    ("Ga", 31, [15.2354, 6.7006, 4.3591, 2.9623],         [3.0669, 0.2412, 10.7805, 61.4135],     1.7189),
    ("Ge", 32, [16.0816, 6.3747, 3.7068, 3.6830],         [2.8509, 0.2516, 11.4468, 54.7625],     2.1313),
    ("As", 33, [16.6723, 6.0701, 3.4313, 4.2779],         [2.6345, 0.2647, 12.9479, 47.7972],     2.531),
    ("Se", 34, [17.0006, 5.8196, 3.9731, 4.3543],         [2.4098, 0.2726, 15.2372, 43.8163],     2.8409),
    ("Br", 35, [17.1789, 5.2358, 5.6377, 3.9851],         [2.1723, 16.5796, 0.2609, 41.4328],     2.9557),
    ("Rb", 37, [17.1784, 9.6435, 5.1399, 1.5292],         [1.7888, 17.3151, 0.2748, 164.934],     3.4873),
    ("Sr", 38, [17.5663, 9.8184, 5.4220, 2.6694],         [1.5564, 14.0988, 0.1664, 132.376],     2.5064),
    ("Y",  39, [17.7760, 10.2946, 5.7263, 3.2656],        [1.4029, 12.8006, 0.1255, 104.354],     1.9341),
    ("Zr", 40, [17.8765, 10.9480, 5.4173, 3.6577],        [1.2761, 11.9160, 0.1176, 87.6627],     2.0690),
    ("Nb", 41, [17.6142, 12.0144, 4.0418, 3.5334],        [1.1886, 11.7660, 0.2047, 69.7957],     3.7553),
    ("Mo", 42, [3.7025, 17.2356, 12.8876, 3.7429],        [0.2772, 1.0958, 11.0040, 61.6584],     4.3875),
    ("Ru", 44, [19.2674, 12.9182, 4.86337, 1.56756],      [0.80852, 8.43467, 24.7997, 94.2928],   5.37874),
    ("Rh", 45, [19.2957, 14.3501, 4.73425, 1.28918],      [0.751536, 8.21758, 25.8749, 98.6062],  5.3280),
    ("Pd", 46, [19.3319, 15.5017, 5.29537, 0.605844],     [0.698655, 7.98929, 25.2052, 76.8986],  5.26593),
    ("Ag", 47, [19.2808, 16.6885, 4.8045, 1.0463],        [0.6446, 7.4726, 24.6605, 99.8156],     5.1790),
    ("Cd", 48, [19.2214, 17.6444, 4.4610, 1.6029],        [0.5946, 6.9089, 24.7008, 87.4825],     5.0694),
    ("In", 49, [19.1624, 18.5596, 4.2948, 2.0396],        [0.5476, 6.3776, 25.8499, 92.8029],     4.9391),
    ("Sn", 50, [19.1889, 19.1005, 4.4585, 2.4663],        [5.8303, 0.5031, 26.8909, 83.9571],     4.7821),
    ("Sb", 51, [19.6418, 19.0455, 5.0371, 2.6827],        [5.3034, 0.4607, 27.9074, 75.2825],     4.5909),
    ("Te", 52, [19.9644, 19.0138, 6.14487, 2.5239],       [4.81742, 0.420885, 28.5284, 70.8403],  4.3520),
    ("I",  53, [20.1472, 18.9949, 7.5138, 2.2735],        [4.3470, 0.3814, 27.7660, 66.8776],     4.0712),
    ("Xe", 54, [20.2933, 19.0298, 8.9767, 1.9900],        [3.9282, 0.3440, 26.4659, 64.2658],     3.7118),
    ("Cs", 55, [20.3892, 19.1062, 10.6620, 1.4953],       [3.5690, 0.3107, 24.3879, 213.904],     3.3352),
    ("Ba", 56, [20.3361, 19.2970, 10.8880, 2.6959],       [3.2160, 0.2756, 20.2073, 167.202],     2.7731),
    ("La", 57, [20.5780, 19.5990, 11.3727, 3.2879],       [2.9480, 0.2440, 18.7726, 133.124],     2.1461),
    ("Ce", 58, [21.1671, 19.7695, 11.8513, 3.3303],       [2.8129, 0.2268, 17.6083, 127.113],     1.8623),
    ("Sm", 62, [24.0042, 19.4258, 13.4396, 2.89604],      [2.47274, 0.196451, 14.3996, 128.007],  2.20963),
    ("Eu", 63, [24.6274, 19.0886, 13.7603, 2.9227],       [2.3879, 0.1942, 13.7546, 123.174],     2.5745),
    ("Gd", 64, [25.0709, 19.0798, 13.8518, 3.54545],      [2.25341, 0.181951, 12.9331, 101.398],  2.4196),
    ("Tb", 65, [25.8976, 18.2185, 14.3167, 2.95354],      [2.24256, 0.196143, 12.6648, 115.362],  3.58324),
    ("Yb", 70, [28.6641, 15.4345, 15.3087, 2.98963],      [1.98890, 0.257119, 10.6647, 100.417],  7.56672),
    ("Lu", 71, [28.9476, 15.2208, 15.1000, 3.71601],      [1.90182, 9.98519, 0.261033, 84.3298],  7.97628),
    ("W",  74, [29.0818, 15.4300, 14.4327, 5.11982],      [1.72029, 9.22590, 0.321703, 57.0560],  9.88750),
    ("Os", 76, [28.1894, 16.1550, 14.9305, 5.67589],      [1.62903, 8.97948, 0.382661, 52.0861],  11.0005),
    ("Ir", 77, [27.3049, 16.7296, 15.6115, 5.83377],      [1.59279, 8.86553, 0.417916, 45.0011],  11.4722),
    ("Pt", 78, [27.0059, 17.7639, 15.7131, 5.78370],      [1.51293, 8.81174, 0.424593, 38.6103],  11.6883),
    ("Au", 79, [16.8819, 18.5913, 25.5582, 5.8600],       [0.4611, 8.6216, 1.4826, 36.3956],      12.0658),
    ("Hg", 80, [20.6809, 19.0417, 21.6575, 5.96760],      [0.54500, 8.44840, 1.57290, 38.3246],   12.6089),
    ("Tl", 81, [27.5446, 19.1584, 15.5380, 5.52593],      [0.65515, 8.70751, 1.96347, 45.8149],   13.1746),
    ("Pb", 82, [31.0617, 13.0637, 18.4420, 5.9696],       [0.6902, 2.3576, 8.6180, 47.2579],      13.4118),
    ("Bi", 83, [33.3689, 12.9510, 16.5877, 6.4692],       [0.7040, 2.9238, 8.7937, 48.0093],      13.5782),
    ("U",  92, [36.0228, 23.4128, 14.9491, 4.18800],      [0.52930, 3.32530, 16.0927, 100.613],   13.3966),
];

/// 查找内置 Cromer–Mann 参数及原子序数
#[cfg(test)]
fn cromer_mann(element: &str) -> Option<(u32, CromerMann)> {
    CROMER_MANN
        .iter()
        .find(|(symbol, ..)| *symbol == element)
        .map(|&(_, z, a, b, c)| (z, CromerMann { a, b, c }))
}

/// 规范化元素符号："FE" / "fe" -> "Fe"
pub fn normalize_element(symbol: &str) -> String {
    let mut chars = symbol.trim().chars().filter(|c| c.is_ascii_alphabetic());
    match chars.next() {
        Some(first) => {
            let mut s = first.to_ascii_uppercase().to_string();
            s.extend(chars.map(|c| c.to_ascii_lowercase()));
            s
        }
        None => String::new(),
    }
}

/// 散射表来源
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// 内置 Cromer–Mann 前向散射因子
    Builtin,
    /// Henke 表目录
    Henke(PathBuf),
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::Builtin => write!(f, "built-in Cromer-Mann f(0)"),
            TableSource::Henke(dir) => write!(f, "Henke tables in '{}'", dir.display()),
        }
    }
}

/// 按波长解析好的散射表（不可变）
#[derive(Debug, Clone)]
pub struct ScatteringTable {
    wavelength: f64,
    source: TableSource,
    entries: HashMap<String, ScatteringDescriptor>,
    /// 显式给定的元素（已排序）
    overrides: Vec<String>,
}

impl ScatteringTable {
    /// 内置表（与波长无关，仅记录波长）
    pub fn builtin(wavelength: f64) -> Self {
        let entries = CROMER_MANN
            .iter()
            .map(|&(symbol, _, a, b, c)| {
                let f0 = CromerMann { a, b, c }.forward();
                (symbol.to_string(), ScatteringDescriptor::real(f0))
            })
            .collect();

        Self {
            wavelength,
            source: TableSource::Builtin,
            entries,
            overrides: Vec::new(),
        }
    }

    /// 从 Henke 表目录构造，在 hc/λ 处插值
    pub fn from_henke_dir(dir: &Path, wavelength: f64) -> Result<Self> {
        if !dir.is_dir() {
            return Err(QdensError::ScatteringTableError {
                path: dir.display().to_string(),
                reason: "Not a directory".to_string(),
            });
        }

        let energy = photon_energy_ev(wavelength);
        let mut entries = HashMap::new();

        let files = WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("nff"))
            });

        for entry in files {
            let path = entry.path();
            let element = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(normalize_element)
                .unwrap_or_default();
            if element.is_empty() {
                continue;
            }

            let table = henke::parse_nff_file(path)?;
            let descriptor =
                table
                    .interpolate(energy)
                    .ok_or_else(|| QdensError::ScatteringTableError {
                        path: path.display().to_string(),
                        reason: format!(
                            "Photon energy {:.2} eV (λ = {} Å) outside tabulated range {:?}",
                            energy,
                            wavelength,
                            table.energy_range()
                        ),
                    })?;
            entries.insert(element, descriptor);
        }

        if entries.is_empty() {
            return Err(QdensError::ScatteringTableError {
                path: dir.display().to_string(),
                reason: "No .nff tables found".to_string(),
            });
        }

        Ok(Self {
            wavelength,
            source: TableSource::Henke(dir.to_path_buf()),
            entries,
            overrides: Vec::new(),
        })
    }

    /// 显式给定的描述符，覆盖或补充表中的元素
    pub fn with_overrides<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ScatteringDescriptor)>,
        S: AsRef<str>,
    {
        for (symbol, descriptor) in entries {
            let element = normalize_element(symbol.as_ref());
            if element.is_empty() {
                continue;
            }
            if !self.overrides.contains(&element) {
                self.overrides.push(element.clone());
            }
            self.entries.insert(element, descriptor);
        }
        self.overrides.sort();
        self
    }

    /// 查找元素的散射描述符（符号需已规范化）
    pub fn resolve(&self, element: &str) -> Option<ScatteringDescriptor> {
        self.entries.get(element).copied()
    }
}

impl fmt::Display for ScatteringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} elements at λ = {} Å",
            self.source,
            self.entries.len(),
            self.wavelength
        )?;
        if !self.overrides.is_empty() {
            write!(f, " (explicit: {})", self.overrides.join(", "))?;
        }
        Ok(())
    }
}
