//! # make 命令实现
//!
//! 由实验配置生成低通滤波后的电子密度体数据。
//!
//! ## 功能
//! - 读取 TOML 实验配置，解析相对路径
//! - 运行密度流水线（几何 → 结构 → 栅格化 → 滤波），spinner 显示当前阶段
//! - 输出体数据和 TOML 头文件，可选 PNG 切片预览
//! - 输出文件已存在时需要确认（`--yes` 跳过确认）
//!
//! ## 依赖关系
//! - 使用 `cli/make.rs` 定义的参数
//! - 使用 `config/`, `density/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/timer.rs`

use crate::cli::make::MakeArgs;
use crate::commands::qparams::sampling_rows;
use crate::config::ExperimentConfig;
use crate::density::pipeline::{self, DensityProduct, Stage};
use crate::density::{export, plot};
use crate::error::{QdensError, Result};
use crate::utils::timer::Timer;
use crate::utils::{output, progress};

use console::Term;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct ElementRow {
    #[tabled(rename = "Element")]
    element: String,
    #[tabled(rename = "Atoms")]
    count: usize,
}

/// 执行 make 命令
pub fn execute(args: MakeArgs) -> Result<()> {
    output::print_header("Electron Density Synthesis");
    let mut timer = Timer::new(args.verbose);

    let config = ExperimentConfig::load(&args.config, args.main_dir.as_deref())?;
    output::print_info(&format!("Configuration: '{}'", config.source.display()));
    output::print_info(&format!("Structure: '{}'", config.structure.display()));

    if config.output.exists() && !args.yes && !confirm_overwrite(&config.output)? {
        output::print_skip(&format!(
            "Output exists, skipping: {}",
            config.output.display()
        ));
        return Ok(());
    }

    let job = config.to_job(args.threads);
    output::print_info(&format!(
        "Low-pass filter: damping {}, {} cycle(s), {} thread(s)",
        job.filter.damping, job.filter.cycles, job.threads
    ));
    timer.reset_and_report("Configuration");

    let spinner = progress::create_spinner(Stage::Geometry.label());
    let mut current: Option<Stage> = None;
    let result = pipeline::run(&job, |stage| {
        if let Some(prev) = current.replace(stage) {
            spinner.suspend(|| timer.reset_and_report(prev.label()));
        }
        spinner.set_message(stage.label());
    });
    spinner.finish_and_clear();

    let product = result?;
    if let Some(last) = current {
        timer.reset_and_report(last.label());
    }

    report_product(&product, args.verbose);

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| QdensError::FileWriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    export::write_density(&config.output, &product.grid, config.binary)?;
    let header = export::write_header(&config.output, &product.grid, config.binary)?;
    output::print_success(&format!(
        "Density written to '{}' (header '{}')",
        config.output.display(),
        header.display()
    ));

    if let Some(ref preview) = args.preview {
        plot::render_slice(&product.grid, preview, args.preview_size, args.preview_size)?;
        output::print_success(&format!("Slice preview saved to '{}'", preview.display()));
    }
    timer.reset_and_report("Output");

    output::print_separator();
    timer.report_total("Total");
    output::print_done(&format!(
        "{} atoms -> {} x {} x {} voxels",
        product.atom_count, product.grid.shape[0], product.grid.shape[1], product.grid.shape[2]
    ));

    Ok(())
}

/// 打印流水线结果摘要
fn report_product(product: &DensityProduct, verbose: bool) {
    output::print_success(&format!(
        "Loaded {} atoms ({})",
        product.atom_count,
        product.formula()
    ));
    output::print_info(&format!("Scattering factors: {}", product.scattering));

    let [nx, ny, nz] = product.grid.shape;
    output::print_info(&format!(
        "Grid {} x {} x {}, voxel {:.4} Å",
        nx, ny, nz, product.grid.spacing
    ));
    output::print_info(&format!(
        "Total density: raw {:.4}, filtered {:.4}, range [{:.4e}, {:.4e}]",
        product.raw_total,
        product.grid.total(),
        product.grid.min_value(),
        product.grid.max_value()
    ));

    if verbose {
        output::print_header("Reciprocal-Space Sampling");
        println!("{}", Table::new(sampling_rows(&product.geometry, &product.q_params)));

        let rows: Vec<ElementRow> = product
            .composition
            .iter()
            .map(|(el, n)| ElementRow {
                element: el.clone(),
                count: *n,
            })
            .collect();
        output::print_header("Composition");
        println!("{}", Table::new(&rows));
    }
}

/// 询问是否覆盖已有输出；无交互终端时视为拒绝
fn confirm_overwrite(path: &Path) -> Result<bool> {
    let mut term = Term::stdout();
    if !term.features().is_attended() {
        output::print_warning("Output exists and no terminal is attached; pass --yes to overwrite");
        return Ok(false);
    }

    let stdin = io::stdin();
    ask_overwrite(&mut stdin.lock(), &mut term, path)
}

/// 写出提示并读取一行回答，"y" / "yes" 视为同意
fn ask_overwrite<R: BufRead, W: Write>(
    input: &mut R,
    prompt: &mut W,
    path: &Path,
) -> Result<bool> {
    write!(prompt, "Output '{}' already exists. Overwrite? [y/N] ", path.display())
        .and_then(|_| prompt.flush())
        .map_err(|e| QdensError::FileWriteError {
            path: "<stdout>".to_string(),
            source: e,
        })?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(|e| QdensError::FileReadError {
        path: "<stdin>".to_string(),
        source: e,
    })?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
