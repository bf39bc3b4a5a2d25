//! # make 子命令 CLI 定义
//!
//! 读取实验配置，生成电子密度体数据和头文件。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/make.rs`

use clap::Args;
use std::path::PathBuf;

/// make 子命令参数
#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Experiment configuration file (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Base directory for relative paths in the configuration [default: config file directory]
    #[arg(long)]
    pub main_dir: Option<PathBuf>,

    /// Overwrite an existing output file without asking
    #[arg(short = 'y', long, default_value_t = false)]
    pub yes: bool,

    /// Print sampling tables and per-stage timings
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Worker threads for the low-pass filter (overrides num_threads)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Render the central density slice to this PNG file
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Preview image size in pixels
    #[arg(long, default_value_t = 800)]
    pub preview_size: u32,
}
