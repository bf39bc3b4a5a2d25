//! # qparams 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/qparams.rs`

use clap::Args;
use std::path::PathBuf;

/// qparams 子命令参数
#[derive(Args, Debug)]
pub struct QparamsArgs {
    /// Experiment configuration file (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Print the parameters as TOML instead of a table
    #[arg(long, default_value_t = false)]
    pub toml: bool,
}
