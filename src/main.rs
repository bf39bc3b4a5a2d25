//! # qdens - 衍射模拟用电子密度体数据生成
//!
//! 由 PDB 结构和探测器几何生成低通滤波后的电子密度网格，
//! 作为相位恢复与衍射模拟的输入。
//!
//! ## 子命令
//! - `make`    - 运行完整流水线，输出体数据与头文件
//! - `qparams` - 计算探测器几何对应的倒空间采样参数
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── config/    (实验配置文件)
//!   │     ├── density/   (几何、加载、栅格化、滤波、导出)
//!   │     ├── parsers/   (PDB 与 Henke 表解析)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod cli;
mod commands;
mod config;
mod density;
mod error;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
