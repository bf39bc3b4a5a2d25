//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `make`: 由实验配置生成电子密度体数据
//! - `qparams`: 仅计算并显示倒空间采样参数
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: make, qparams

pub mod make;
pub mod qparams;

use clap::{Parser, Subcommand};

/// qdens - 由 PDB 结构生成电子密度体数据
#[derive(Parser)]
#[command(name = "qdens")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Electron-density volume synthesis for diffraction simulation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Build a low-pass filtered electron-density volume from a PDB structure
    Make(make::MakeArgs),

    /// Show the reciprocal-space sampling implied by the detector geometry
    Qparams(qparams::QparamsArgs),
}
