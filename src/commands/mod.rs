//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config/`, `density/`, `utils/`
//! - 子模块: make, qparams

pub mod make;
pub mod qparams;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Make(args) => make::execute(args),
        Commands::Qparams(args) => qparams::execute(args),
    }
}
