//! # 工具函数模块
//!
//! 提供美化输出、进度指示和阶段计时工具。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: output, progress, timer

pub mod output;
pub mod progress;
pub mod timer;
