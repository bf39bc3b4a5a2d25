//! # 统一错误处理模块
//!
//! 定义 qdens 的所有错误类型，使用 `thiserror` 派生。
//! 核心流水线的每一类失败都有独立的变体，便于 CLI 层精确报告。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qdens 统一错误类型
#[derive(Error, Debug)]
pub enum QdensError {
    // ─────────────────────────────────────────────────────────────
    // 核心流水线错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid detector geometry: {0}")]
    InvalidGeometryError(String),

    #[error("Failed to parse structure file: {path}\nReason: {reason}")]
    StructureParseError { path: String, reason: String },

    #[error("No scattering descriptor for element '{element}' (line {line})")]
    UnknownElementError { element: String, line: usize },

    #[error("Cannot build a density grid from an empty atom list")]
    EmptyStructureError,

    #[error("Invalid low-pass filter configuration: {0}")]
    FilterConfigError(String),

    // ─────────────────────────────────────────────────────────────
    // 散射因子表错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid scattering table: {path}\nReason: {reason}")]
    ScatteringTableError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // 配置错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid configuration file: {path}\nReason: {reason}")]
    ConfigError { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render plot: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QdensError>;
