//! # 阶段计时
//!
//! 记录流水线各阶段及总耗时，`--verbose` 时输出。
//!
//! ## 依赖关系
//! - 被 `commands/make.rs` 使用
//! - 使用 `utils/output.rs` 输出

use crate::utils::output;

use std::time::{Duration, Instant};

/// 分段计时器
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    lap: Instant,
    verbose: bool,
}

impl Timer {
    pub fn new(verbose: bool) -> Self {
        let now = Instant::now();
        Timer {
            start: now,
            lap: now,
            verbose,
        }
    }

    /// 返回自上次分段以来的耗时并开始新分段
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.lap;
        self.lap = now;
        elapsed
    }

    /// 结束当前分段，verbose 时输出耗时
    pub fn reset_and_report(&mut self, label: &str) {
        let elapsed = self.lap();
        if self.verbose {
            output::print_timing(label, &format_duration(elapsed));
        }
    }

    /// verbose 时输出总耗时
    pub fn report_total(&self, label: &str) {
        if self.verbose {
            output::print_timing(label, &format_duration(self.start.elapsed()));
        }
    }
}

/// 人类可读的耗时
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("{}m {:.1}s", (secs / 60.0).floor() as u64, secs % 60.0)
    } else if secs >= 1.0 {
        format!("{:.2} s", secs)
    } else {
        format!("{:.1} ms", secs * 1e3)
    }
}
