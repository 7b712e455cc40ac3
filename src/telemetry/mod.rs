pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

// Factory helpers, one per CLI op
pub fn sync() -> LogCtx<ops::sync::SyncOp> {
    LogCtx::new(config::logs_are_json())
}

pub fn init() -> LogCtx<ops::init::InitOp> {
    LogCtx::new(config::logs_are_json())
}

pub fn shiur() -> LogCtx<ops::shiur::ShiurOp> {
    LogCtx::new(config::logs_are_json())
}

pub fn stats() -> LogCtx<ops::stats::StatsOp> {
    LogCtx::new(config::logs_are_json())
}

pub fn videos() -> LogCtx<ops::videos::VideosOp> {
    LogCtx::new(config::logs_are_json())
}
