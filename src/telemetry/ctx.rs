use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{error, info, warn, Span};

use super::emit;

/// One phase of an op; named for spans and structured log lines.
pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

/// Marker type per CLI op, tying the op name to its phase set.
pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

enum Level {
    Info,
    Warn,
    Error,
}

/// Typed logging context for one op run. Plain mode passes messages
/// through untouched; when logs are structured every event also
/// carries the op name and a flat `k=v` details string.
pub struct LogCtx<O: OpMarker> {
    json: bool,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub(super) fn new(json: bool) -> Self {
        Self { json, _marker: PhantomData }
    }

    pub fn root_span(&self) -> Span {
        O::root_span()
    }

    pub fn root_span_kv<'a>(&self, fields: impl IntoIterator<Item = (&'a str, String)>) -> Span {
        if self.json {
            if let Some(details) = join_kv(fields) {
                info!(op = O::NAME, details = %details, "start");
            }
        }
        self.root_span()
    }

    pub fn span(&self, phase: &O::Phase) -> Span {
        phase.span()
    }

    pub fn span_kv<'a>(
        &self,
        phase: &O::Phase,
        fields: impl IntoIterator<Item = (&'a str, String)>,
    ) -> Span {
        if self.json {
            if let Some(details) = join_kv(fields) {
                info!(op = O::NAME, phase = phase.name(), details = %details, "span_start");
            }
        }
        phase.span()
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, msg.as_ref(), None);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Level::Warn, msg.as_ref(), None);
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Level::Error, msg.as_ref(), None);
    }

    pub fn info_kv<'a>(&self, msg: &str, kv: impl IntoIterator<Item = (&'a str, String)>) {
        self.emit(Level::Info, msg, join_kv(kv));
    }

    pub fn warn_kv<'a>(&self, msg: &str, kv: impl IntoIterator<Item = (&'a str, String)>) {
        self.emit(Level::Warn, msg, join_kv(kv));
    }

    pub fn error_kv<'a>(&self, msg: &str, kv: impl IntoIterator<Item = (&'a str, String)>) {
        self.emit(Level::Error, msg, join_kv(kv));
    }

    fn emit(&self, level: Level, msg: &str, details: Option<String>) {
        match level {
            Level::Info => match (self.json, details) {
                (true, Some(d)) => info!(op = O::NAME, details = %d, "{msg}"),
                (true, None) => info!(op = O::NAME, "{msg}"),
                (false, _) => info!("{msg}"),
            },
            Level::Warn => match (self.json, details) {
                (true, Some(d)) => warn!(op = O::NAME, details = %d, "{msg}"),
                (true, None) => warn!(op = O::NAME, "{msg}"),
                (false, _) => warn!("{msg}"),
            },
            Level::Error => match (self.json, details) {
                (true, Some(d)) => error!(op = O::NAME, details = %d, "{msg}"),
                (true, None) => error!(op = O::NAME, "{msg}"),
                (false, _) => error!("{msg}"),
            },
        }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> {
        emit::print_plan(O::NAME, plan, None)
    }

    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> {
        emit::print_result(O::NAME, result, None)
    }

    pub fn result_timed<T: Serialize>(&self, result: &T, duration_ms: u128) -> Result<()> {
        emit::print_result(O::NAME, result, Some(emit::Meta { duration_ms: Some(duration_ms) }))
    }
}

// Helpers only the sync op needs
impl LogCtx<crate::telemetry::ops::sync::SyncOp> {
    pub fn totals(&self, created: usize, updated: usize, errors: usize) {
        if self.json {
            info!(op = crate::telemetry::ops::sync::SyncOp::NAME, created, updated, errors, "sync_totals");
        } else {
            info!("📊 Sync totals — created={created} updated={updated} errors={errors}");
        }
    }
}

fn join_kv<'a>(kv: impl IntoIterator<Item = (&'a str, String)>) -> Option<String> {
    let joined = kv
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}
