use tracing::info_span;
use tracing::Span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct SyncOp;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Ping, FetchFeed, ParseFeed, Extract, WriteItems }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Ping => "ping",
        Phase::FetchFeed => "fetch_feed",
        Phase::ParseFeed => "parse_feed",
        Phase::Extract => "extract",
        Phase::WriteItems => "write_items",
    }}
    fn span(&self) -> Span { match self {
        Phase::Ping => info_span!("ping"),
        Phase::FetchFeed => info_span!("fetch_feed"),
        Phase::ParseFeed => info_span!("parse_feed"),
        Phase::Extract => info_span!("extract"),
        Phase::WriteItems => info_span!("write_items"),
    }}
}

impl OpMarker for SyncOp {
    const NAME: &'static str = "sync";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("sync") }
}
