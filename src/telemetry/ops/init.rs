use tracing::info_span;
use tracing::Span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct InitOp;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Open, Schema }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Open => "open", Phase::Schema => "schema" } }
    fn span(&self) -> Span { match self { Phase::Open => info_span!("open"), Phase::Schema => info_span!("schema") } }
}

impl OpMarker for InitOp {
    const NAME: &'static str = "init";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("init") }
}
