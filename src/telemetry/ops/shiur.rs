use tracing::info_span;
use tracing::Span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct ShiurOp;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, List, Show, Add, Edit, Remove, Links }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Plan => "plan",
        Phase::List => "list",
        Phase::Show => "show",
        Phase::Add => "add",
        Phase::Edit => "edit",
        Phase::Remove => "remove",
        Phase::Links => "links",
    }}
    fn span(&self) -> Span { match self {
        Phase::Plan => info_span!("plan"),
        Phase::List => info_span!("list"),
        Phase::Show => info_span!("show"),
        Phase::Add => info_span!("add"),
        Phase::Edit => info_span!("edit"),
        Phase::Remove => info_span!("remove"),
        Phase::Links => info_span!("links"),
    }}
}

impl OpMarker for ShiurOp {
    const NAME: &'static str = "shiur";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("shiur") }
}
