use tracing::info_span;
use tracing::Span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct VideosOp;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Channel, PlaylistItems, Details, Playlists }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Channel => "channel",
        Phase::PlaylistItems => "playlist_items",
        Phase::Details => "details",
        Phase::Playlists => "playlists",
    }}
    fn span(&self) -> Span { match self {
        Phase::Channel => info_span!("channel"),
        Phase::PlaylistItems => info_span!("playlist_items"),
        Phase::Details => info_span!("details"),
        Phase::Playlists => info_span!("playlists"),
    }}
}

impl OpMarker for VideosOp {
    const NAME: &'static str = "videos";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("videos") }
}
