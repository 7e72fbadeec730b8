//! Checker core: domain model, verdict policy and the pure run-session state machine.
mod effect;
mod escalation;
mod model;
mod msg;
pub mod playlist;
pub mod policy;
mod state;
mod store;
mod update;
mod view_model;

pub use effect::{Effect, StopPolicy};
pub use escalation::EscalationRules;
pub use model::{
    CheckItem, ErrorClass, FailureKind, ManifestSignal, MediaProbeResult, ProbeResult, Verdict,
    VerdictReason,
};
pub use msg::Msg;
pub use playlist::{dedupe, parse_playlist, ParsedPlaylist, PlaylistFormat, SkippedLine};
pub use policy::{decide, requires_media_probe, Decision, PolicyInput};
pub use state::{GroupTally, RunState, SessionState};
pub use store::{GroupedEntries, ResultSnapshot, ResultStore, StoredEntry};
pub use update::update;
pub use view_model::{GroupRowView, LastItemView, RunViewModel};
