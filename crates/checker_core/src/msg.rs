#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Parsed and deduplicated entries are ready to be checked.
    ItemsLoaded(Vec<crate::CheckItem>),
    /// A worker recorded the verdict for one entry.
    ItemChecked {
        group: String,
        title: String,
        is_live: bool,
    },
    /// Periodic sample of the shared completed counter.
    ProgressSampled { completed: usize, total: usize },
    /// User pressed Ctrl-C (or the run deadline elapsed).
    InterruptRequested,
    /// Every worker has stopped.
    RunFinished { unchecked: usize },
    /// Render tick to coalesce terminal updates.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
