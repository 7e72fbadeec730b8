use crate::CheckItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartRun { items: Vec<CheckItem> },
    StopIntake { policy: StopPolicy },
    WriteResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop claiming new items; in-flight checks run to completion.
    Finish,
    /// Abandon in-flight checks as well.
    Immediate,
}
