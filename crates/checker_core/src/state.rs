use std::collections::BTreeMap;

use crate::view_model::{GroupRowView, LastItemView, RunViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Finishing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupTally {
    pub live: usize,
    pub dead: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    session: SessionState,
    total: usize,
    checked: usize,
    sampled: usize,
    live: usize,
    dead: usize,
    unchecked: usize,
    interrupts: u32,
    groups: BTreeMap<String, GroupTally>,
    last_item: Option<LastItemView>,
    dirty: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn view(&self) -> RunViewModel {
        let completed = self.checked.max(self.sampled).min(self.total);
        let percent = if self.total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / self.total as f64
        };
        RunViewModel {
            session: self.session,
            total: self.total,
            completed,
            percent,
            live: self.live,
            dead: self.dead,
            unchecked: self.unchecked,
            groups: self
                .groups
                .iter()
                .map(|(name, tally)| GroupRowView {
                    name: name.clone(),
                    live: tally.live,
                    dead: tally.dead,
                })
                .collect(),
            last_item: self.last_item.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn start(&mut self, total: usize) {
        self.session = SessionState::Running;
        self.total = total;
        self.mark_dirty();
    }

    pub(crate) fn begin_finishing(&mut self) {
        self.session = SessionState::Finishing;
        self.mark_dirty();
    }

    /// Counts interrupts received while the run is active.
    pub(crate) fn note_interrupt(&mut self) -> u32 {
        self.interrupts += 1;
        self.interrupts
    }

    pub(crate) fn finish(&mut self, unchecked: usize) {
        self.session = SessionState::Finished;
        self.unchecked = unchecked;
        self.mark_dirty();
    }

    pub(crate) fn apply_checked(&mut self, group: String, title: String, is_live: bool) {
        let tally = self.groups.entry(group.clone()).or_default();
        if is_live {
            tally.live += 1;
            self.live += 1;
        } else {
            tally.dead += 1;
            self.dead += 1;
        }
        self.checked += 1;
        self.last_item = Some(LastItemView {
            group,
            title,
            is_live,
        });
        self.mark_dirty();
    }

    pub(crate) fn apply_sample(&mut self, completed: usize) {
        if completed > self.sampled {
            self.sampled = completed;
            self.mark_dirty();
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
