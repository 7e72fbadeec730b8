use crate::SessionState;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunViewModel {
    pub session: SessionState,
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
    pub live: usize,
    pub dead: usize,
    pub unchecked: usize,
    pub groups: Vec<GroupRowView>,
    pub last_item: Option<LastItemView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRowView {
    pub name: String,
    pub live: usize,
    pub dead: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastItemView {
    pub group: String,
    pub title: String,
    pub is_live: bool,
}
