use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};

const MAX_STEM_LEN: usize = 80;
const EMPTY_STEM: &str = "ungrouped";

/// File-system safe stem for a group name.
pub fn group_stem(group: &str) -> String {
    let cleaned: String = group
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    let mut stem = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        stem.push(c);
    }
    if stem.is_empty() {
        stem = EMPTY_STEM.to_string();
    }
    truncate_on_char_boundary(&mut stem, MAX_STEM_LEN);
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

/// Map every group to a distinct stem.
///
/// Groups whose stems collide (case-insensitively, since several file
/// systems fold case) all get a short hash of the original name appended.
pub fn assign_stems<'a>(groups: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
    let groups: Vec<&str> = groups.into_iter().collect();
    let mut seen = HashSet::new();
    let mut colliding = HashSet::new();
    for group in &groups {
        let key = group_stem(group).to_lowercase();
        if !seen.insert(key.clone()) {
            colliding.insert(key);
        }
    }

    groups
        .into_iter()
        .map(|group| {
            let stem = group_stem(group);
            let stem = if colliding.contains(&stem.to_lowercase()) {
                format!("{stem}--{}", short_hash(group))
            } else {
                stem
            };
            (group.to_string(), stem)
        })
        .collect()
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
