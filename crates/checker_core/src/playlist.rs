//! Playlist parsing: extended M3U files and `title,url` text lists.
use std::collections::HashSet;

use crate::{CheckItem, FailureKind};

pub const DEFAULT_GROUP: &str = "Ungrouped";
pub const UNKNOWN_TITLE: &str = "Unknown channel";
pub const UNCATEGORIZED_GROUP: &str = "Uncategorized";

const STREAM_SCHEMES: &[&str] = &["http", "https", "rtmp", "rtsp", "p3p"];
const GENRE_MARKER: &str = "#genre#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    ExtendedM3u,
    TextList,
}

/// A line that looked like an entry but could not be turned into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_no: usize,
    pub content: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPlaylist {
    pub items: Vec<CheckItem>,
    pub skipped: Vec<SkippedLine>,
}

pub fn detect_format(text: &str) -> PlaylistFormat {
    let body = text.trim_start_matches('\u{feff}').trim_start();
    if body.starts_with("#EXTM3U") || body.contains("#EXTINF") {
        PlaylistFormat::ExtendedM3u
    } else {
        PlaylistFormat::TextList
    }
}

pub fn parse_playlist(text: &str) -> ParsedPlaylist {
    match detect_format(text) {
        PlaylistFormat::ExtendedM3u => parse_m3u(text),
        PlaylistFormat::TextList => parse_text_list(text),
    }
}

fn parse_m3u(text: &str) -> ParsedPlaylist {
    let mut parsed = ParsedPlaylist::default();
    let mut title = UNKNOWN_TITLE.to_string();
    let mut group = DEFAULT_GROUP.to_string();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        if line.is_empty() || line.starts_with("#EXTM3U") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            if let Some(value) = group_title(rest) {
                group = non_empty_or(value, DEFAULT_GROUP);
            }
            if let Some(name) = split_outside_quotes(rest) {
                let name = name.trim();
                if !name.is_empty() {
                    title = name.to_string();
                }
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("#EXTGRP:") {
            group = non_empty_or(rest, DEFAULT_GROUP);
            continue;
        }
        if let Some(value) = group_title(line) {
            group = non_empty_or(value, DEFAULT_GROUP);
        }
        if line.starts_with('#') {
            continue;
        }
        match stream_url(line) {
            Some(url) => {
                parsed.items.push(CheckItem::new(
                    std::mem::replace(&mut group, DEFAULT_GROUP.to_string()),
                    std::mem::replace(&mut title, UNKNOWN_TITLE.to_string()),
                    url,
                ));
            }
            None => parsed.skipped.push(SkippedLine {
                line_no: idx + 1,
                content: line.to_string(),
                kind: FailureKind::MalformedEntry,
            }),
        }
    }
    parsed
}

fn parse_text_list(text: &str) -> ParsedPlaylist {
    let mut parsed = ParsedPlaylist::default();
    let mut genre: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, marker)) = line.split_once(',') {
            if marker.trim().eq_ignore_ascii_case(GENRE_MARKER) {
                genre = Some(non_empty_or(name, UNCATEGORIZED_GROUP));
                continue;
            }
        }

        let (explicit_group, rest) = match bracketed_group(line) {
            Some((group, rest)) => (Some(group), rest),
            None => (None, line),
        };
        match split_title_url(rest) {
            Some((title, url)) => {
                let group = explicit_group
                    .or_else(|| genre.clone())
                    .unwrap_or_else(|| infer_group(&title));
                let title = non_empty_or(&title, UNKNOWN_TITLE);
                parsed.items.push(CheckItem::new(group, title, url));
            }
            None => parsed.skipped.push(SkippedLine {
                line_no: idx + 1,
                content: line.to_string(),
                kind: FailureKind::MalformedEntry,
            }),
        }
    }
    parsed
}

/// Derive a group from a channel title by keeping only its letters.
///
/// `"CCTV-1 HD"` becomes `"CCTVHD"`; a title without letters falls back to
/// [`UNCATEGORIZED_GROUP`].
pub fn infer_group(title: &str) -> String {
    let letters: String = title.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        UNCATEGORIZED_GROUP.to_string()
    } else {
        letters
    }
}

/// Drop repeated (group, url) pairs, keeping the first occurrence.
///
/// Returns the surviving items in their original order and the number removed.
pub fn dedupe(items: Vec<CheckItem>) -> (Vec<CheckItem>, usize) {
    let mut seen = HashSet::new();
    let before = items.len();
    let unique: Vec<CheckItem> = items
        .into_iter()
        .filter(|item| {
            seen.insert((
                infer_group(&item.group).to_lowercase(),
                item.url.to_lowercase(),
            ))
        })
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

fn stream_url(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    let parsed = url::Url::parse(candidate).ok()?;
    if STREAM_SCHEMES.contains(&parsed.scheme()) && parsed.has_host() {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn group_title(line: &str) -> Option<&str> {
    let start = line.find("group-title=\"")? + "group-title=\"".len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Text after the first comma that is not inside double quotes.
fn split_outside_quotes(line: &str) -> Option<&str> {
    let mut in_quotes = false;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(&line[idx + 1..]),
            _ => {}
        }
    }
    None
}

fn bracketed_group(line: &str) -> Option<(String, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let group = rest[..end].trim();
    if group.is_empty() {
        return None;
    }
    Some((group.to_string(), rest[end + 1..].trim_start()))
}

/// Split `title,url` at the first comma that is followed by a stream URL.
fn split_title_url(line: &str) -> Option<(String, String)> {
    line.match_indices(',').find_map(|(idx, _)| {
        let url = stream_url(&line[idx + 1..])?;
        Some((line[..idx].trim().to_string(), url))
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
