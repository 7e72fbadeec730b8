use std::fs;
use std::path::{Path, PathBuf};

use anyhow::bail;
use checker_core::{dedupe, parse_playlist, CheckItem};
use engine_logging::{engine_debug, engine_info, engine_warn};

const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8", "txt"];

#[derive(Debug, Default)]
pub struct LoadedInputs {
    pub items: Vec<CheckItem>,
    pub files: usize,
    pub skipped_lines: usize,
    pub duplicates: usize,
}

/// Expand the given paths into playlist files.
///
/// Directories are scanned one level deep, sorted by name. Paths that do not
/// exist are logged and dropped.
pub fn discover_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            match scan_dir(path) {
                Ok(mut found) => {
                    if found.is_empty() {
                        engine_warn!("no playlists found in {}", path.display());
                    }
                    files.append(&mut found);
                }
                Err(err) => engine_warn!("cannot read directory {}: {}", path.display(), err),
            }
        } else {
            engine_warn!("input {} does not exist", path.display());
        }
    }
    files
}

fn scan_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_playlist(path))
        .collect();
    found.sort();
    Ok(found)
}

fn is_playlist(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PLAYLIST_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Read, parse and optionally deduplicate every playlist under `paths`.
///
/// Fails only when nothing checkable was found.
pub fn load_inputs(paths: &[PathBuf], dedupe_entries: bool) -> anyhow::Result<LoadedInputs> {
    let mut loaded = LoadedInputs::default();

    for file in discover_inputs(paths) {
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(err) => {
                engine_warn!("cannot read {}: {}", file.display(), err);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let parsed = parse_playlist(&text);
        for skipped in &parsed.skipped {
            engine_debug!(
                "{}:{}: skipped ({}): {}",
                file.display(),
                skipped.line_no,
                skipped.kind,
                skipped.content
            );
        }
        engine_info!(
            "{}: {} entries, {} lines skipped",
            file.display(),
            parsed.items.len(),
            parsed.skipped.len()
        );
        loaded.files += 1;
        loaded.skipped_lines += parsed.skipped.len();
        loaded.items.extend(parsed.items);
    }

    if dedupe_entries {
        let (items, removed) = dedupe(std::mem::take(&mut loaded.items));
        loaded.items = items;
        loaded.duplicates = removed;
        if removed > 0 {
            engine_info!("dropped {} duplicate entries", removed);
        }
    }

    if loaded.items.is_empty() {
        bail!("no playlist entries found in {} file(s)", loaded.files);
    }
    Ok(loaded)
}
