use std::path::{Path, PathBuf};

use checker_core::{ResultSnapshot, StoredEntry};
use engine_logging::engine_info;
use serde_json::json;

use crate::filename::assign_stems;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub live_suffix: String,
    pub dead_suffix: String,
    pub manifest_filename: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            live_suffix: "_live".to_string(),
            dead_suffix: "_dead".to_string(),
            manifest_filename: Some("summary.json".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFiles {
    pub group: String,
    pub live_path: PathBuf,
    pub dead_path: PathBuf,
    pub live: usize,
    pub dead: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub live: usize,
    pub dead: usize,
    pub groups: Vec<GroupFiles>,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Write one live and one dead playlist per group, plus the optional manifest.
pub fn export_results(
    output_dir: &Path,
    snapshot: &ResultSnapshot,
    options: &ExportOptions,
    checked_utc: &str,
) -> Result<ExportSummary, ExportError> {
    let writer = AtomicFileWriter::open(output_dir)?;
    let stems = assign_stems(snapshot.groups());

    let mut groups = Vec::with_capacity(stems.len());
    for (group, stem) in &stems {
        let live = snapshot.live.get(group).map(Vec::as_slice).unwrap_or_default();
        let dead = snapshot.dead.get(group).map(Vec::as_slice).unwrap_or_default();

        let live_path = writer.write(
            &format!("{stem}{}.m3u", options.live_suffix),
            &render_playlist(group, live),
        )?;
        let dead_path = writer.write(
            &format!("{stem}{}.m3u", options.dead_suffix),
            &render_playlist(group, dead),
        )?;
        engine_info!("{}: {} live, {} dead", group, live.len(), dead.len());

        groups.push(GroupFiles {
            group: group.clone(),
            live_path,
            dead_path,
            live: live.len(),
            dead: dead.len(),
        });
    }

    let manifest_path = match &options.manifest_filename {
        Some(name) => {
            let manifest = json!({
                "checked_utc": checked_utc,
                "live": snapshot.live_count(),
                "dead": snapshot.dead_count(),
                "groups": groups.iter().map(|g| {
                    json!({
                        "group": g.group,
                        "live": g.live,
                        "dead": g.dead,
                        "live_file": file_name(&g.live_path),
                        "dead_file": file_name(&g.dead_path),
                    })
                }).collect::<Vec<_>>()
            });
            let pretty = serde_json::to_string_pretty(&manifest)
                .unwrap_or_else(|_| manifest.to_string());
            Some(writer.write(name, &pretty)?)
        }
        None => None,
    };

    Ok(ExportSummary {
        live: snapshot.live_count(),
        dead: snapshot.dead_count(),
        groups,
        manifest_path,
    })
}

/// Extended M3U text for one group's entries.
pub fn render_playlist(group: &str, entries: &[StoredEntry]) -> String {
    let group = group.replace('"', "'");
    let mut out = String::from("#EXTM3U\n");
    for entry in entries {
        out.push_str(&format!(
            "#EXTINF:-1 group-title=\"{}\",{}\n{}\n",
            group, entry.title, entry.url
        ));
    }
    out
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
