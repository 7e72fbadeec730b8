use std::fs;

use checker_core::{CheckItem, ResultStore, Verdict, VerdictReason};
use checker_engine::{
    assign_stems, ensure_output_dir, export_results, group_stem, AtomicFileWriter, ExportOptions,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn record(store: &ResultStore, group: &str, title: &str, url: &str, live: bool) {
    store.record(&Verdict {
        item: CheckItem::new(group, title, url),
        is_live: live,
        reason: VerdictReason::Inconclusive,
    });
}

#[test]
fn writes_live_and_dead_playlists_per_group() {
    let temp = TempDir::new().unwrap();
    let store = ResultStore::new();
    record(&store, "News", "BBC", "http://a/bbc.m3u8", true);
    record(&store, "News", "Old", "http://a/old.m3u8", false);
    record(&store, "Sports", "Ball", "http://a/ball.m3u8", true);

    let summary = export_results(
        temp.path(),
        &store.snapshot(),
        &ExportOptions::default(),
        "2026-01-01T00:00:00Z",
    )
    .unwrap();

    assert_eq!(summary.live, 2);
    assert_eq!(summary.dead, 1);
    assert_eq!(summary.groups.len(), 2);

    let news_live = fs::read_to_string(temp.path().join("News_live.m3u")).unwrap();
    assert_eq!(
        news_live,
        "#EXTM3U\n#EXTINF:-1 group-title=\"News\",BBC\nhttp://a/bbc.m3u8\n"
    );
    let news_dead = fs::read_to_string(temp.path().join("News_dead.m3u")).unwrap();
    assert!(news_dead.contains("http://a/old.m3u8"));

    // A group with no dead entries still gets a header-only file.
    let sports_dead = fs::read_to_string(temp.path().join("Sports_dead.m3u")).unwrap();
    assert_eq!(sports_dead, "#EXTM3U\n");
}

#[test]
fn manifest_lists_groups_and_totals() {
    let temp = TempDir::new().unwrap();
    let store = ResultStore::new();
    record(&store, "Kids", "Toon", "http://a/toon", false);

    let summary = export_results(
        temp.path(),
        &store.snapshot(),
        &ExportOptions::default(),
        "2026-01-01T00:00:00Z",
    )
    .unwrap();

    let path = summary.manifest_path.expect("manifest written");
    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(manifest["checked_utc"], "2026-01-01T00:00:00Z");
    assert_eq!(manifest["live"], 0);
    assert_eq!(manifest["dead"], 1);
    assert_eq!(manifest["groups"][0]["group"], "Kids");
    assert_eq!(manifest["groups"][0]["dead_file"], "Kids_dead.m3u");
}

#[test]
fn manifest_can_be_turned_off() {
    let temp = TempDir::new().unwrap();
    let options = ExportOptions {
        manifest_filename: None,
        ..ExportOptions::default()
    };
    let summary = export_results(temp.path(), &Default::default(), &options, "t").unwrap();
    assert_eq!(summary.manifest_path, None);
    assert!(summary.groups.is_empty());
    assert!(!temp.path().join("summary.json").exists());
}

#[test]
fn group_names_become_safe_stems() {
    assert_eq!(group_stem("News/UK: Live?"), "News_UK_ Live");
    assert_eq!(group_stem("..."), "ungrouped");
    assert_eq!(group_stem("con"), "con_");
    assert_eq!(group_stem(&"é".repeat(60)).len(), 80);
}

#[test]
fn colliding_stems_are_disambiguated() {
    let stems = assign_stems(["a/b", "a:b", "Plain"]);
    assert_eq!(stems["Plain"], "Plain");
    assert!(stems["a/b"].starts_with("a_b--"));
    assert!(stems["a:b"].starts_with("a_b--"));
    assert_ne!(stems["a/b"], stems["a:b"]);

    let stems = assign_stems(["News", "news"]);
    assert_ne!(stems["News"].to_lowercase(), stems["news"].to_lowercase());
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::open(temp.path()).unwrap();

    let first = writer.write("g_live.m3u", "#EXTM3U\n").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "#EXTM3U\n");

    let second = writer.write("g_live.m3u", "#EXTM3U\nx\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "#EXTM3U\nx\n");
}

#[test]
fn file_in_place_of_output_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(AtomicFileWriter::open(&file_path).is_err());
    let err = export_results(&file_path, &Default::default(), &ExportOptions::default(), "t");
    assert!(err.is_err());
}
