use std::sync::Arc;
use std::thread;

use checker_core::{CheckItem, ResultStore, StoredEntry, Verdict, VerdictReason};

fn verdict(group: &str, n: usize, is_live: bool) -> Verdict {
    Verdict {
        item: CheckItem::new(
            group,
            format!("title-{n}"),
            format!("https://example.com/{n}.m3u8"),
        ),
        is_live,
        reason: VerdictReason::Inconclusive,
    }
}

#[test]
fn verdicts_land_in_exactly_one_mapping() {
    let store = ResultStore::new();
    store.record(&verdict("News", 1, true));
    store.record(&verdict("News", 2, false));
    store.record(&verdict("Kids", 3, false));

    let snapshot = store.snapshot();
    assert_eq!(store.completed(), 3);
    assert_eq!(snapshot.live_count(), 1);
    assert_eq!(snapshot.dead_count(), 2);
    assert_eq!(
        snapshot.live["News"],
        vec![StoredEntry {
            title: "title-1".to_string(),
            url: "https://example.com/1.m3u8".to_string(),
        }]
    );
    assert_eq!(snapshot.groups(), vec!["Kids", "News"]);
}

#[test]
fn concurrent_recording_loses_nothing() {
    let store = Arc::new(ResultStore::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for n in 0..250 {
                    store.record(&verdict(&format!("g{}", t % 3), t * 1000 + n, n % 2 == 0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = store.snapshot();
    assert_eq!(store.completed(), 2000);
    assert_eq!(snapshot.total(), 2000);
    assert_eq!(snapshot.live_count(), 1000);

    let mut urls: Vec<_> = snapshot
        .live
        .values()
        .chain(snapshot.dead.values())
        .flatten()
        .map(|entry| entry.url.clone())
        .collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 2000);
}
