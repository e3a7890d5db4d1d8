//! Integration tests for the signal cache.
//!
//! A collect pass lands in SQLite; re-fetches, platform filters and
//! pruning behave over real files.

use chrono::{DateTime, Duration, TimeZone, Utc};
use upkeep_core::storage::SignalRepository;
use upkeep_core::{Database, Platform, Signal, SignalKind};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn signal(platform: Platform, source_id: &str, hours_ago: i64) -> Signal {
    let mut metadata = serde_json::Map::new();
    metadata.insert("origin".into(), "integration-test".into());
    Signal {
        platform,
        kind: match platform {
            Platform::Twitch => SignalKind::Stream,
            Platform::Youtube => SignalKind::Video,
            _ => SignalKind::Commit,
        },
        source_id: source_id.to_string(),
        title: format!("{source_id} title"),
        description: Some("something happened".to_string()),
        url: Some(format!("https://example.test/{source_id}")),
        thumbnail_url: None,
        is_live: platform == Platform::Twitch,
        published_at: now() - Duration::hours(hours_ago),
        metadata,
    }
}

#[test]
fn test_collect_pass_persists_and_reloads_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    let batch = vec![
        signal(Platform::Github, "gh-1", 48),
        signal(Platform::Youtube, "yt-1", 2),
        signal(Platform::Twitch, "tw-1", 12),
    ];
    assert_eq!(db.signals().upsert_all(&batch).unwrap(), 3);

    let recent = db.signals().recent(10).unwrap();
    let ids: Vec<_> = recent.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(ids, ["yt-1", "tw-1", "gh-1"]);
    assert_eq!(recent[0].kind, SignalKind::Video);
    assert!(recent[1].is_live);
    assert_eq!(recent[2].metadata["origin"], "integration-test");
}

#[test]
fn test_refetch_updates_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    db.signals()
        .upsert_all(&[signal(Platform::Github, "gh-1", 48)])
        .unwrap();

    // Same remote event fetched again later, with a fresher title.
    let mut refreshed = signal(Platform::Github, "gh-1", 1);
    refreshed.title = "amended commit".to_string();
    db.signals().upsert_all(&[refreshed]).unwrap();

    let rows = db.signals().recent(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "amended commit");
}

#[test]
fn test_platform_filter_and_prune() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    db.signals()
        .upsert_all(&[
            signal(Platform::Github, "gh-old", 24 * 45),
            signal(Platform::Github, "gh-new", 3),
            signal(Platform::Twitch, "tw-1", 6),
        ])
        .unwrap();

    let github_only = db.signals().by_platform(Platform::Github, 10).unwrap();
    assert_eq!(github_only.len(), 2);
    assert!(github_only.iter().all(|s| s.platform == Platform::Github));

    // Pruning at 30 days drops only the stale row.
    let removed = db
        .signals()
        .prune_older_than(now() - Duration::days(30))
        .unwrap();
    assert_eq!(removed, 1);
    let ids: Vec<_> = db
        .signals()
        .recent(10)
        .unwrap()
        .into_iter()
        .map(|s| s.source_id)
        .collect();
    assert_eq!(ids, ["gh-new", "tw-1"]);
}

#[test]
fn test_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upkeep.db");

    {
        let db = Database::open_at(&path).unwrap();
        db.signals()
            .upsert_all(&[signal(Platform::Youtube, "yt-1", 2)])
            .unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let rows = db.signals().recent(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_id, "yt-1");
    assert_eq!(rows[0].published_at, now() - Duration::hours(2));
}
