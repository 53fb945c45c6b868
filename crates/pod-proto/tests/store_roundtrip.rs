use pod_proto::{CatalogEntry, PlaybackHistory, SubscriptionStore};

#[test]
fn subscriptions_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("subscriptions.json");

    let mut store = SubscriptionStore::load(path.clone());
    assert!(store.is_empty());
    let show = CatalogEntry::show("Hardcore History", "Dan Carlin")
        .with_catalog_id("173001861")
        .with_feed_url("https://feeds.example.com/dchh");
    assert!(store.add(show));
    assert!(store.add(CatalogEntry::custom_feed("https://example.org/rss")));
    assert!(store.set_latest_date("Hardcore History", "2024-05-01 10:00"));
    store.save().unwrap();

    let reloaded = SubscriptionStore::load(path);
    assert_eq!(reloaded.entries(), store.entries());
    // The custom feed was stamped with today's date on subscribe.
    let sorted = reloaded.sorted_by_latest();
    assert_eq!(sorted[0].name, "https://example.org/rss");
    assert_eq!(sorted[1].latest_date.as_deref(), Some("2024-05-01 10:00"));
}

#[test]
fn unsubscribing_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subscriptions.json");
    let show = CatalogEntry::show("Show", "Pub");

    let mut store = SubscriptionStore::load(path.clone());
    assert!(store.toggle(&show));
    store.save().unwrap();
    assert!(!store.toggle(&show));
    store.save().unwrap();

    assert!(SubscriptionStore::load(path).is_empty());
}

#[test]
fn corrupt_files_load_empty() {
    let dir = tempfile::tempdir().unwrap();
    let subs = dir.path().join("subscriptions.json");
    let history = dir.path().join("history.json");
    std::fs::write(&subs, "{ not json").unwrap();
    std::fs::write(&history, "[1, 2, 3]").unwrap();

    assert!(SubscriptionStore::load(subs).is_empty());
    assert!(PlaybackHistory::load(history).is_empty());

    let backup = std::fs::read_to_string(dir.path().join("subscriptions.json.bak")).unwrap();
    assert_eq!(backup, "{ not json");
    let backup = std::fs::read_to_string(dir.path().join("history.json.bak")).unwrap();
    assert_eq!(backup, "[1, 2, 3]");
}

#[test]
fn bad_records_are_skipped_without_losing_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subscriptions.json");
    std::fs::write(
        &path,
        r#"[
            {"name": "Good", "artist": "A", "feed_url": "https://good/rss"},
            {"name": "No Artist", "artist": null, "description": null},
            {"name": 5, "artist": "broken"}
        ]"#,
    )
    .unwrap();

    let mut store = SubscriptionStore::load(path.clone());
    let names: Vec<_> = store.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Good", "No Artist"]);
    assert_eq!(store.entries()[1].publisher, "");

    assert!(store.add(CatalogEntry::show("New", "N")));
    store.save().unwrap();

    let reloaded = SubscriptionStore::load(path);
    let names: Vec<_> = reloaded.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Good", "No Artist", "New"]);
    assert_eq!(reloaded.entries()[0].feed_url.as_deref(), Some("https://good/rss"));
}

#[test]
fn history_round_trip_drops_invalid_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(
        &path,
        r#"{"https://cdn/a.mp3": 125.5, "https://cdn/b.mp3": -3.0}"#,
    )
    .unwrap();

    let mut history = PlaybackHistory::load(path.clone());
    assert_eq!(history.len(), 1);
    assert_eq!(history.position_for("https://cdn/a.mp3"), 125.5);
    assert_eq!(history.position_for("https://cdn/b.mp3"), 0.0);

    assert!(history.record("https://cdn/c.mp3", 42.0));
    assert!(!history.record("https://cdn/c.mp3", f64::NAN));
    history.save().unwrap();

    let reloaded = PlaybackHistory::load(path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.position_for("https://cdn/c.mp3"), 42.0);
}
