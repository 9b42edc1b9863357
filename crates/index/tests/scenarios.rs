//! End-to-end behaviour of ingest, purge, scan and verify against one store.

use rstest::rstest;
use std::io::Cursor;
use surrogate_index::{
    DEFAULT_MAX_LINE_LENGTH, Digest, Hasher, IngestOptions, IngestStats, Outcome, RecordReader, Side, Store,
    StoreOptions, ingest, purge, scan, verify,
};

const TWO_PAGES: &str = "http://a.com k1 k2\nhttp://b.com k2 k3\n";

fn load(store: &Store, input: &str, options: &IngestOptions) -> IngestStats {
    let reader = RecordReader::new(Cursor::new(input.as_bytes().to_vec()), DEFAULT_MAX_LINE_LENGTH);
    ingest(store, &Hasher::new(), reader, options, |_| {}).unwrap()
}

fn urls_of(store: &Store, key: &str) -> Vec<Digest> {
    let hasher = Hasher::new();
    let session = store.session().unwrap();
    let tables = session.tables().unwrap();
    tables.urls(&hasher.hash(key)).unwrap()
}

fn keys_of(store: &Store, url: &str) -> Vec<Digest> {
    let hasher = Hasher::new();
    let session = store.session().unwrap();
    let tables = session.tables().unwrap();
    tables.keys(&hasher.hash(url)).unwrap()
}

fn sorted(values: &[&str]) -> Vec<Digest> {
    let hasher = Hasher::new();
    let mut digests: Vec<Digest> = values.iter().map(|v| hasher.hash(v)).collect();
    digests.sort();
    digests
}

#[test]
fn test_ingest_builds_both_indexes() {
    let store = Store::open_in_memory().unwrap();
    let stats = load(&store, TWO_PAGES, &IngestOptions::default());
    assert_eq!(stats.records, 2);
    assert_eq!(stats.keys_added, 4);
    assert_eq!(stats.duplicates, 0);

    assert_eq!(urls_of(&store, "k1"), sorted(&["http://a.com"]));
    assert_eq!(urls_of(&store, "k2"), sorted(&["http://a.com", "http://b.com"]));
    assert_eq!(urls_of(&store, "k3"), sorted(&["http://b.com"]));
    assert_eq!(keys_of(&store, "http://a.com"), sorted(&["k1", "k2"]));
    assert_eq!(keys_of(&store, "http://b.com"), sorted(&["k2", "k3"]));
    assert!(verify(&store, 100).unwrap().is_consistent());
}

#[test]
fn test_purge_cascades_through_shared_urls() {
    let store = Store::open_in_memory().unwrap();
    load(&store, TWO_PAGES, &IngestOptions::default());

    let report = purge(&store, &Hasher::new().hash("k1")).unwrap();
    assert_eq!(report.images, 1);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.inconsistencies, 0);
    assert_eq!(report.urls[0].siblings, 2);

    assert!(urls_of(&store, "k1").is_empty());
    assert_eq!(urls_of(&store, "k2"), sorted(&["http://b.com"]));
    assert_eq!(urls_of(&store, "k3"), sorted(&["http://b.com"]));
    assert!(keys_of(&store, "http://a.com").is_empty());
    assert_eq!(keys_of(&store, "http://b.com"), sorted(&["k2", "k3"]));
    assert!(verify(&store, 100).unwrap().is_consistent());
}

#[test]
fn test_purge_of_widely_shared_key_empties_the_store() {
    let store = Store::open_in_memory().unwrap();
    load(&store, TWO_PAGES, &IngestOptions::default());

    let report = purge(&store, &Hasher::new().hash("k2")).unwrap();
    assert_eq!(report.images, 2);
    assert_eq!(report.deleted, 4);
    assert_eq!(scan(&store, Side::Forward).unwrap().count(), 0);
    assert_eq!(scan(&store, Side::Reverse).unwrap().count(), 0);
}

#[test]
fn test_ingesting_twice_is_idempotent() {
    let store = Store::open_in_memory().unwrap();
    load(&store, TWO_PAGES, &IngestOptions::default());
    let stats = load(&store, TWO_PAGES, &IngestOptions::default());
    assert_eq!(stats.keys_added, 0);
    assert_eq!(stats.duplicates, 4);

    let report = verify(&store, 100).unwrap();
    assert_eq!(report.forward_pairs, 4);
    assert_eq!(report.reverse_pairs, 4);
}

#[test]
fn test_fanout_cap_drops_extra_urls() {
    let store = Store::open_in_memory().unwrap();
    let hasher = Hasher::new();
    let session = store.session().unwrap();
    {
        let mut tables = session.tables().unwrap();
        let key = hasher.hash("k");
        assert_eq!(tables.add_association(&key, &hasher.hash("u1"), 1).unwrap(), Outcome::Added);
        assert_eq!(tables.add_association(&key, &hasher.hash("u2"), 1).unwrap(), Outcome::CapExceeded);
    }
    session.commit().unwrap();
    assert_eq!(urls_of(&store, "k"), sorted(&["u1"]));
    assert!(keys_of(&store, "u2").is_empty());
}

#[rstest]
#[case(1, 1)]
#[case(3, 3)]
#[case(10, 8)]
fn test_fanout_cap_holds_under_repeated_ingest(#[case] cap: u64, #[case] expected: u64) {
    let store = Store::open_in_memory().unwrap();
    let input: String = (0..8).map(|n| format!("http://{n}.com hot\n")).collect();
    let options = IngestOptions {
        fanout_cap: cap,
        ..IngestOptions::default()
    };
    for _ in 0..3 {
        load(&store, &input, &options);
    }
    assert_eq!(urls_of(&store, "hot").len() as u64, expected);
    assert!(verify(&store, cap).unwrap().is_consistent());
}

#[test]
fn test_rejected_lines_leave_the_rest_intact() {
    let store = Store::open_in_memory().unwrap();
    let long = format!("http://long.com {}", "k".repeat(DEFAULT_MAX_LINE_LENGTH));
    let input = format!("http://a.com k1\nhttp://lonely.com\n{long}\nhttp://b.com k2\n");
    let stats = load(&store, &input, &IngestOptions::default());
    assert_eq!(stats.records, 2);
    assert_eq!(stats.rejected, 2);
    assert_eq!(urls_of(&store, "k1"), sorted(&["http://a.com"]));
    assert_eq!(urls_of(&store, "k2"), sorted(&["http://b.com"]));
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("surrogate.redb");
    {
        let store = Store::open(&path, &StoreOptions::default()).unwrap();
        load(
            &store,
            TWO_PAGES,
            &IngestOptions {
                commit_interval: 1,
                ..IngestOptions::default()
            },
        );
    }
    {
        let store = Store::open(&path, &StoreOptions::default()).unwrap();
        assert_eq!(scan(&store, Side::Forward).unwrap().count(), 3);
        purge(&store, &Hasher::new().hash("k3")).unwrap();
    }
    let store = Store::open(&path, &StoreOptions::default()).unwrap();
    assert_eq!(urls_of(&store, "k2"), sorted(&["http://a.com"]));
    assert!(verify(&store, 100).unwrap().is_consistent());
}
