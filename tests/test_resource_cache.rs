//! Encoding Resource Cache Tests
//!
//! Exercises the registry's four resource caches through a counting loader:
//! - Load once, then share the same handle on every hit
//! - Misses and load failures come back as absence and are never cached
//! - Least-recently-used eviction that skips entries still held by callers
//! - Concurrent first-time lookups converge on one retained entry

mod common;

use std::sync::{Arc, Barrier};

use common::{write_file, CountingLoader, MockFontService};
use pdf_registry::cache::ResourceCache;
use pdf_registry::{
    Error, RegistryConfig, ResourceKind, ResourceLoader, ResourceRegistry, Settings,
};

fn registry(capacity: usize) -> ResourceRegistry<CountingLoader> {
    let config = RegistryConfig::default()
        .with_cache_size(capacity)
        .with_settings(Settings::default().with_err_quiet(true));
    ResourceRegistry::with_service(
        CountingLoader::default(),
        config,
        MockFontService::new().with_helvetica(),
    )
}

fn loads(registry: &ResourceRegistry<CountingLoader>) -> usize {
    registry.loader().loads()
}

#[test]
fn test_cache_hit_does_not_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Adobe-Japan1", b"cid map");

    let loader = CountingLoader::default();
    let cache = ResourceCache::new(ResourceKind::CidToUnicode, 4);
    let key = "Adobe-Japan1".to_string();

    let first = cache
        .get_or_load(&key, |k| loader.load_cid_to_unicode(k, &path))
        .unwrap();
    for _ in 0..5 {
        let again = cache
            .get_or_load(&key, |_| panic!("loader must not run on a hit"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(loader.loads(), 1);
    assert_eq!(first.data, b"cid map");
}

#[test]
fn test_registry_lookups_share_handles() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(4);
    reg.add_cid_to_unicode("Adobe-GB1", write_file(dir.path(), "Adobe-GB1", b"gb1"));
    reg.add_unicode_map("Latin1", write_file(dir.path(), "Latin1", b"latin1"));

    let a = reg.get_cid_to_unicode("Adobe-GB1").unwrap();
    let b = reg.get_cid_to_unicode("Adobe-GB1").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let m1 = reg.text_encoding().unwrap();
    let m2 = reg.get_unicode_map("Latin1").unwrap();
    assert!(Arc::ptr_eq(&m1, &m2));
    assert_eq!(m1.data, b"latin1");

    assert_eq!(reg.cached_count(ResourceKind::CidToUnicode), 1);
    assert_eq!(reg.cached_count(ResourceKind::UnicodeMap), 1);
    assert_eq!(loads(&reg), 2);
}

#[test]
fn test_unknown_key_is_absent_and_not_cached() {
    let reg = registry(4);
    assert!(reg.get_cid_to_unicode("Adobe-Korea1").is_none());
    assert!(reg.get_unicode_map("KOI8-R").is_none());
    assert!(reg.get_cmap("Adobe-CNS1", "B5pc-H", None).is_none());
    assert_eq!(loads(&reg), 0);
    assert_eq!(reg.cached_count(ResourceKind::CidToUnicode), 0);
    assert_eq!(reg.cached_count(ResourceKind::UnicodeMap), 0);
    assert_eq!(reg.cached_count(ResourceKind::CMap), 0);
}

#[test]
fn test_load_failure_is_retried_later() {
    let dir = tempfile::tempdir().unwrap();
    // An empty file is a load failure, not a miss
    let path = write_file(dir.path(), "Adobe-Japan1", b"");
    let reg = registry(4);
    reg.add_cid_to_unicode("Adobe-Japan1", &path);

    assert!(reg.get_cid_to_unicode("Adobe-Japan1").is_none());
    assert_eq!(reg.cached_count(ResourceKind::CidToUnicode), 0);

    std::fs::write(&path, b"fixed").unwrap();
    let map = reg.get_cid_to_unicode("Adobe-Japan1").unwrap();
    assert_eq!(map.data, b"fixed");
}

#[test]
fn test_keys_are_case_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(4);
    reg.add_unicode_map("UTF-8", write_file(dir.path(), "UTF-8", b"utf8"));
    assert!(reg.get_unicode_map("UTF-8").is_some());
    assert!(reg.get_unicode_map("utf-8").is_none());
}

#[test]
fn test_least_recently_used_idle_entry_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(2);
    for name in ["A", "B", "C"] {
        reg.add_unicode_map(name, write_file(dir.path(), name, name.as_bytes()));
    }

    drop(reg.get_unicode_map("A"));
    drop(reg.get_unicode_map("B"));
    // Touch A so that B becomes the oldest
    drop(reg.get_unicode_map("A"));
    drop(reg.get_unicode_map("C"));

    assert_eq!(reg.cached_count(ResourceKind::UnicodeMap), 2);
    assert_eq!(loads(&reg), 3);

    drop(reg.get_unicode_map("A"));
    assert_eq!(loads(&reg), 3);
    drop(reg.get_unicode_map("B"));
    assert_eq!(loads(&reg), 4);
}

#[test]
fn test_held_entries_survive_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(1);
    for name in ["A", "B"] {
        reg.add_unicode_map(name, write_file(dir.path(), name, name.as_bytes()));
    }

    let held = reg.get_unicode_map("A").unwrap();
    let other = reg.get_unicode_map("B").unwrap();
    // Both are held, so the cache grows past capacity
    assert_eq!(reg.cached_count(ResourceKind::UnicodeMap), 2);

    let again = reg.get_unicode_map("A").unwrap();
    assert!(Arc::ptr_eq(&held, &again));
    assert_eq!(other.data, b"B");
    assert_eq!(loads(&reg), 2);
}

#[test]
fn test_handles_outlive_clear() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(4);
    reg.add_cid_to_unicode("Adobe-GB1", write_file(dir.path(), "Adobe-GB1", b"gb1"));

    let held = reg.get_cid_to_unicode("Adobe-GB1").unwrap();
    reg.clear_caches();
    assert_eq!(reg.cached_count(ResourceKind::CidToUnicode), 0);
    assert_eq!(held.data, b"gb1");

    let reloaded = reg.get_cid_to_unicode("Adobe-GB1").unwrap();
    assert!(!Arc::ptr_eq(&held, &reloaded));
    assert_eq!(*held, *reloaded);
}

#[test]
fn test_concurrent_first_lookups_converge() {
    const THREADS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let reg = registry(4);
    reg.add_cid_to_unicode("Adobe-Japan1", write_file(dir.path(), "Adobe-Japan1", b"japan"));

    let barrier = Barrier::new(THREADS);
    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    reg.get_cid_to_unicode("Adobe-Japan1")
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(reg.cached_count(ResourceKind::CidToUnicode), 1);
    let retained = reg.get_cid_to_unicode("Adobe-Japan1").unwrap();
    for handle in handles {
        let handle = handle.expect("every caller gets a handle");
        assert_eq!(handle.data, b"japan");
        assert!(Arc::ptr_eq(&handle, &retained));
    }
}

#[test]
fn test_cache_reports_misses_as_absence() {
    let cache: ResourceCache<String, Vec<u8>> = ResourceCache::new(ResourceKind::CMap, 4);
    let key = "Identity-H".to_string();
    let got = cache.get_or_load(&key, |k| {
        Err(Error::ResourceNotFound {
            kind: ResourceKind::CMap,
            name: k.clone(),
        })
    });
    assert!(got.is_none());
    assert!(!cache.contains(&key));
}
