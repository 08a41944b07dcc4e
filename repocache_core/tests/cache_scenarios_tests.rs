//! End-to-end cache scenarios on a real temporary directory
//!
//! Every test uses an inline executor so scheduled work has completed by the
//! time the scheduling call returns.

use repocache_core::error::ValidationError;
use repocache_core::naming::{CONTENT_PREFIX, MARKER_PREFIX};
use repocache_core::{Error, MethodSignature, md5_hex};
use repocache_test_utils::TestCache;

fn marker_name(identity: &str, key: &str) -> String {
    format!("{MARKER_PREFIX}{}", md5_hex(&format!("{}{key}", md5_hex(identity))))
}

#[test]
fn test_simple_method_marker_on_disk() {
    let cache = TestCache::new();
    let mut registry = cache.registry("Test");
    registry.register(registry.declare("getBar")).unwrap();

    let proxy = registry.proxy("getBar", cache.dir()).unwrap();
    proxy.persist().unwrap();

    let files = cache.file_names();
    assert_eq!(files, vec![marker_name("Test_getBar", "")]);
    assert_eq!(
        files[0].strip_prefix(MARKER_PREFIX),
        Some(md5_hex(&md5_hex("Test_getBar")).as_str())
    );
}

#[test]
fn test_overload_identity_on_disk() {
    let cache = TestCache::new();
    let signature = MethodSignature::new("Test", "getFoo").with_param("java.lang.String");
    assert_eq!(signature.identity(), "Test_getFoo-java.lang.String");

    cache.engine().persist(&cache.handle_for(&signature)).unwrap();

    assert_eq!(
        cache.file_names(),
        vec![marker_name("Test_getFoo-java.lang.String", "")]
    );
}

#[test]
fn test_aliased_overloads_write_distinct_markers() {
    let cache = TestCache::new();
    let mut registry = cache.registry("Test");
    registry
        .register(registry.declare("getFoo").with_alias("getFooX"))
        .unwrap();
    registry
        .register(registry.declare("getFoo").with_param("java.lang.String"))
        .unwrap();

    registry.proxy("getFooX", cache.dir()).unwrap().persist().unwrap();
    registry.proxy("getFoo", cache.dir()).unwrap().persist().unwrap();

    let mut expected = vec![
        marker_name("Test_getFooX", ""),
        marker_name("Test_getFoo-java.lang.String", ""),
    ];
    expected.sort();
    assert_eq!(cache.file_names(), expected);
}

#[test]
fn test_ttl_expiry_evicts_entry() {
    let cache = TestCache::new();
    let handle = cache.handle(&md5_hex("Test_getBar"), 3_600_000);

    cache.engine().persist_content(&handle, "payload").unwrap();
    cache.backdate(&handle, 3_600_001 + 1_000);

    assert!(cache.engine().is_expired(&handle));
    cache.flush();

    assert!(!cache.engine().is_cached(&handle));
    assert_eq!(cache.engine().get_content(&handle), "");
    assert!(cache.file_names().is_empty());
    assert_eq!(cache.engine().stats().expirations_observed, 1);
}

#[test]
fn test_fresh_entry_within_ttl() {
    let cache = TestCache::new();
    let handle = cache.handle(&md5_hex("Test_getBar"), 3_600_000);

    cache.engine().persist(&handle).unwrap();
    cache.backdate(&handle, 60_000);

    assert!(!cache.engine().is_expired(&handle));
    assert!(cache.engine().is_cached(&handle));
}

#[test]
fn test_selection_keys_partition_entries() {
    let cache = TestCache::new();
    let mut registry = cache.registry("Test");
    registry
        .register(registry.declare("getById").with_param("int"))
        .unwrap();
    let mut proxy = registry.proxy("getById", cache.dir()).unwrap();

    proxy.select(1).persist().unwrap();
    proxy.select(2).persist().unwrap();
    assert_eq!(cache.file_names().len(), 2);

    proxy.select(1).evict().unwrap();

    assert_eq!(
        cache.file_names(),
        vec![marker_name("Test_getById-int", "2")]
    );
    assert!(!proxy.select(1).is_cached());
    assert!(proxy.select(2).is_cached());
}

#[test]
fn test_overload_without_alias_rejected() {
    let cache = TestCache::new();
    let mut registry = cache.registry("Test");
    registry.register(registry.declare("getFoo")).unwrap();

    let err = registry
        .register(registry.declare("getFoo").with_param("java.lang.String"))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::DuplicateMethod { .. })
    ));
    assert!(err.to_string().contains("alias"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_identity_rejected_with_alias_hint() {
    let cache = TestCache::new();
    let mut registry = cache.registry("Test");
    registry
        .register(registry.declare("getFoo").with_param("int"))
        .unwrap();

    let err = registry.register(registry.declare("getFoo-int")).unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::DuplicateIdentity { ref identity, .. })
            if identity == "Test_getFoo-int"
    ));
    assert!(err.to_string().contains("alias"));
    assert_eq!(registry.len(), 1);
    assert!(registry.signature("getFoo-int").is_none());
}

#[test]
fn test_content_file_layout() {
    let cache = TestCache::new();
    let handle = cache.handle(&md5_hex("Test_getBar"), 0).with_key("k");

    cache.engine().persist_content(&handle, "line one\nline two").unwrap();

    let effective = handle.file_name();
    assert_eq!(effective.len(), 32);
    let mut expected = vec![
        format!("{CONTENT_PREFIX}{effective}"),
        format!("{MARKER_PREFIX}{effective}"),
    ];
    expected.sort();
    assert_eq!(cache.file_names(), expected);
    assert_eq!(cache.engine().get_content(&handle), "line one\nline two");
}

#[test]
fn test_evict_all_clears_directory() {
    let cache = TestCache::new();
    for key in ["a", "b", "c"] {
        let handle = cache.handle(&md5_hex("Test_getBar"), 0).with_key(key);
        cache.engine().persist_content(&handle, key).unwrap();
    }
    std::fs::create_dir(cache.dir().join("nested")).unwrap();
    std::fs::write(cache.dir().join("nested").join("keep"), "x").unwrap();
    assert_eq!(cache.file_names().len(), 6);

    cache.engine().evict_all(cache.dir()).unwrap();

    assert!(cache.file_names().is_empty());
    assert!(cache.dir().join("nested").join("keep").exists());
}

#[test]
fn test_evict_all_missing_directory_is_noop() {
    let cache = TestCache::new();
    let missing = cache.dir().join("does-not-exist");

    cache.engine().evict_all(&missing).unwrap();

    assert_eq!(cache.engine().stats().io_failures, 0);
}
