//! KeyStore Tests
//!
//! Tests verify:
//! - Basic get/put/remove
//! - Overwrite and removal semantics
//! - Iteration and clearing

use bytes::Bytes;
use emberkv::keystore::KeyStore;

#[test]
fn test_new_store_is_empty() {
    let store = KeyStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[test]
fn test_put_and_get() {
    let mut store = KeyStore::new();
    store.put("key1", Bytes::from_static(b"value1"));

    assert_eq!(store.get("key1"), Some(&Bytes::from_static(b"value1")));
    assert!(store.contains_key("key1"));
}

#[test]
fn test_get_nonexistent_key_does_not_create_it() {
    let store = KeyStore::new();

    assert_eq!(store.get("missing"), None);
    assert!(store.is_empty());
}

#[test]
fn test_put_overwrites_and_returns_previous() {
    let mut store = KeyStore::new();

    assert_eq!(store.put("k", "v1"), None);
    assert_eq!(store.put("k", "v2"), Some(Bytes::from_static(b"v1")));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("k"), Some(&Bytes::from_static(b"v2")));
}

#[test]
fn test_remove() {
    let mut store = KeyStore::new();
    store.put("k", "v");

    assert_eq!(store.remove("k"), Some(Bytes::from_static(b"v")));
    assert_eq!(store.get("k"), None);
    assert!(store.is_empty());
}

#[test]
fn test_remove_absent_key_is_noop() {
    let mut store = KeyStore::new();
    store.put("a", "1");

    assert_eq!(store.remove("missing"), None);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_empty_value_is_distinct_from_absence() {
    let mut store = KeyStore::new();
    store.put("empty", Bytes::new());

    assert_eq!(store.get("empty"), Some(&Bytes::new()));
    assert!(store.contains_key("empty"));
}

#[test]
fn test_iter_and_keys() {
    let mut store = KeyStore::new();
    for i in 0..5 {
        store.put(format!("key{}", i), format!("value{}", i));
    }

    let mut keys: Vec<&str> = store.keys().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["key0", "key1", "key2", "key3", "key4"]);

    for (key, value) in store.iter() {
        assert_eq!(&value[..], key.replace("key", "value").as_bytes());
    }
}

#[test]
fn test_clear() {
    let mut store = KeyStore::new();
    store.put("a", "1");
    store.put("b", "2");

    store.clear();
    assert!(store.is_empty());
}

#[test]
fn test_from_iterator_and_equality() {
    let built: KeyStore = vec![
        ("a".to_string(), Bytes::from_static(b"1")),
        ("b".to_string(), Bytes::from_static(b"2")),
    ]
    .into_iter()
    .collect();

    let mut manual = KeyStore::new();
    manual.put("b", "2");
    manual.put("a", "1");

    assert_eq!(built, manual);
}
