//! Integration tests for the semantic cache store

use semcache::{CacheConfig, CacheStore, FingerprintConfig, VectorizerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

fn page_context(url: &str) -> Value {
    json!({
        "url": url,
        "title": "Search",
        "elements": [
            {"tag": "input", "text": "search", "autowingId": "aw-1", "boundingBox": {"x": 0, "y": 0}},
            {"tag": "button", "text": "submit", "autowingId": "aw-2", "boundingBox": {"x": 5, "y": 9}},
        ],
        "elementMarkers": {"m1": "#q"},
    })
}

// ============================================================================
// Semantic matching scenarios
// ============================================================================

#[test]
fn test_similar_prompt_ranking_scenario() {
    let dir = TempDir::new().unwrap();
    // Unigram features make the shared-token reasoning exact: "fill" and
    // "search" carry the near-matches over 0.7, while the button prompt
    // shares only "the"
    let config = CacheConfig::new(dir.path())
        .with_similarity_threshold(0.7)
        .with_vectorizer(VectorizerConfig::default().with_ngram_range(1, 1));
    let mut store = CacheStore::open(config).unwrap();
    let ctx = page_context("https://example.com");

    store.insert("fill the search box", &ctx, json!("box")).unwrap();
    store.insert("fill the search field", &ctx, json!("field")).unwrap();
    store.insert("click the submit button", &ctx, json!("button")).unwrap();

    let hit = store.lookup("fill in the search input", &ctx);
    assert!(hit.is_some(), "expected a semantic hit for the near-match");

    // Both near-matches tie; strictly-greater comparison keeps the first
    // inserted candidate
    assert_eq!(hit.unwrap(), json!("box"));
    assert_eq!(store.entries()[0].usage_count, 2);

    // The dissimilar candidate was never matched
    let button = store
        .entries()
        .iter()
        .find(|e| e.prompt == "click the submit button")
        .unwrap();
    assert_eq!(button.usage_count, 1);
    assert_eq!(button.similarity_score, 0.0);
}

#[test]
fn test_cjk_prompt_matching() {
    let dir = TempDir::new().unwrap();
    let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();
    let ctx = page_context("https://cn.bing.com");

    store
        .insert("搜索输入框输入playwright关键字", &ctx, json!("search-action"))
        .unwrap();
    store.insert("点击提交按钮", &ctx, json!("click-action")).unwrap();

    let hit = store.lookup("搜索输入框输入playwright", &ctx);
    assert_eq!(hit, Some(json!("search-action")));
}

#[test]
fn test_volatile_context_fields_do_not_break_hits() {
    let dir = TempDir::new().unwrap();
    let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();

    // Same page, but every volatile field differs between the two calls
    let ctx_first = page_context("https://example.com");
    let ctx_second = json!({
        "url": "https://example.com",
        "title": "Search",
        "elements": [
            {"tag": "input", "text": "search", "autowingId": "aw-77", "boundingBox": {"x": 3, "y": 1}},
            {"tag": "button", "text": "submit", "autowingId": "aw-78", "boundingBox": {"x": 8, "y": 2}},
        ],
        "elementMarkers": {"m9": "#other"},
    });

    store.insert("fill the search box", &ctx_first, json!("r")).unwrap();
    assert_eq!(store.lookup("fill the search box", &ctx_second), Some(json!("r")));
}

#[test]
fn test_structural_context_change_misses() {
    let dir = TempDir::new().unwrap();
    let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();

    store
        .insert("fill the search box", &page_context("https://example.com"), json!("r"))
        .unwrap();
    // A different URL is a different situation, same prompt or not
    assert_eq!(
        store.lookup("fill the search box", &page_context("https://example.org")),
        None
    );
}

// ============================================================================
// Durability
// ============================================================================

#[test]
fn test_reload_preserves_semantic_matching() {
    let dir = TempDir::new().unwrap();
    let ctx = page_context("https://example.com");
    {
        let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();
        store.insert("fill the search box", &ctx, json!("r")).unwrap();
    }

    // A fresh store re-reads the raw context from disk and re-derives the
    // fingerprint, so lookups keep working across processes
    let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();
    assert_eq!(store.lookup("fill the search box", &ctx), Some(json!("r")));
}

#[test]
fn test_independent_stores_do_not_interfere() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let ctx = page_context("https://example.com");

    let mut store_a = CacheStore::open(CacheConfig::new(dir_a.path())).unwrap();
    let mut store_b = CacheStore::open(CacheConfig::new(dir_b.path())).unwrap();

    store_a.insert("fill the search box", &ctx, json!("a")).unwrap();
    assert_eq!(store_b.lookup("fill the search box", &ctx), None);
    assert_eq!(store_a.lookup("fill the search box", &ctx), Some(json!("a")));
    assert!(store_b.is_empty());
}

#[test]
fn test_orphaned_records_reaped_on_next_open() {
    let dir = TempDir::new().unwrap();
    let ctx = page_context("https://example.com");
    {
        let mut store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();
        store.insert("fill the search box", &ctx, json!("r")).unwrap();
    }

    // Age the record on disk behind the store's back
    let path = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == "json"))
        .unwrap();
    let mut record: Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    record["timestamp"] = json!((chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339());
    std::fs::write(&path, serde_json::to_vec_pretty(&record).unwrap()).unwrap();

    // clear_expired scans memory, not the directory, so a store with no
    // in-memory mirror of the record leaves it alone; open reaps it
    let store = CacheStore::open(CacheConfig::new(dir.path())).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists());
}

// ============================================================================
// Configuration surface
// ============================================================================

#[test]
fn test_custom_fingerprint_config() {
    let dir = TempDir::new().unwrap();
    let config = CacheConfig::new(dir.path()).with_fingerprint(
        FingerprintConfig::default()
            .with_volatile_keys(vec!["requestId".to_string()])
            .with_elements_key("controls")
            .with_volatile_element_keys(vec!["renderId".to_string()]),
    );
    let mut store = CacheStore::open(config).unwrap();

    let ctx_a = json!({
        "screen": "settings",
        "requestId": "r-1",
        "controls": [{"kind": "toggle", "renderId": 4}],
    });
    let ctx_b = json!({
        "screen": "settings",
        "requestId": "r-2",
        "controls": [{"kind": "toggle", "renderId": 9}],
    });

    store.insert("enable dark mode", &ctx_a, json!("toggled")).unwrap();
    assert_eq!(store.lookup("enable dark mode", &ctx_b), Some(json!("toggled")));
}

#[test]
fn test_threshold_is_configurable() {
    let dir = TempDir::new().unwrap();
    // A near-exact threshold rejects prompts the default threshold accepts
    let config = CacheConfig::new(dir.path()).with_similarity_threshold(0.99);
    let mut store = CacheStore::open(config).unwrap();
    let ctx = page_context("https://example.com");

    store.insert("fill the search box", &ctx, json!("r")).unwrap();
    assert_eq!(store.lookup("fill the search field", &ctx), None);
    assert_eq!(store.lookup("fill the search box", &ctx), Some(json!("r")));
}
