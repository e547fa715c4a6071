//! End-to-end lookup resolution over the in-memory adapters.

use std::sync::Arc;

use backend::domain::{
    AnalyticsService, AnalyticsWindow, ErrorCode, LookupOptions, LookupService, SearchQueryType,
    hash_ip, parse_size_components,
};
use backend::test_support::{InMemoryCatalogRepository, InMemoryLookupCache, RecordingSearchLog};

struct Env {
    catalog: Arc<InMemoryCatalogRepository>,
    cache: Arc<InMemoryLookupCache>,
    search_log: Arc<RecordingSearchLog>,
    lookups: LookupService<InMemoryCatalogRepository, InMemoryLookupCache, RecordingSearchLog>,
}

fn seeded_env() -> Env {
    let catalog = Arc::new(InMemoryCatalogRepository::new());
    let components = parse_size_components("205/55R16").expect("valid seed size");
    catalog.seed_mapping("100", &components, &[(91, "V")]);

    let cache = Arc::new(InMemoryLookupCache::new());
    let search_log = Arc::new(RecordingSearchLog::new());
    let lookups = LookupService::new(
        Arc::clone(&catalog),
        Arc::clone(&cache),
        Arc::clone(&search_log),
    );
    Env {
        catalog,
        cache,
        search_log,
        lookups,
    }
}

/// Let detached search-log writes run to completion on the current-thread
/// runtime.
async fn drain_detached_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn variant_options(load_index: i32, speed_index: &str) -> LookupOptions {
    LookupOptions {
        load_index: Some(load_index),
        speed_index: Some(speed_index.to_owned()),
        client_ip: None,
    }
}

#[tokio::test]
async fn seeded_mapping_resolves_deterministically() {
    let env = seeded_env();

    let response = env
        .lookups
        .find_by_code("100", variant_options(91, "V"))
        .await
        .expect("seeded lookup resolves");

    assert_eq!(response.code, "100");
    assert_eq!(response.size_normalized, "205/55R16");
    assert_eq!(response.size_raw, "205/55R16");
    let variant = response.variant.expect("variant matched");
    assert_eq!(variant.load_index, Some(91));
    assert_eq!(variant.speed_index.as_deref(), Some("V"));
    assert_eq!(response.warning, None);
}

#[tokio::test]
async fn variant_mismatch_returns_warning_not_error() {
    let env = seeded_env();

    let response = env
        .lookups
        .find_by_code("100", variant_options(99, "Z"))
        .await
        .expect("base mapping still resolves");

    assert_eq!(response.variant, None);
    assert_eq!(response.warning.as_deref(), Some("variant_not_found"));
}

#[tokio::test]
async fn inline_size_variant_equals_explicit_params() {
    let inline_env = seeded_env();
    let explicit_env = seeded_env();

    let inline = inline_env
        .lookups
        .find_by_size("205/55R16 91V", LookupOptions::default())
        .await
        .expect("inline token resolves");
    let explicit = explicit_env
        .lookups
        .find_by_size("205/55R16", variant_options(91, "V"))
        .await
        .expect("explicit params resolve");

    assert_eq!(inline, explicit);
}

#[tokio::test]
async fn partial_explicit_variant_is_rejected() {
    let env = seeded_env();

    let error = env
        .lookups
        .find_by_code(
            "100",
            LookupOptions {
                load_index: Some(91),
                ..LookupOptions::default()
            },
        )
        .await
        .expect_err("half pair rejected");

    assert_eq!(error.code(), ErrorCode::IncompleteVariantParams);
}

#[tokio::test]
async fn not_found_lookups_never_populate_the_cache() {
    let env = seeded_env();

    for _ in 0..2 {
        let error = env
            .lookups
            .find_by_code("999", LookupOptions::default())
            .await
            .expect_err("unknown code");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
    drain_detached_tasks().await;

    assert!(env.cache.is_empty(), "failed lookups must not be cached");
    let records = env.search_log.records();
    assert_eq!(records.len(), 2, "both misses hit the store and were logged");
    assert!(records.iter().all(|record| !record.result_found));
}

#[tokio::test]
async fn cache_hits_are_not_relogged() {
    let env = seeded_env();

    let first = env
        .lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("first lookup resolves");
    drain_detached_tasks().await;
    assert_eq!(env.search_log.records().len(), 1);
    assert!(env.cache.contains("lookup:code:100:base"));

    let second = env
        .lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("second lookup served from cache");
    drain_detached_tasks().await;

    assert_eq!(second, first, "cache hit returns the response verbatim");
    assert_eq!(
        env.search_log.records().len(),
        1,
        "cache hits are not re-logged"
    );
}

#[tokio::test]
async fn size_lookup_normalizes_flexible_spacing() {
    let env = seeded_env();

    let response = env
        .lookups
        .find_by_size("205 / 55 r16", LookupOptions::default())
        .await
        .expect("denormalized spacing resolves");

    assert_eq!(response.code, "100");
    assert_eq!(response.size_normalized, "205/55R16");
}

#[tokio::test]
async fn successful_lookup_logs_hashed_ip() {
    let env = seeded_env();

    env.lookups
        .find_by_code(
            "100",
            LookupOptions {
                client_ip: Some("203.0.113.7".to_owned()),
                ..LookupOptions::default()
            },
        )
        .await
        .expect("lookup resolves");
    drain_detached_tasks().await;

    let records = env.search_log.records();
    let record = records.first().expect("one record logged");
    assert!(record.result_found);
    assert_eq!(record.ip_hash.as_deref(), Some(hash_ip("203.0.113.7").as_str()));
}

#[tokio::test]
async fn analytics_aggregate_logged_lookups() {
    let env = seeded_env();

    env.lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("hit");
    env.lookups
        .find_by_code("999", LookupOptions::default())
        .await
        .expect_err("miss");
    env.lookups
        .find_by_size("195/65R15", LookupOptions::default())
        .await
        .expect_err("miss");
    drain_detached_tasks().await;

    let analytics = AnalyticsService::new(Arc::clone(&env.search_log));
    let overview = analytics
        .overview(AnalyticsWindow::default(), None)
        .await
        .expect("overview");

    assert_eq!(overview.total_searches, 3);
    assert_eq!(overview.successful_searches, 1);
    assert_eq!(overview.failed_searches, 2);
    assert_eq!(overview.success_rate, "33.33%");
    assert_eq!(overview.recent_searches.len(), 3);

    let top = analytics
        .top_searches(None, None)
        .await
        .expect("top searches");
    assert!(
        top.iter()
            .any(|entry| entry.query == "100" && entry.query_type == SearchQueryType::Code)
    );
}

#[tokio::test]
async fn full_variant_list_is_returned_when_no_variant_requested() {
    let env = seeded_env();

    let response = env
        .lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("lookup resolves");

    let variants = response.variants.expect("non-empty variant list included");
    assert_eq!(variants.len(), 1);
    assert_eq!(env.catalog.variant_count(), 1);
}
