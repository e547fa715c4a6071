//! Admin mapping management over the in-memory adapters, including cache
//! invalidation effects observable through the lookup service.

use std::sync::Arc;

use backend::domain::{
    CreateMappingRequest, ErrorCode, LookupOptions, LookupService, MappingService,
    UpdateMappingRequest,
};
use backend::test_support::{
    InMemoryCatalogRepository, InMemoryLookupCache, RecordingSearchLog, SequentialCodeIssuer,
};
use uuid::Uuid;

struct Env {
    catalog: Arc<InMemoryCatalogRepository>,
    cache: Arc<InMemoryLookupCache>,
    mappings: MappingService<InMemoryCatalogRepository, InMemoryLookupCache, SequentialCodeIssuer>,
    lookups: LookupService<InMemoryCatalogRepository, InMemoryLookupCache, RecordingSearchLog>,
}

fn env() -> Env {
    let catalog = Arc::new(InMemoryCatalogRepository::new());
    let cache = Arc::new(InMemoryLookupCache::new());
    let mappings = MappingService::new(
        Arc::clone(&catalog),
        Arc::clone(&cache),
        Arc::new(SequentialCodeIssuer::new()),
    );
    let lookups = LookupService::new(
        Arc::clone(&catalog),
        Arc::clone(&cache),
        Arc::new(RecordingSearchLog::new()),
    );
    Env {
        catalog,
        cache,
        mappings,
        lookups,
    }
}

fn create(size_raw: &str) -> CreateMappingRequest {
    CreateMappingRequest {
        size_raw: size_raw.to_owned(),
        load_index: None,
        speed_index: None,
    }
}

#[tokio::test]
async fn created_mappings_get_sequential_codes_and_resolve() {
    let env = env();

    let first = env
        .mappings
        .create(create("205/55 r16"))
        .await
        .expect("first mapping");
    let second = env
        .mappings
        .create(create("195/65R15"))
        .await
        .expect("second mapping");

    assert_eq!(first.code_public, "100");
    assert_eq!(first.size_normalized, "205/55R16");
    assert_eq!(first.size_raw, "205/55 r16");
    assert_eq!(second.code_public, "101");

    let resolved = env
        .lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("created mapping resolves");
    assert_eq!(resolved.size_normalized, "205/55R16");
}

#[tokio::test]
async fn creating_an_already_mapped_size_conflicts() {
    let env = env();
    env.mappings
        .create(create("205/55R16"))
        .await
        .expect("first mapping");

    let error = env
        .mappings
        .create(create("205 / 55 R16"))
        .await
        .expect_err("same normalized size");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(env.catalog.size_count(), 1);
}

#[tokio::test]
async fn duplicate_issued_code_surfaces_as_conflict() {
    let catalog = Arc::new(InMemoryCatalogRepository::new());
    let mappings = MappingService::new(
        Arc::clone(&catalog),
        Arc::new(InMemoryLookupCache::new()),
        // A stuck sequence keeps issuing the same code.
        Arc::new(SequentialCodeIssuer::starting_at(100)),
    );
    mappings.create(create("205/55R16")).await.expect("first");

    let stuck = MappingService::new(
        Arc::clone(&catalog),
        Arc::new(InMemoryLookupCache::new()),
        Arc::new(SequentialCodeIssuer::starting_at(100)),
    );
    let error = stuck
        .create(create("195/65R15"))
        .await
        .expect_err("code already used");
    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn create_with_variant_pair_attaches_variant() {
    let env = env();

    let record = env
        .mappings
        .create(CreateMappingRequest {
            size_raw: "205/55R16".to_owned(),
            load_index: Some(91),
            speed_index: Some("v".to_owned()),
        })
        .await
        .expect("mapping with variant");
    assert_eq!(env.catalog.variant_count(), 1);

    let resolved = env
        .lookups
        .find_by_code(
            &record.code_public,
            LookupOptions {
                load_index: Some(91),
                speed_index: Some("V".to_owned()),
                client_ip: None,
            },
        )
        .await
        .expect("variant lookup resolves");
    assert!(resolved.variant.is_some());
}

#[tokio::test]
async fn update_rewrites_size_and_invalidates_stale_cache_entries() {
    let env = env();
    let record = env
        .mappings
        .create(create("205/55R16"))
        .await
        .expect("mapping");

    // Prime the cache on both axes.
    env.lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("code lookup");
    env.lookups
        .find_by_size("205/55R16", LookupOptions::default())
        .await
        .expect("size lookup");
    assert!(env.cache.contains("lookup:code:100:base"));
    assert!(env.cache.contains("lookup:size:205/55R16:base"));

    let updated = env
        .mappings
        .update(
            record.id,
            UpdateMappingRequest {
                size_raw: Some("195/65R15".to_owned()),
                ..UpdateMappingRequest::default()
            },
        )
        .await
        .expect("size update");

    assert_eq!(updated.code_public, "100", "code survives a size update");
    assert_eq!(updated.size_normalized, "195/65R15");
    assert!(
        !env.cache.contains("lookup:code:100:base"),
        "stale code entry must be invalidated"
    );
    assert!(
        !env.cache.contains("lookup:size:205/55R16:base"),
        "stale size entry must be invalidated"
    );

    let error = env
        .lookups
        .find_by_size("205/55R16", LookupOptions::default())
        .await
        .expect_err("old size is gone");
    assert_eq!(error.code(), ErrorCode::NotFound);

    let resolved = env
        .lookups
        .find_by_size("195/65R15", LookupOptions::default())
        .await
        .expect("new size resolves");
    assert_eq!(resolved.code, "100");
}

#[tokio::test]
async fn update_without_fields_is_rejected() {
    let env = env();
    let record = env
        .mappings
        .create(create("205/55R16"))
        .await
        .expect("mapping");

    let error = env
        .mappings
        .update(record.id, UpdateMappingRequest::default())
        .await
        .expect_err("no fields");
    assert_eq!(error.code(), ErrorCode::MissingParameter);
}

#[tokio::test]
async fn update_of_unknown_mapping_is_not_found() {
    let env = env();

    let error = env
        .mappings
        .update(
            Uuid::new_v4(),
            UpdateMappingRequest {
                size_raw: Some("205/55R16".to_owned()),
                ..UpdateMappingRequest::default()
            },
        )
        .await
        .expect_err("unknown id");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn update_into_another_mappings_size_conflicts() {
    let env = env();
    let first = env
        .mappings
        .create(create("205/55R16"))
        .await
        .expect("first mapping");
    env.mappings
        .create(create("195/65R15"))
        .await
        .expect("second mapping");

    let error = env
        .mappings
        .update(
            first.id,
            UpdateMappingRequest {
                size_raw: Some("195/65R15".to_owned()),
                ..UpdateMappingRequest::default()
            },
        )
        .await
        .expect_err("size owned by another mapping");
    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn identical_variant_pairs_are_not_duplicated() {
    let env = env();
    let record = env
        .mappings
        .create(CreateMappingRequest {
            size_raw: "205/55R16".to_owned(),
            load_index: Some(91),
            speed_index: Some("V".to_owned()),
        })
        .await
        .expect("mapping with variant");
    assert_eq!(env.catalog.variant_count(), 1);

    env.mappings
        .update(
            record.id,
            UpdateMappingRequest {
                size_raw: None,
                load_index: Some(91),
                speed_index: Some("V".to_owned()),
            },
        )
        .await
        .expect("idempotent variant update");
    assert_eq!(env.catalog.variant_count(), 1, "variants stay immutable");

    env.mappings
        .update(
            record.id,
            UpdateMappingRequest {
                size_raw: None,
                load_index: Some(94),
                speed_index: Some("H".to_owned()),
            },
        )
        .await
        .expect("new variant pair");
    assert_eq!(env.catalog.variant_count(), 2);
}

#[tokio::test]
async fn delete_returns_snapshot_and_clears_cache() {
    let env = env();
    let record = env
        .mappings
        .create(create("205/55R16"))
        .await
        .expect("mapping");
    env.lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect("prime cache");

    let snapshot = env
        .mappings
        .delete(record.id)
        .await
        .expect("delete succeeds");

    assert_eq!(snapshot.code_public, "100");
    assert_eq!(snapshot.size_normalized, "205/55R16");
    assert_eq!(env.catalog.size_count(), 0);
    assert!(env.cache.is_empty(), "deleted mapping leaves no cache entries");

    let error = env
        .lookups
        .find_by_code("100", LookupOptions::default())
        .await
        .expect_err("mapping is gone");
    assert_eq!(error.code(), ErrorCode::NotFound);

    let again = env.mappings.delete(record.id).await.expect_err("already deleted");
    assert_eq!(again.code(), ErrorCode::NotFound);
}
