//! Live integration tests for bizdir-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/bizdir-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use std::path::Path;
use std::sync::Arc;

use bizdir_core::{load_directory, DirectoryFile, SearchRequest};
use bizdir_db::{
    count_businesses, get_category_by_slug, get_location_by_name, get_region_by_code,
    list_located_locations, seed_directory, PgStore,
};
use bizdir_search::{
    BusinessQuery, Clause, Field, Predicate, SearchOptions, SearchOrchestrator, Value,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture() -> DirectoryFile {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("directory.yaml");
    load_directory(&path).expect("fixture loads")
}

async fn seeded(pool: &sqlx::PgPool) -> PgStore {
    seed_directory(pool, &fixture())
        .await
        .expect("seed_directory failed");
    PgStore::new(pool.clone())
}

fn orchestrator(store: PgStore) -> SearchOrchestrator {
    let store = Arc::new(store);
    SearchOrchestrator::new(store.clone(), store, SearchOptions::default())
}

fn names(result: &bizdir_search::SearchResult) -> Vec<&str> {
    result
        .items
        .iter()
        .map(|item| item.business.name.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Section 1: Seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_writes_every_fixture_row(pool: sqlx::PgPool) {
    let file = fixture();
    let summary = seed_directory(&pool, &file).await.expect("seed failed");

    assert_eq!(summary.regions, file.regions.len());
    assert_eq!(summary.locations, file.locations.len());
    assert_eq!(summary.categories, file.categories.len());
    assert_eq!(summary.businesses, file.businesses.len());
}

#[sqlx::test(migrations = "../../migrations")]
async fn reseeding_is_idempotent(pool: sqlx::PgPool) {
    let file = fixture();
    seed_directory(&pool, &file).await.expect("first seed");
    seed_directory(&pool, &file).await.expect("second seed");

    let businesses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM businesses")
        .fetch_one(&pool)
        .await
        .unwrap();
    let ratings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rating_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    let expected_ratings: usize = file.businesses.iter().map(|b| b.ratings.len()).sum();

    assert_eq!(usize::try_from(businesses).unwrap(), file.businesses.len());
    assert_eq!(usize::try_from(ratings).unwrap(), expected_ratings);
}

// ---------------------------------------------------------------------------
// Section 2: Directory lookups
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn located_locations_skip_missing_coordinates(pool: sqlx::PgPool) {
    seeded(&pool).await;

    let located = list_located_locations(&pool).await.unwrap();
    assert!(located.iter().all(|l| l.name != "Gisenyi"));
    assert!(located.iter().any(|l| l.name == "Kigali"));

    let gisenyi = get_location_by_name(&pool, "Gisenyi")
        .await
        .unwrap()
        .expect("Gisenyi exists");
    assert!(gisenyi.latitude.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn region_lookup_ignores_case(pool: sqlx::PgPool) {
    seeded(&pool).await;

    let region = get_region_by_code(&pool, "rw").await.unwrap();
    assert_eq!(region.map(|r| r.code), Some("RW".to_string()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn name_and_slug_lookups_are_exact(pool: sqlx::PgPool) {
    seeded(&pool).await;

    assert!(get_location_by_name(&pool, "Kigali").await.unwrap().is_some());
    assert!(get_location_by_name(&pool, "kigali").await.unwrap().is_none());
    assert!(get_category_by_slug(&pool, "cafes").await.unwrap().is_some());
    assert!(get_category_by_slug(&pool, "CAFES").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Section 3: Predicate rendering against real rows
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn count_matches_query_length(pool: sqlx::PgPool) {
    let store = seeded(&pool).await;
    let predicate = Predicate::all().and(Clause::In(
        Field::Status,
        vec![
            Value::Text("active".to_string()),
            Value::Text("premium".to_string()),
        ],
    ));

    let count = count_businesses(&pool, &predicate).await.unwrap();
    let rows = bizdir_db::query_businesses(store.pool(), &BusinessQuery::new(predicate))
        .await
        .unwrap();
    assert_eq!(count, rows.len() as u64);
    assert!(rows.iter().all(|b| b.status.is_listable()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn like_metacharacters_match_literally(pool: sqlx::PgPool) {
    seeded(&pool).await;
    let predicate =
        Predicate::all().and(Clause::Contains(Field::Name, "100%".to_string()));
    assert_eq!(count_businesses(&pool, &predicate).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Section 4: End-to-end search
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn kigali_cafes_premium_first(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        term: Some("cafe".to_string()),
        location: Some("Kigali".to_string()),
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.expect("search succeeds");
    assert_eq!(
        names(&result),
        vec!["Bourbon Coffee Cafe", "Question Coffee Cafe"]
    );
    assert!(result.total.exact);
    assert_eq!(result.total.value, 2);

    // Rejected review is excluded under the default policy.
    let bourbon = &result.items[0].rating;
    assert_eq!(bourbon.count, 3);
    assert!((bourbon.average - 4.0).abs() < 1e-9);
}

#[sqlx::test(migrations = "../../migrations")]
async fn location_without_coordinates_matches_exact_name(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        location: Some("Gisenyi".to_string()),
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.unwrap();
    assert_eq!(names(&result), vec!["Lakeside Cafe"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_category_returns_empty(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        category: Some("submarines".to_string()),
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.total.value, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn region_filter_includes_premium_status(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        region: Some("ug".to_string()),
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.unwrap();
    assert_eq!(names(&result), vec!["Kampala Java House"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn dotted_term_matches_website(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        term: Some("heaven.example.rw".to_string()),
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.unwrap();
    assert_eq!(names(&result), vec!["Heaven Restaurant"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn apostrophe_term_is_bound_not_spliced(pool: sqlx::PgPool) {
    let store = seeded(&pool).await;
    sqlx::query("UPDATE businesses SET name = 'Mama''s Kitchen' WHERE name = 'Eastern Grill'")
        .execute(&pool)
        .await
        .unwrap();

    let request = SearchRequest {
        term: Some("mama's".to_string()),
        ..SearchRequest::default()
    };
    let result = orchestrator(store).search(&request).await.unwrap();
    assert_eq!(names(&result), vec!["Mama's Kitchen"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deep_page_is_empty_with_exact_total(pool: sqlx::PgPool) {
    let search = orchestrator(seeded(&pool).await);
    let request = SearchRequest {
        page: 4_000_000,
        page_size: 100,
        ..SearchRequest::default()
    };

    let result = search.search(&request).await.unwrap();
    assert!(result.items.is_empty());
    assert!(result.total.exact);
    assert!(result.total.value > 0);
}
