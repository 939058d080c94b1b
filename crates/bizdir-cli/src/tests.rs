use std::path::PathBuf;
use std::sync::Arc;

use bizdir_search::{SearchOptions, SearchOrchestrator};
use chrono::{TimeZone, Utc};

use super::*;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("directory.yaml")
}

fn fixture_search() -> SearchOrchestrator {
    let file = bizdir_core::load_directory(&fixture_path()).expect("fixture loads");
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let store = Arc::new(offline::memory_store(&file, now));
    SearchOrchestrator::new(store.clone(), store, SearchOptions::default())
}

fn search_args(args: &[&str]) -> SearchArgs {
    let mut argv = vec!["bizdir", "search"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).expect("expected valid cli args").command {
        Some(Commands::Search(args)) => args,
        other => panic!("expected search command, got {other:?}"),
    }
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["bizdir", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["bizdir", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn parses_db_seed_without_path() {
    let cli = Cli::try_parse_from(["bizdir", "db", "seed"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed { path: None }
        })
    ));
}

#[test]
fn parses_db_seed_with_path() {
    let cli = Cli::try_parse_from(["bizdir", "db", "seed", "--path", "fixtures/dir.yaml"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Seed { path: Some(ref p) }
        }) if p == &PathBuf::from("fixtures/dir.yaml")
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["bizdir"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn search_defaults_to_first_page() {
    let args = search_args(&[]);
    let request = args.to_request();

    assert_eq!(request.page, 1);
    assert_eq!(request.page_size, bizdir_core::DEFAULT_PAGE_SIZE);
    assert!(request.term.is_none());
    assert!(request.attributes.required().is_empty());
    assert!(!args.json);
}

#[test]
fn search_flags_map_onto_request() {
    let args = search_args(&[
        "coffee",
        "--location",
        "Kigali",
        "--category",
        "cafes",
        "--radius-km",
        "75",
        "--online-orders",
        "--page-size",
        "5",
        "--json",
    ]);
    let request = args.to_request();

    assert_eq!(request.term.as_deref(), Some("coffee"));
    assert_eq!(request.location.as_deref(), Some("Kigali"));
    assert_eq!(request.category.as_deref(), Some("cafes"));
    assert_eq!(request.radius_km, Some(75.0));
    assert!(request.attributes.accepts_online_orders);
    assert_eq!(request.page_size, 5);
    assert!(args.json);
}

#[test]
fn search_rejects_non_numeric_page() {
    let parsed = Cli::try_parse_from(["bizdir", "search", "--page", "two"]);
    assert!(parsed.is_err());
}

#[tokio::test]
async fn fixture_search_ranks_kigali_cafes() {
    let engine = fixture_search();
    let args = search_args(&["cafe", "--location", "Kigali"]);

    let result = engine.search(&args.to_request()).await.expect("search");
    let names: Vec<&str> = result
        .items
        .iter()
        .map(|item| item.business.name.as_str())
        .collect();

    assert_eq!(names, vec!["Bourbon Coffee Cafe", "Question Coffee Cafe"]);
    assert_eq!(
        result.locations.as_ref().and_then(|l| l.first()).map(String::as_str),
        Some("Kigali")
    );

    // One approved review plus one from before moderation existed.
    let question = &result.items[1].rating;
    assert_eq!(question.count, 2);
    assert!((question.average - 4.5).abs() < 1e-9);
}

#[tokio::test]
async fn fixture_regions_are_inherited_from_locations() {
    let engine = fixture_search();
    let args = search_args(&["--region", "UG"]);

    let result = engine.search(&args.to_request()).await.expect("search");
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].business.name, "Kampala Java House");
}

#[tokio::test]
async fn render_prints_table_and_totals() {
    let engine = fixture_search();
    let args = search_args(&["cafe", "--location", "Kigali"]);
    let result = engine.search(&args.to_request()).await.expect("search");

    let text = search::render(&result);
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[0].starts_with("near: Kigali"));
    assert!(lines[1].starts_with("#"));
    assert!(lines[2].contains("Bourbon Coffee Cafe"));
    assert!(lines[2].contains("yes"));
    assert!(lines[2].ends_with("4.0 (3)"));
    assert!(lines[3].contains("Question Coffee Cafe"));
    assert_eq!(lines[4], "page 1 (20 per page), 2 total");
}

#[tokio::test]
async fn render_reports_empty_page() {
    let engine = fixture_search();
    let args = search_args(&["--category", "submarines"]);
    let result = engine.search(&args.to_request()).await.expect("search");

    assert_eq!(search::render(&result), "no matching businesses\n");
}


#[tokio::test]
async fn failed_search_surfaces_the_error() {
    let args = search_args(&["cafe", "--page", "0"]);
    let err = search::execute(&fixture_search(), &args)
        .await
        .expect_err("page zero is rejected");

    assert!(err.to_string().contains("page must be 1 or greater"));
}
