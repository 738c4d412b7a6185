use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;
use shared::{Board, ErrorResponse, Size, SizeValues, ValueGroup, Vote, VoteInput};
use crate::{config::AppConfig, db::Database, routes::AppState, store::{StoreError, VoteStore}};

async fn memory_db() -> Database {
    let config = AppConfig {
        max_connections: 1,
        ..AppConfig::new("sqlite::memory:")
    };
    let db = Database::connect(&config).await.unwrap();
    db.migrate().await.unwrap();
    db
}

async fn grid_store() -> VoteStore {
    VoteStore::new(&memory_db().await, Board::Grid)
}

async fn client() -> Client {
    let db = memory_db().await;
    let rocket = crate::attach(rocket::custom(rocket::Config::debug_default()), AppState::new(&db));
    Client::tracked(rocket).await.unwrap()
}

fn sizes(tiny: &str, small: &str, medium: &str, large: &str, huge: &str) -> SizeValues {
    SizeValues {
        tiny: Some(tiny.into()),
        small: Some(small.into()),
        medium: Some(medium.into()),
        large: Some(large.into()),
        huge: Some(huge.into()),
    }
}

fn sample_vote(name: &str) -> Vote {
    Vote::new(name, sizes("12ex", "0.2em", "10em", "18rem", "0.6ex"))
}

const SAMPLE_BODY: &str =
    r#"{"tiny": "12ex", "small": "0.2em", "medium": "10em", "large": "18rem", "huge": "0.6em"}"#;

#[tokio::test]
async fn test_insert_then_get() {
    let store = grid_store().await;
    let vote = sample_vote("Frænky");

    let result = store.insert(&vote.clone().into()).await.unwrap();
    assert!(result.created);
    assert_eq!(result.name, "Frænky");

    assert_eq!(store.get("Frænky").await.unwrap(), Some(vote));
    assert_eq!(store.get("Flavìo").await.unwrap(), None);
}

#[tokio::test]
async fn test_insert_without_name_is_rejected() {
    let store = grid_store().await;
    let mut vote: VoteInput = sample_vote("Frænky").into();
    vote.name = None;

    let err = store.insert(&vote).await.unwrap_err();
    assert!(err.is_missing_required_field(), "{err:?}");
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_replace_without_name_are_rejected() {
    let store = grid_store().await;
    let vote = VoteInput { name: None, ..VoteInput::default() }.with(Size::Huge, Some("1em"));

    assert!(matches!(store.update(&vote).await, Err(StoreError::MissingRequiredField(_))));
    assert!(matches!(store.replace(&vote).await, Err(StoreError::MissingRequiredField(_))));
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_insert_is_a_store_error() {
    let store = grid_store().await;
    let vote: VoteInput = sample_vote("Frænky").into();

    store.insert(&vote).await.unwrap();
    let err = store.insert(&vote).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)), "{err:?}");
}

#[tokio::test]
async fn test_update_replaces_values() {
    let store = grid_store().await;
    let mut vote = sample_vote("Frænky");
    store.insert(&vote.clone().into()).await.unwrap();

    vote.sizes.huge = Some("27em".into());
    let result = store.update(&vote.clone().into()).await.unwrap();
    assert!(!result.created);
    assert_eq!(store.get("Frænky").await.unwrap(), Some(vote));
}

#[tokio::test]
async fn test_update_keeps_absent_fields() {
    let store = grid_store().await;
    let vote = sample_vote("Frænky");
    store.insert(&vote.clone().into()).await.unwrap();

    let patch = VoteInput::new("Frænky").with(Size::Huge, Some("2em"));
    store.update(&patch).await.unwrap();

    let stored = store.get("Frænky").await.unwrap().unwrap();
    assert_eq!(stored.sizes.huge.as_deref(), Some("2em"));
    assert_eq!(stored.sizes.tiny, vote.sizes.tiny);
    assert_eq!(stored.sizes.small, vote.sizes.small);
    assert_eq!(stored.sizes.medium, vote.sizes.medium);
    assert_eq!(stored.sizes.large, vote.sizes.large);
}

#[tokio::test]
async fn test_update_of_unknown_name_reports_not_created() {
    let store = grid_store().await;
    let patch = VoteInput::new("Nobody").with(Size::Tiny, Some("1em"));

    let result = store.update(&patch).await.unwrap();
    assert!(!result.created);
    assert_eq!(store.get("Nobody").await.unwrap(), None);
}

#[tokio::test]
async fn test_replace_creates_then_updates() {
    let store = grid_store().await;
    let vote: VoteInput = sample_vote("Flavìo").into();

    assert!(store.replace(&vote).await.unwrap().created);

    let vote = vote.with(Size::Tiny, Some("0.001ex"));
    let result = store.replace(&vote).await.unwrap();
    assert!(!result.created);
    assert_eq!(result.name, "Flavìo");

    let stored = store.get("Flavìo").await.unwrap().unwrap();
    assert_eq!(stored.sizes.tiny.as_deref(), Some("0.001ex"));
}

#[tokio::test]
async fn test_patch_returns_sizes_or_none() {
    let store = grid_store().await;
    store.insert(&sample_vote("Bany").into()).await.unwrap();

    let patch = VoteInput::default()
        .with(Size::Tiny, Some("0.2em"))
        .with(Size::Large, Some("0.7em"));
    let patched = store.patch("Bany", &patch).await.unwrap();
    assert_eq!(patched, Some(sizes("0.2em", "0.2em", "10em", "0.7em", "0.6ex")));

    assert_eq!(store.patch("Nobody", &patch).await.unwrap(), None);
    assert_eq!(store.patch("Bany", &VoteInput::default()).await.unwrap(), patched);
}

#[tokio::test]
async fn test_aggregate_empty_store() {
    let store = grid_store().await;
    assert_eq!(store.aggregate().await.unwrap(), Vec::<ValueGroup>::new());
}

#[tokio::test]
async fn test_aggregate_groups_and_orders() {
    let store = grid_store().await;
    store.insert(&sample_vote("Frænky").into()).await.unwrap();
    let other = VoteInput::new("Bany")
        .with(Size::Small, Some("0.2em"))
        .with(Size::Huge, Some("5ex"))
        .with(Size::Tiny, Some("1ex"));
    store.insert(&other).await.unwrap();

    let groups = store.aggregate().await.unwrap();
    let keys: Vec<(Size, &str)> = groups.iter().map(|g| (g.size, g.value.as_str())).collect();
    assert_eq!(
        keys,
        vec![
            (Size::Tiny, "12ex"),
            (Size::Tiny, "1ex"),
            (Size::Small, "0.2em"),
            (Size::Medium, "10em"),
            (Size::Large, "18rem"),
            (Size::Huge, "0.6ex"),
            (Size::Huge, "5ex"),
        ]
    );

    let small = groups.iter().find(|g| g.size == Size::Small).unwrap();
    assert_eq!(small.voters, vec!["Bany".to_string(), "Frænky".to_string()]);

    // Bany left medium and large unset.
    let medium = groups.iter().find(|g| g.size == Size::Medium).unwrap();
    assert_eq!(medium.voters, vec!["Frænky".to_string()]);
}

#[tokio::test]
async fn test_boards_are_independent() {
    let db = memory_db().await;
    let grid = VoteStore::new(&db, Board::Grid);
    let table = VoteStore::new(&db, Board::Table);

    grid.insert(&sample_vote("Bany").into()).await.unwrap();
    assert_eq!(table.get("Bany").await.unwrap(), None);
    assert!(table.aggregate().await.unwrap().is_empty());
    assert_eq!(grid.get_all().await.unwrap().len(), 1);
}

#[rocket::async_test]
async fn test_put_creates_then_replaces() {
    let client = client().await;

    let resp = client.put("/votes/grid/Bany").header(ContentType::JSON).body(SAMPLE_BODY).dispatch().await;
    assert_eq!(resp.status(), Status::Created);
    assert!(resp.into_string().await.unwrap_or_default().is_empty());

    let resp = client.put("/votes/grid/Bany").header(ContentType::JSON).body(SAMPLE_BODY).dispatch().await;
    assert_eq!(resp.status(), Status::NoContent);
}

#[rocket::async_test]
async fn test_put_nullifies_missing_keys() {
    let client = client().await;
    client.put("/votes/table/Bany").header(ContentType::JSON).body(SAMPLE_BODY).dispatch().await;

    let resp = client
        .put("/votes/table/Bany")
        .header(ContentType::JSON)
        .body(r#"{"tiny": "1em", "small": "2em", "medium": "3em", "huge": "4em"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::NoContent);

    let resp = client.get("/votes/table/Bany").dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let vote: Vote = resp.into_json().await.unwrap();
    assert_eq!(vote.name, "Bany");
    assert_eq!(vote.sizes.large, None);
    assert_eq!(vote.sizes.huge.as_deref(), Some("4em"));
}

#[rocket::async_test]
async fn test_put_rejects_invalid_sizes() {
    let client = client().await;
    let resp = client
        .put("/votes/grid/Bany")
        .header(ContentType::JSON)
        .body(r#"{"tiny": "12ex", "medium": "10"}"#)
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::BadRequest);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert_eq!(body.error, "Invalid sizes");
    assert_eq!(body.invalid_sizes, Some(vec![Size::Medium]));
}

#[rocket::async_test]
async fn test_malformed_json_is_a_bad_request() {
    let client = client().await;
    let resp = client
        .patch("/votes/grid/randomUser")
        .header(ContentType::JSON)
        .body(r#"{"invalidJSON""#)
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::BadRequest);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert!(body.error.contains("JSON"), "{}", body.error);
}

#[rocket::async_test]
async fn test_get_unknown_voter_is_not_found() {
    let client = client().await;
    let resp = client.get("/votes/grid/Bany").dispatch().await;

    assert_eq!(resp.status(), Status::NotFound);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert_eq!(body.user.as_deref(), Some("Bany"));
}

#[rocket::async_test]
async fn test_patch_only_changes_given_keys() {
    let client = client().await;
    client.put("/votes/grid/Bany").header(ContentType::JSON).body(SAMPLE_BODY).dispatch().await;

    let resp = client
        .patch("/votes/grid/Bany")
        .header(ContentType::JSON)
        .body(r#"{"tiny": "0.2em", "large": "0.7em"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::Ok);
    let body: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "tiny": "0.2em",
            "small": "0.2em",
            "medium": "10em",
            "large": "0.7em",
            "huge": "0.6em"
        })
    );
}

#[rocket::async_test]
async fn test_patch_unknown_voter_is_not_found() {
    let client = client().await;
    let resp = client
        .patch("/votes/grid/Bany")
        .header(ContentType::JSON)
        .body(SAMPLE_BODY)
        .dispatch()
        .await;

    assert_eq!(resp.status(), Status::NotFound);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert_eq!(body.user.as_deref(), Some("Bany"));
}

#[rocket::async_test]
async fn test_list_groups() {
    let client = client().await;

    let resp = client.get("/votes/grid").dispatch().await;
    assert_eq!(resp.status(), Status::NoContent);

    client.put("/votes/grid/Bany").header(ContentType::JSON).body(SAMPLE_BODY).dispatch().await;
    client
        .put("/votes/grid/Snorlo")
        .header(ContentType::JSON)
        .body(r#"{"small": "0.2em", "huge": "5ex"}"#)
        .dispatch()
        .await;

    let resp = client.get("/votes/grid").dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let groups: Vec<ValueGroup> = resp.into_json().await.unwrap();
    assert_eq!(groups.len(), 6);
    assert_eq!(groups[0].size, Size::Tiny);
    assert_eq!(groups[1].size, Size::Small);
    assert_eq!(groups[1].voters, vec!["Bany".to_string(), "Snorlo".to_string()]);
    assert_eq!(groups[5].size, Size::Huge);
    assert_eq!(groups[5].value, "5ex");

    let resp = client.get("/votes/table").dispatch().await;
    assert_eq!(resp.status(), Status::NoContent);
}

#[rocket::async_test]
async fn test_unknown_board_is_not_found() {
    let client = client().await;
    let resp = client.get("/votes/chairs").dispatch().await;

    assert_eq!(resp.status(), Status::NotFound);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert_eq!(body.error, "Unknown board: chairs");

    let resp = client.get("/nowhere/at/all").dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
    let body: ErrorResponse = resp.into_json().await.unwrap();
    assert_eq!(body.status, Some(404));
}
