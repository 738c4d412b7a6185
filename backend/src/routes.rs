use rocket::http::Status;
use rocket::response::status::NoContent;
use rocket::serde::json::{self, Json};
use rocket::{get, patch, put, Responder, State};
use tracing::{debug, info, instrument};
use shared::{models::*, validation::validate_vote};
use crate::{db::Database, error::ApiError, store::VoteStore};

pub struct AppState {
    pub grid: VoteStore,
    pub table: VoteStore,
}

impl AppState {
    pub fn new(db: &Database) -> Self {
        Self {
            grid: VoteStore::new(db, Board::Grid),
            table: VoteStore::new(db, Board::Table),
        }
    }

    pub fn store(&self, board: Board) -> &VoteStore {
        match board {
            Board::Grid => &self.grid,
            Board::Table => &self.table,
        }
    }

    fn board_store(&self, board: Result<Board, &str>) -> Result<&VoteStore, ApiError> {
        board
            .map(|board| self.store(board))
            .map_err(|name| ApiError::UnknownBoard(name.to_owned()))
    }
}

#[derive(Responder)]
pub enum GroupsResponse {
    Groups(Json<Vec<ValueGroup>>),
    Empty(NoContent),
}

/// Reads the request body, with the voter from the path as its name.
fn vote_from_body(
    voter: &str,
    body: Result<Json<VoteInput>, json::Error<'_>>,
) -> Result<VoteInput, ApiError> {
    let mut vote = body
        .map_err(|e| ApiError::MalformedBody(e.to_string()))?
        .into_inner();
    vote.name = Some(voter.to_owned());
    validate_vote(&vote)?;
    Ok(vote)
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(state))]
#[get("/votes/<board>")]
pub async fn list_groups(state: &State<AppState>, board: Result<Board, &str>) -> Result<GroupsResponse, ApiError> {
    let groups = state.board_store(board)?.aggregate().await?;
    if groups.is_empty() {
        debug!("No votes yet");
        return Ok(GroupsResponse::Empty(NoContent));
    }
    Ok(GroupsResponse::Groups(Json(groups)))
}

#[instrument(skip(state))]
#[get("/votes/<board>/<voter>")]
pub async fn get_vote(state: &State<AppState>, board: Result<Board, &str>, voter: &str) -> Result<Json<Vote>, ApiError> {
    state
        .board_store(board)?
        .get(voter)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(voter))
}

#[instrument(skip(state, body))]
#[patch("/votes/<board>/<voter>", data = "<body>")]
pub async fn patch_vote(
    state: &State<AppState>,
    board: Result<Board, &str>,
    voter: &str,
    body: Result<Json<VoteInput>, json::Error<'_>>,
) -> Result<Json<SizeValues>, ApiError> {
    let store = state.board_store(board)?;
    let vote = vote_from_body(voter, body)?;
    store
        .patch(voter, &vote)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(voter))
}

#[instrument(skip(state, body))]
#[put("/votes/<board>/<voter>", data = "<body>")]
pub async fn put_vote(
    state: &State<AppState>,
    board: Result<Board, &str>,
    voter: &str,
    body: Result<Json<VoteInput>, json::Error<'_>>,
) -> Result<Status, ApiError> {
    let store = state.board_store(board)?;
    let vote = vote_from_body(voter, body)?.into_full();
    let result = store.replace(&vote).await?;
    if result.created {
        info!(name = %result.name, "Vote created");
        Ok(Status::Created)
    } else {
        debug!(name = %result.name, "Vote replaced");
        Ok(Status::NoContent)
    }
}
