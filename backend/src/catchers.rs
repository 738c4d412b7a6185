use rocket::{catch, Request};
use rocket::serde::json::Json;
use shared::ErrorResponse;

fn reply(error: &str, status: u16) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(error).with_status(status))
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    reply("Invalid request parameters.", 400)
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorResponse> {
    reply("The requested resource was not found.", 404)
}

#[catch(422)]
pub fn unprocessable_entity(_req: &Request) -> Json<ErrorResponse> {
    reply("The request body could not be understood.", 422)
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    reply("An internal server error occurred.", 500)
}
