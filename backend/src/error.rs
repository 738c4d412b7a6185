use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorResponse, Size, ValidationError};
use thiserror::Error;
use tracing::error;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Vote not found")]
    NotFound { user: String },
    #[error("Unknown board: {0}")]
    UnknownBoard(String),
    #[error("Invalid sizes")]
    InvalidSizes(Vec<Size>),
    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn not_found(user: impl Into<String>) -> Self {
        ApiError::NotFound { user: user.into() }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidSizes(sizes) => ApiError::InvalidSizes(sizes),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::NotFound { user } => (Status::NotFound, ErrorResponse::new(message).with_user(user)),
            ApiError::UnknownBoard(_) => (Status::NotFound, ErrorResponse::new(message)),
            ApiError::InvalidSizes(sizes) => {
                (Status::BadRequest, ErrorResponse::new(message).with_invalid_sizes(sizes))
            }
            ApiError::MalformedBody(_) => (Status::BadRequest, ErrorResponse::new(message)),
            ApiError::Store(StoreError::MissingRequiredField(_)) => {
                (Status::BadRequest, ErrorResponse::new(message))
            }
            ApiError::Store(StoreError::Database(_)) => {
                error!("{}", message);
                (Status::InternalServerError, ErrorResponse::new("Internal server error"))
            }
        };

        (status, Json(body)).respond_to(req)
    }
}
