use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, why.into())
    }

    pub fn unauthorized(why: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, why.into())
    }

    /// The HTTP status this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::BadRequest,
            Self::Status(status, _) => *status,
            Self::NotFound(_) => Status::NotFound,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        // Only the status leaves the server; a hidden question and a missing
        // one must look identical.
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = Error::not_found("Question with ID '7'");
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.to_string(), "Not found: Question with ID '7'");
    }

    #[test]
    fn status_errors_keep_their_status() {
        assert_eq!(
            Error::bad_request("You didn't select a choice.").status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::unauthorized("No admin found").status(),
            Status::Unauthorized
        );
        assert_eq!(
            Error::Status(Status::UnprocessableEntity, "Cannot delete last admin!".into())
                .status(),
            Status::UnprocessableEntity
        );
    }
}
