use std::convert::Infallible;

use serde::Serialize;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge},
    reply::{self, Reply, Response},
    Rejection,
};

use crate::middleware::Unauthorized;

#[derive(Serialize)]
struct ErrorBody<'a> {
    errors: &'a str,
}

fn error_reply(status: StatusCode, info: &str) -> Response {
    reply::with_status(reply::json(&ErrorBody { errors: info }), status).into_response()
}

pub fn error(error: potion::Error) -> Response {
    let status =
        StatusCode::from_u16(error.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let info = error.info.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    if status.is_server_error() {
        log::error!("> {} {}", status.as_u16(), info);
    }

    error_reply(status, &info)
}

pub fn json<T: Serialize>(result: Result<T, potion::Error>, status: StatusCode) -> Response {
    match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(e) => error(e),
    }
}

pub fn no_content(result: Result<(), potion::Error>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error(e),
    }
}

/// Turns rejections left over after routing into the same JSON error body.
pub async fn recover(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, info) = if rejection.find::<Unauthorized>().is_some() {
        (
            StatusCode::UNAUTHORIZED,
            String::from("Authentication credentials were not provided"),
        )
    } else if let Some(e) = rejection.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = rejection.find::<InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            String::from("Payload too large"),
        )
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed"),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else {
        log::error!("> Unhandled rejection: {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
        )
    };

    Ok(error_reply(status, &info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn api_errors_keep_their_status() {
        let response = error(ApiError::not_found("No recipe exists with specified id").into());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = error(ApiError::forbidden().into());
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn empty_success_is_no_content() {
        assert_eq!(no_content(Ok(())).status(), StatusCode::NO_CONTENT);
        assert_eq!(
            no_content(Err(ApiError::validation("Recipe is not in favorites").into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
