use std::convert::Infallible;

use serde::Serialize;
use serde_json::json;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::authentication::middleware::Unauthorized;

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn empty_reply(status: StatusCode) -> Response {
    reply::with_status(reply(), status).into_response()
}

fn detail_reply(detail: &str, status: StatusCode) -> Response {
    json_reply(&json!({ "detail": detail }), status)
}

/// Renders a failed request. Server side failures were logged where they
/// happened and are not echoed to the client.
pub fn error_reply(error: potion::Error) -> Response {
    let status =
        StatusCode::from_u16(error.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        return detail_reply("Internal server error", status);
    }

    let detail = error
        .info
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_owned());
    detail_reply(&detail, status)
}

pub fn finish(result: Result<Response, potion::Error>) -> Response {
    result.unwrap_or_else(error_reply)
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.find::<Unauthorized>().is_some() {
        return Ok(detail_reply(
            "Authentication credentials were not provided",
            StatusCode::UNAUTHORIZED,
        ));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(detail_reply(&e.to_string(), StatusCode::BAD_REQUEST));
    }

    if err.find::<warp::reject::InvalidQuery>().is_some() {
        return Ok(detail_reply("Invalid query string", StatusCode::BAD_REQUEST));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(detail_reply("Payload too large", StatusCode::PAYLOAD_TOO_LARGE));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return Ok(detail_reply(
            "Unsupported media type",
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(detail_reply(
            "Method not allowed",
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }

    if err.is_not_found() {
        return Ok(detail_reply("Not found", StatusCode::NOT_FOUND));
    }

    log::error!("> Unhandled rejection: {:?}", err);
    Ok(detail_reply(
        "Internal server error",
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}
