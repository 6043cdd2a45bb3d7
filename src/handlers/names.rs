use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{AddNameRequest, Envelope, NamesResponse};
use crate::repositories::NamesRepository;

pub const NAME_REQUIRED: &str = "Name is required";

/// `GET /names`
pub async fn list_names(State(state): State<AppState>) -> Result<Json<NamesResponse>> {
    let mut conn = state.provider.acquire().await?;
    let names = state
        .provider
        .run_bounded(NamesRepository::list_names(&mut conn))
        .await?;

    tracing::debug!(count = names.len(), "listed names");
    Ok(Json(NamesResponse { names }))
}

/// `POST /add_name`
///
/// The body is validated before a connection is taken, so a rejected request
/// never touches the table.
pub async fn add_name(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Envelope>)> {
    let body = body.map_err(|rejection| {
        AppError::BodyRejected(rejection.status(), rejection.body_text())
    })?;
    let name = parse_add_name(&body)?;

    let mut conn = state.provider.acquire().await?;
    let record = state
        .provider
        .run_bounded(NamesRepository::insert_name(&mut conn, &name))
        .await?;

    tracing::info!(id = record.id, name = %record.name, "name added");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(format!(
            "Name '{}' added successfully.",
            record.name
        ))),
    ))
}

/// Extract a non-empty `name` from a JSON object body. An empty body reads
/// as `{}`; any other JSON value is malformed.
pub fn parse_add_name(body: &[u8]) -> Result<String> {
    let request: AddNameRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AddNameRequest::default()
    } else {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| AppError::InvalidBody(e.to_string()))?;
        if !value.is_object() {
            return Err(AppError::InvalidBody("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| AppError::InvalidBody(e.to_string()))?
    };

    match request.name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AppError::Validation(NAME_REQUIRED.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rejection(body: &str) -> AppError {
        parse_add_name(body.as_bytes()).expect_err("body should be rejected")
    }

    #[test]
    fn test_valid_name() {
        assert_eq!(parse_add_name(br#"{"name": "alice"}"#).unwrap(), "alice");
    }

    #[test]
    fn test_name_is_kept_verbatim() {
        assert_eq!(parse_add_name(br#"{"name": " Bob "}"#).unwrap(), " Bob ");
        assert_eq!(parse_add_name("{\"name\": \"Zoë\"}".as_bytes()).unwrap(), "Zoë");
    }

    #[test]
    fn test_missing_or_empty_name() {
        for body in ["", "   ", "{}", r#"{"name": null}"#, r#"{"name": ""}"#] {
            match rejection(body) {
                AppError::Validation(msg) => assert_eq!(msg, NAME_REQUIRED),
                other => panic!("body {:?}: expected validation error, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_malformed_body() {
        for body in [
            "{",
            "name=alice",
            r#"{"name": 5}"#,
            r#""alice""#,
            r#"["alice"]"#,
            "[]",
            "null",
        ] {
            assert!(
                matches!(rejection(body), AppError::InvalidBody(_)),
                "body {:?} should be invalid",
                body
            );
        }
    }
}
