//! Request extractors that answer with the JSON error envelope.
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies and
//! a 422 for undecodable JSON. These wrappers delegate to them and convert
//! the rejection into a [`ServiceError`].

use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;

/// JSON request body
#[derive(Debug, Clone, Copy, Default)]
pub struct AppJson<T>(pub T);

/// Query string parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct AppQuery<T>(pub T);

/// Path segments
#[derive(Debug, Clone, Copy, Default)]
pub struct AppPath<T>(pub T);

fn rejected(part: &'static str, status: StatusCode, reason: String) -> ServiceError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(reason)
    } else if status.is_server_error() {
        ServiceError::InternalError(reason)
    } else {
        ServiceError::MalformedRequest { part, reason }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        rejected("body", rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        rejected("query", rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        rejected("path", rejection.status(), rejection.body_text())
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request as HttpRequest},
        response::IntoResponse,
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Color {
        Red,
    }

    #[derive(Debug, Deserialize)]
    struct Paint {
        #[allow(dead_code)]
        color: Color,
    }

    #[derive(Debug, Deserialize)]
    struct Paging {
        #[allow(dead_code)]
        page: u64,
    }

    async fn paint(AppJson(_): AppJson<Paint>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn paging(AppQuery(_): AppQuery<Paging>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn by_id(AppPath(_): AppPath<uuid::Uuid>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    fn router() -> Router {
        Router::new()
            .route("/paint", post(paint))
            .route("/paging", get(paging))
            .route("/things/:id", get(by_id))
    }

    async fn body_of(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_enum_variant_is_a_bad_request() {
        let response = router()
            .oneshot(
                HttpRequest::post("/paint")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"color":"blue"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(response).await;
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["details"]["part"], "body");
        assert!(body["details"]["reason"]
            .as_str()
            .unwrap()
            .contains("unknown variant"));
    }

    #[tokio::test]
    async fn malformed_query_and_path_are_bad_requests() {
        let response = router()
            .oneshot(HttpRequest::get("/paging?page=-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await["details"]["part"], "query");

        let response = router()
            .oneshot(HttpRequest::get("/things/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await["details"]["part"], "path");
    }

    #[test]
    fn oversized_bodies_keep_their_status() {
        let err = rejected("body", StatusCode::PAYLOAD_TOO_LARGE, "too big".into());
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
