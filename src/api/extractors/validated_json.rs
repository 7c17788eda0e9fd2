//! JSON body extractor that runs `validator` rules before the handler.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// Request body that deserialized and passed its validation rules.
///
/// Unparseable bodies (bad JSON, unknown enum values such as an action other
/// than `start`/`stop`, wrong content type) and failed rules are both `400`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        payload
            .validate()
            .map_err(|errors| AppError::validation(describe(&errors)))?;

        Ok(Self(payload))
    }
}

/// One message per failed rule, ordered by field name.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    let mut messages = Vec::new();
    for (field, failures) in fields {
        for failure in failures {
            messages.push(match &failure.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            });
        }
    }
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Login {
        #[validate(length(min = 1, message = "Username is required"))]
        username: String,
        #[validate(length(min = 8))]
        password: String,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let req = json_request(r#"{"username": "bob", "password": "long-enough"}"#);
        let ValidatedJson(login) = ValidatedJson::<Login>::from_request(req, &()).await.unwrap();
        assert_eq!(login.username, "bob");
    }

    #[tokio::test]
    async fn test_messages_are_ordered_by_field() {
        let req = json_request(r#"{"username": "", "password": "short"}"#);
        let err = ValidatedJson::<Login>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "password is invalid, Username is required");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let err = ValidatedJson::<Login>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
