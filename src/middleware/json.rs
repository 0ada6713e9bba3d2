use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::DeskError;

/// Field checks that serde cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), DeskError> {
        Ok(())
    }
}

/// JSON body extractor. Malformed bodies, wrong content types and failed
/// [`Validate`] checks all become `400` responses in the crate's error shape.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = DeskError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| DeskError::Validation(rejection.body_text()))?;
        body.validate()?;
        Ok(Self(body))
    }
}

/// Rejects blank required text.
pub fn require_text(field: &str, value: &str) -> Result<(), DeskError> {
    if value.trim().is_empty() {
        return Err(DeskError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    impl Validate for Named {
        fn validate(&self) -> Result<(), DeskError> {
            require_text("name", &self.name)
        }
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let ValidatedJson(named) = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"ZK-ABC"}"#), &())
            .await
            .unwrap();
        assert_eq!(named.name, "ZK-ABC");
    }

    #[tokio::test]
    async fn malformed_json_is_validation_error() {
        let err = ValidatedJson::<Named>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DeskError::Validation(_)));
    }

    #[tokio::test]
    async fn blank_field_fails_validation() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"  "}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DeskError::Validation(msg) if msg.contains("name")));
    }
}
