use super::WebError;
use crate::core::OwnerScope;
use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

/// Header carrying the authenticated caller's storage identity.
pub const IDENTITY_HEADER: &str = "x-identity-id";

const UNAUTHENTICATED_MESSAGE: &str = "User is not authenticated.";

/// Owner scope of the caller, read from [`IDENTITY_HEADER`].
#[derive(Debug, Clone)]
pub struct OwnerIdentity(pub OwnerScope);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerIdentity
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| OwnerScope::parse(value).ok())
            .map(OwnerIdentity)
            .ok_or_else(|| WebError::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string()))
    }
}
