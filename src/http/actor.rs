use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::responses::ApiError;
use crate::specimens::Actor;
use crate::workflows::Role;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Identity forwarded by the authentication gateway. Extraction fails with
/// 401 when either header is missing or the role is not one we know.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_ROLE_HEADER} header")))?;
        let role: Role = role
            .parse()
            .map_err(|e| ApiError::Unauthorized(format!("{e}")))?;

        Ok(RequestActor(Actor::new(id, role)))
    }
}
