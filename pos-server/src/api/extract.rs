//! Actor extractor
//!
//! 身份认证由前置网关完成，这里只读取网关注入的头部并组装 [`Actor`]。

use axum::extract::FromRequestParts;
use http::request::Parts;
use shared::error::AppError;
use shared::models::{Actor, Role};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// 当前操作人
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(id) = header(parts, ACTOR_ID_HEADER) else {
            tracing::warn!(target: "security", uri = %parts.uri, "Request without actor id");
            return Err(AppError::invalid_request("missing X-Actor-Id header"));
        };
        let role: Role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::invalid_request("missing X-Actor-Role header"))?
            .parse()
            .map_err(AppError::invalid_request)?;

        let mut actor = Actor::new(id, role);
        if let Some(name) = header(parts, ACTOR_NAME_HEADER) {
            actor = actor.with_name(name);
        }
        Ok(CurrentActor(actor))
    }
}
