//! Caller identity supplied by the upstream authentication layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, read from `x-user-id` and `x-user-role`.
///
/// A missing or malformed user id is rejected with 401. A missing role
/// means `customer`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Actor);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id: UserId = header(parts, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

        let role = match header(parts, USER_ROLE_HEADER) {
            None | Some("") => Role::default(),
            Some(value) => value
                .to_ascii_lowercase()
                .parse()
                .map_err(|e: domain::UnknownRole| ApiError::Unauthorized(e.to_string()))?,
        };

        Ok(CurrentUser(Actor { user_id, role }))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}
