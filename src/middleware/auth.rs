use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, error::AppError, utils::secrets_match};

/// Guards mutating routes with the shared `API_SECRET` bearer token.
///
/// Without a configured secret every guarded route answers 401.
pub async fn require_secret(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_secret.as_deref() else {
        tracing::warn!(
            "API_SECRET is not configured, rejecting {}",
            req.uri().path()
        );
        return Err(AppError::Unauthorized);
    };

    let provided = req.headers().typed_get::<Authorization<Bearer>>();
    match provided {
        Some(auth) if secrets_match(auth.token(), expected) => Ok(next.run(req).await),
        _ => Err(AppError::Unauthorized),
    }
}
