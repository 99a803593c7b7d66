use crate::state::AppState;
use authdiag::Credentials;
use axum::{
    extract::State,
    http::{header::COOKIE, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// Health check response
#[derive(Debug)]
pub struct Health {
    status: &'static str,
    details: Option<Value>,
}

impl IntoResponse for Health {
    fn into_response(self) -> Response {
        let mut body = json!({
            "status": self.status
        });

        if let Some(Value::Object(obj)) = self.details {
            for (key, value) in obj {
                body[key] = value;
            }
        }

        Json(body).into_response()
    }
}

async fn health_check() -> Health {
    Health {
        status: "ok",
        details: None,
    }
}

/// Reports which entities the caller's session holds, never their contents.
/// Does not open a session.
async fn status_check(State(state): State<AppState>, headers: HeaderMap) -> Health {
    let credentials = Credentials::from_cookie(headers.get(COOKIE));
    let (token, identity) = match state.sessions.get(&credentials).await {
        Some(session) => (
            session.tokens.token().is_some(),
            session.identity.identity().is_some(),
        ),
        None => (false, false),
    };
    Health {
        status: "ok",
        details: Some(json!({
            "token": token,
            "identity": identity,
        })),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/_authdiag/health", get(health_check))
        .route("/_authdiag/status", get(status_check))
}
