use crate::api::page::page_url;
use crate::errors::ApiError;
use crate::state::AppState;
use authdiag::Credentials;
use axum::{
    extract::{OriginalUri, State},
    http::{header::COOKIE, HeaderMap},
    response::Redirect,
    Form,
};
use log::{debug, warn};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GetTokenForm {
    /// Page to return to once the token has been fetched
    pub redirect: Option<String>,
}

/// The `getToken()` button: fetches a fresh token with the browser's
/// credentials and sends the browser back to the page it came from.
pub(super) async fn get_token(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(form): Form<GetTokenForm>,
) -> Result<Redirect, ApiError> {
    let target = redirect_target(
        form.redirect.as_deref(),
        &page_url(&headers, &uri),
        &state.settings.base_path(),
    )?;

    // Opening a session fetches its first token; an open one fetches again
    let credentials = Credentials::from_cookie(headers.get(COOKIE));
    let (session, fresh) = state.sessions.open(credentials).await;
    let token = if fresh {
        session.tokens.token()
    } else {
        session.tokens.get_token().await
    };
    match token {
        Some(_) => debug!("Token refreshed"),
        None => warn!("Token request returned no token"),
    }

    Ok(Redirect::to(&target))
}

/// Resolves the redirect parameter to a path on this server. Targets on
/// other hosts are rejected.
fn redirect_target(
    redirect: Option<&str>,
    request_url: &str,
    base_path: &str,
) -> Result<String, ApiError> {
    let redirect = match redirect.map(str::trim) {
        Some(redirect) if !redirect.is_empty() => redirect,
        _ => return Ok(format!("{}/", base_path)),
    };

    let current = Url::parse(request_url)
        .map_err(|e| ApiError::bad_request(format!("Invalid request URL: {}", e)))?;
    let target = current
        .join(redirect)
        .map_err(|e| ApiError::bad_request(format!("Invalid redirect target: {}", e)))?;

    if target.origin() != current.origin() {
        return Err(ApiError::bad_request(format!(
            "Redirect target must be on this server: {}",
            redirect
        )));
    }

    Ok(match target.query() {
        Some(query) => format!("{}?{}", target.path(), query),
        None => target.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestFixture;
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::{matchers, Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_get_token_refetches_and_redirects() {
        let fixture = TestFixture::new().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/auth/token"))
            .and(matchers::header("Cookie", "auth-session=one"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "abc"})))
            .expect(3)
            .mount(&fixture.backend_mock)
            .await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1.0/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "123"})))
            .mount(&fixture.identity_mock)
            .await;

        // First render fetches, each button press fetches again
        let response = fixture
            .get_with_headers("/A/", &[("Cookie", "auth-session=one"), ("Host", "diag.local")])
            .await;
        response.assert_ok();

        for _ in 0..2 {
            let response = fixture
                .post_form(
                    "/_authdiag/get_token",
                    &[("redirect", "http://diag.local/A/?tab=id")],
                    &[("Cookie", "auth-session=one"), ("Host", "diag.local")],
                )
                .await;
            response.assert_status(StatusCode::SEE_OTHER);
            response.assert_header("location", "/A/?tab=id");
        }

        fixture.backend_mock.verify().await;
    }

    #[tokio::test]
    async fn test_get_token_refreshes_only_own_session() {
        let fixture = TestFixture::new().await;
        for (cookie, calls) in [("auth-session=one", 1), ("auth-session=two", 2)] {
            Mock::given(matchers::method("GET"))
                .and(matchers::path("/auth/token"))
                .and(matchers::header("Cookie", cookie))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": cookie})))
                .expect(calls)
                .mount(&fixture.backend_mock)
                .await;
        }

        for cookie in ["auth-session=one", "auth-session=two"] {
            fixture.get_with_headers("/", &[("Cookie", cookie)]).await.assert_ok();
        }
        let response = fixture
            .post_form(
                "/_authdiag/get_token",
                &[("redirect", "/")],
                &[("Cookie", "auth-session=two")],
            )
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        fixture.backend_mock.verify().await;
    }

    #[tokio::test]
    async fn test_get_token_rejects_foreign_redirect() {
        let fixture = TestFixture::new().await;
        fixture
            .add_backend_mock(
                axum::http::Method::GET,
                "/auth/token",
                json!({"access_token": "abc"}),
                StatusCode::OK,
                0,
            )
            .await;

        let response = fixture
            .post_form(
                "/_authdiag/get_token",
                &[("redirect", "https://evil.example.com/")],
                &[("Cookie", "auth-session=one"), ("Host", "diag.local")],
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json()["detail"]
            .as_str()
            .unwrap()
            .contains("must be on this server"));

        fixture.backend_mock.verify().await;
    }

    #[tokio::test]
    async fn test_get_token_without_redirect_goes_home() {
        let fixture = TestFixture::with_settings(|settings| {
            settings.public_url = "/diag".to_string();
        })
        .await;
        fixture
            .add_backend_mock(
                axum::http::Method::GET,
                "/auth/token",
                json!({"access_token": "abc"}),
                StatusCode::OK,
                1,
            )
            .await;

        let response = fixture
            .post_form(
                "/_authdiag/get_token",
                &Vec::<(&str, &str)>::new(),
                &[("Cookie", "auth-session=one")],
            )
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.assert_header("location", "/diag/");

        fixture.backend_mock.verify().await;
    }

    #[test]
    fn test_redirect_target() {
        let current = "http://localhost:3000/_authdiag/get_token";
        assert_eq!(redirect_target(None, current, "").unwrap(), "/");
        assert_eq!(redirect_target(Some("  "), current, "/app").unwrap(), "/app/");
        assert_eq!(redirect_target(Some("/B/?x=1"), current, "").unwrap(), "/B/?x=1");
        assert_eq!(
            redirect_target(Some("http://localhost:3000/C/"), current, "").unwrap(),
            "/C/"
        );
        assert!(redirect_target(Some("//evil.example.com/"), current, "").is_err());
        assert!(redirect_target(Some("http://localhost:4000/"), current, "").is_err());
    }
}
