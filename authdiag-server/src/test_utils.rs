use crate::config::Settings;
use crate::create_app;
use crate::state::tests::create_test_state;
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Test fixture for exercising the whole router against mocked services.
///
/// Two mock servers stand in for the backend (token endpoint and proxied
/// `/auth`, `/api` routes) and for the identity endpoint.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///
///     fixture
///         .add_backend_mock(Method::GET, "/auth/token", json!({"access_token": "abc"}), StatusCode::OK, 1)
///         .await;
///
///     let response = fixture.get_with_headers("/", &[("Cookie", "auth-session=1")]).await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration settings
    pub settings: Settings,
    /// Mock server for the backend
    pub backend_mock: MockServer,
    /// Mock server for the identity endpoint
    pub identity_mock: MockServer,
}

impl TestFixture {
    /// Creates a new test fixture with default test settings.
    pub async fn new() -> Self {
        Self::with_settings(|_| {}).await
    }

    /// Creates a new test fixture, letting the caller adjust the settings
    /// before the application state is built.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let fixture = TestFixture::with_settings(|settings| {
    ///     settings.proxy.enabled = false;
    /// })
    /// .await;
    /// ```
    pub async fn with_settings<F: FnOnce(&mut Settings)>(configure: F) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let backend_mock = MockServer::start().await;
        let identity_mock = MockServer::start().await;

        let mut settings = Settings::for_test_with_mocks(&backend_mock, &identity_mock);
        configure(&mut settings);

        let state = create_test_state(settings.clone());
        let app = create_app(state);

        Self {
            app,
            settings,
            backend_mock,
            identity_mock,
        }
    }

    /// Initializes the test logger; repeated calls are no-ops.
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder().method(method).uri(uri.as_ref())
    }

    /// Sends a GET request to the specified URI.
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    /// Sends a GET request with custom headers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let response = fixture
    ///     .get_with_headers("/A/", &[("Cookie", "auth-session=1"), ("Host", "diag.local")])
    ///     .await;
    /// ```
    pub async fn get_with_headers(
        &self,
        uri: impl AsRef<str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = self.request_builder(Method::GET, uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a POST request with an urlencoded form body and custom headers.
    pub async fn post_form<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        form: &T,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body = serde_urlencoded::to_string(form).expect("Failed to serialize form");
        let mut builder = self
            .request_builder(Method::POST, uri)
            .header("Content-Type", "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and collects the full response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    /// Paths of the requests the backend mock has received, in order.
    pub async fn backend_paths(&self) -> Vec<String> {
        self.backend_mock
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }

    /// Adds a mock backend route with the given method, path, and JSON response.
    pub async fn add_backend_mock(
        &self,
        method: Method,
        path: impl Into<String>,
        response_body: impl Serialize,
        status_code: StatusCode,
        expected_calls: u64,
    ) {
        Mock::given(matchers::method(method.as_str()))
            .and(matchers::path(path.into()))
            .respond_with(ResponseTemplate::new(status_code.as_u16()).set_body_json(response_body))
            .expect(expected_calls)
            .mount(&self.backend_mock)
            .await;
    }
}

/// Response from a test request.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl TestResponse {
    /// Asserts that the response status matches the expected status.
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}. Response body: {}",
            expected, self.status, self.body
        );
    }

    /// Asserts that the response status is 200 OK.
    pub fn assert_ok(&self) {
        self.assert_status(StatusCode::OK);
    }

    /// Asserts that a header is present with the expected value.
    pub fn assert_header(&self, name: &str, expected: &str) {
        let value = self
            .headers
            .get(name)
            .unwrap_or_else(|| panic!("Missing header {}", name));
        assert_eq!(value, expected, "Unexpected value for header {}", name);
    }

    /// All values of a header, in order.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .map(|value| value.to_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Response body is not JSON")
    }

    /// The visible text of an HTML body, with tags stripped and entities decoded.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        let mut in_tag = false;
        for c in self.body.chars() {
            match c {
                '<' => in_tag = true,
                '>' if in_tag => in_tag = false,
                _ if !in_tag => text.push(c),
                _ => {}
            }
        }
        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }
}
