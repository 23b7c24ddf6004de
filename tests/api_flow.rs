//! Router-level tests for photoshare.
//!
//! The full application is assembled over in-memory stores and driven with
//! `tower::ServiceExt::oneshot`, so these tests need no database.

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, Response, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use photoshare::{
    api::{
        self,
        handlers::{
            auth::{AuthConfig, AuthState},
            photos::PhotoConfig,
        },
    },
    seed::{self, ModelData, SEED_PASSWORD},
    store::{Comment, NewComment, NewPhoto, Photo, PhotoStore, StoreError, StoreResult, Stores},
};
use async_trait::async_trait;
use uuid::Uuid;
use serde_json::{Value, json};
use std::{path::Path, sync::Arc};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    stores: Stores,
}

impl TestApp {
    fn new(images_dir: &Path) -> Self {
        Self::with_stores(images_dir, Stores::memory())
    }

    async fn seeded(images_dir: &Path) -> Result<Self> {
        let app = Self::new(images_dir);
        seed::load(&app.stores, &ModelData::bundled()?).await?;
        Ok(app)
    }

    fn with_stores(images_dir: &Path, stores: Stores) -> Self {
        let auth_state = Arc::new(AuthState::new(AuthConfig::new(), stores.sessions.clone()));
        let router = api::app(stores.clone(), auth_state, PhotoConfig::new(images_dir));
        Self { router, stores }
    }

    async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn post_json(&self, uri: &str, body: &Value, cookie: Option<&str>) -> Result<Response<Body>> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(serde_json::to_vec(body)?))?)
            .await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Result<Response<Body>> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty())?).await
    }

    /// Log in and return the `name=value` cookie pair to send back.
    async fn login(&self, login_name: &str, password: &str) -> Result<(String, Value)> {
        let response = self
            .post_json(
                "/admin/login",
                &json!({"login_name": login_name, "password": password}),
                None,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .context("login should set a session cookie")?
            .to_string();
        let body = json_body(response).await?;
        Ok((cookie, body))
    }
}

async fn text_body(response: Response<Body>) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

async fn json_body(response: Response<Body>) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn registration(login_name: &str) -> Value {
    json!({
        "login_name": login_name,
        "password": "correct horse",
        "first_name": "Dana",
        "last_name": "Scully",
        "occupation": "Agent"
    })
}

#[tokio::test]
async fn register_login_logout_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::new(dir.path());

    let response = app.post_json("/user", &registration("scully"), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?, json!({"login_name": "scully"}));

    let (cookie, body) = app.login("scully", "correct horse").await?;
    assert_eq!(body["first_name"], "Dana");
    assert!(body["_id"].is_string());
    assert!(cookie.starts_with("photoshare_session="));

    let response = app.get("/user/list", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let users = json_body(response).await?;
    assert_eq!(users.as_array().map(Vec::len), Some(1));
    assert_eq!(users[0]["last_name"], "Scully");

    let response = app.post_json("/admin/logout", &json!({}), Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(cleared.contains("Max-Age=0"));

    // The same token is rejected once the session is gone.
    let response = app.get("/user/list", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(text_body(response).await?, "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn anonymous_requests_only_reach_allow_listed_operations() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;

    for uri in [
        "/user/list",
        "/test/info",
        "/test/counts",
        "/photosOfUser/00000000-0000-0000-0000-000000000000",
        "/user/00000000-0000-0000-0000-000000000000",
    ] {
        let response = app.get(uri, None).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(text_body(response).await?, "Unauthorized");
    }

    let response = app.post_json("/admin/logout", &json!({}), None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json("/commentsOfPhoto/x", &json!({"comment": "hi"}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Registration and login need no session.
    let response = app.post_json("/user", &registration("mulder"), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    app.login("mulder", "correct horse").await?;

    // Health is public.
    let response = app.get("/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forged_or_unknown_tokens_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;

    let response = app
        .get("/user/list", Some("photoshare_session=not-a-real-token"))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            Request::builder()
                .uri("/test/counts")
                .header("authorization", "Bearer forged")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;

    let unknown = app
        .post_json(
            "/admin/login",
            &json!({"login_name": "nobody", "password": "weak"}),
            None,
        )
        .await?;
    let wrong = app
        .post_json(
            "/admin/login",
            &json!({"login_name": "malcolm", "password": "strong"}),
            None,
        )
        .await?;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), unknown.status());
    assert!(unknown.headers().get(SET_COOKIE).is_none());
    assert!(wrong.headers().get(SET_COOKIE).is_none());

    let unknown = text_body(unknown).await?;
    let wrong = text_body(wrong).await?;
    assert_eq!(unknown, "Invalid login credentials");
    assert_eq!(wrong, unknown);
    Ok(())
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;

    let response = app
        .post_json("/user", &json!({"login_name": "x", "password": "y"}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "Missing required fields");

    // Seeded accounts own their lowercased last names.
    let response = app.post_json("/user", &registration("malcolm"), None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(text_body(response).await?, "Login name already exists");

    let response = app
        .post_json("/admin/login", &json!({"login_name": "malcolm"}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "Missing login name or password");
    Ok(())
}

#[tokio::test]
async fn passwords_are_taken_verbatim() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::new(dir.path());

    let mut body = registration("mulder");
    body["password"] = json!("   ");
    let response = app.post_json("/user", &body, None).await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.login("mulder", "   ").await?;

    let response = app
        .post_json("/admin/login", &json!({"login_name": "mulder", "password": " "}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    body["login_name"] = json!("skinner");
    body["password"] = json!("");
    let response = app.post_json("/user", &body, None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn user_detail_and_photo_streams() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;
    let (cookie, me) = app.login("ripley", SEED_PASSWORD).await?;
    let ripley_id = me["_id"].as_str().context("_id")?.to_string();

    let response = app.get(&format!("/user/{ripley_id}"), Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = json_body(response).await?;
    assert_eq!(detail["occupation"], "Warrant Officer");
    assert!(detail.get("login_name").is_none());
    assert!(detail.get("password_digest").is_none());

    let response = app.get("/user/not-an-id", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "Invalid user ID format");

    let response = app
        .get("/user/00000000-0000-0000-0000-000000000000", Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "User not found");

    let response = app
        .get(&format!("/photosOfUser/{ripley_id}"), Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let photos = json_body(response).await?;
    assert_eq!(photos.as_array().map(Vec::len), Some(2));
    assert_eq!(photos[1]["file_name"], "ripley2.jpg");
    let comment = &photos[1]["comments"][0];
    assert_eq!(comment["comment"], "That is one big cat.");
    assert_eq!(comment["user"]["first_name"], "Ian");
    assert_eq!(comment["user"]["last_name"], "Malcolm");

    let response = app
        .get("/photosOfUser/00000000-0000-0000-0000-000000000000", Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn photo_usage_reports_latest_and_most_commented() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;
    let (cookie, me) = app.login("took", SEED_PASSWORD).await?;
    let took_id = me["_id"].as_str().context("_id")?.to_string();

    let response = app
        .get(&format!("/user/photoUsage/{took_id}"), Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let usage = json_body(response).await?;
    assert_eq!(usage["mostRecentPhoto"]["file_name"], "took1.jpg");
    assert_eq!(usage["photoWithMostComments"]["file_name"], "took1.jpg");
    assert_eq!(usage["photoWithMostComments"]["commentsCount"], 1);

    // A fresh account has no photos yet.
    app.post_json("/user", &registration("skinner"), None).await?;
    let (_, skinner) = app.login("skinner", "correct horse").await?;
    let skinner_id = skinner["_id"].as_str().context("_id")?.to_string();
    let response = app
        .get(&format!("/user/photoUsage/{skinner_id}"), Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn comments_are_authored_by_the_session_user() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;
    let (cookie, me) = app.login("ludgate", SEED_PASSWORD).await?;
    let ludgate_id = me["_id"].as_str().context("_id")?.to_string();

    let photos = json_body(
        app.get(&format!("/photosOfUser/{ludgate_id}"), Some(&cookie))
            .await?,
    )
    .await?;
    let photo_id = photos[0]["_id"].as_str().context("photo _id")?.to_string();

    let uri = format!("/commentsOfPhoto/{photo_id}");
    let response = app.post_json(&uri, &json!({"comment": ""}), Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "Comment cannot be empty");

    let response = app
        .post_json(&uri, &json!({"comment": "Literally the best."}), Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await?, "Comment added successfully");

    let response = app
        .post_json(
            "/commentsOfPhoto/00000000-0000-0000-0000-000000000000",
            &json!({"comment": "hello?"}),
            Some(&cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text_body(response).await?, "Photo not found");

    let photos = json_body(
        app.get(&format!("/photosOfUser/{ludgate_id}"), Some(&cookie))
            .await?,
    )
    .await?;
    let comments = photos[0]["comments"].as_array().context("comments")?;
    let last = comments.last().context("new comment")?;
    assert_eq!(last["comment"], "Literally the best.");
    assert_eq!(last["user"]["_id"], ludgate_id.as_str());
    Ok(())
}

#[tokio::test]
async fn upload_stores_file_and_photo_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;
    let (cookie, me) = app.login("kenobi", SEED_PASSWORD).await?;
    let kenobi_id = me["_id"].as_str().context("_id")?.to_string();

    let boundary = "photoshare-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"uploadedphoto\"; filename=\"jakku sunset.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         not really a jpeg\r\n\
         --{boundary}--\r\n"
    );
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/photos/new")
                .header(COOKIE, &cookie)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await?, "Photo uploaded successfully");

    let photos = json_body(
        app.get(&format!("/photosOfUser/{kenobi_id}"), Some(&cookie))
            .await?,
    )
    .await?;
    let photos = photos.as_array().context("photos")?;
    assert_eq!(photos.len(), 4);
    let file_name = photos[3]["file_name"].as_str().context("file_name")?;
    assert!(file_name.starts_with('U'));
    assert!(file_name.ends_with("jakku_sunset.jpg"));

    let stored = std::fs::read(dir.path().join(file_name))?;
    assert_eq!(stored, b"not really a jpeg");

    // The stored image is served without a session.
    let response = app.get(&format!("/images/{file_name}"), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await?, "not really a jpeg");

    // A body without the expected field is a client error.
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/photos/new")
                .header(COOKIE, &cookie)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(format!("--{boundary}--\r\n")))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "File upload error");
    Ok(())
}

/// Photo store whose inserts always fail; reads go to the wrapped store.
struct FailingInserts(Arc<dyn PhotoStore>);

#[async_trait]
impl PhotoStore for FailingInserts {
    async fn create(&self, _photo: NewPhoto) -> StoreResult<Photo> {
        Err(StoreError::Other(anyhow::anyhow!("insert refused")))
    }

    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Photo>> {
        self.0.find_by_owner(user_id).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Photo>> {
        self.0.find_by_id(id).await
    }

    async fn add_comment(
        &self,
        photo_id: Uuid,
        comment: NewComment,
    ) -> StoreResult<Option<Comment>> {
        self.0.add_comment(photo_id, comment).await
    }

    async fn count(&self) -> StoreResult<i64> {
        self.0.count().await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.0.clear().await
    }
}

#[tokio::test]
async fn failed_photo_insert_removes_written_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut stores = Stores::memory();
    seed::load(&stores, &ModelData::bundled()?).await?;
    stores.photos = Arc::new(FailingInserts(stores.photos.clone()));
    let app = TestApp::with_stores(dir.path(), stores);
    let (cookie, _) = app.login("kenobi", SEED_PASSWORD).await?;

    let boundary = "photoshare-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"uploadedphoto\"; filename=\"x.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n\
         bytes\r\n\
         --{boundary}--\r\n"
    );
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/photos/new")
                .header(COOKIE, &cookie)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text_body(response).await?, "Failed to save photo in database");

    let left: Vec<_> = std::fs::read_dir(dir.path())?.collect::<Result<_, _>>()?;
    assert!(left.is_empty(), "orphaned files: {left:?}");
    Ok(())
}

#[tokio::test]
async fn schema_introspection_requires_session_and_known_param() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::seeded(dir.path()).await?;
    let (cookie, _) = app.login("ousterhout", SEED_PASSWORD).await?;

    let response = app.get("/test/counts", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await?,
        json!({"user": 6, "photo": 11, "schemaInfo": 1})
    );

    let response = app.get("/test/info", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let info = json_body(response).await?;
    assert_eq!(info["version"], "1.0");
    assert!(info["_id"].is_string());

    let response = app.get("/test/bogus", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await?, "Bad param bogus");
    Ok(())
}

#[tokio::test]
async fn missing_schema_info_is_a_server_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::new(dir.path());
    app.post_json("/user", &registration("doggett"), None).await?;
    let (cookie, _) = app.login("doggett", "correct horse").await?;

    let response = app.get("/test/info", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text_body(response).await?, "Missing SchemaInfo");
    Ok(())
}

#[tokio::test]
async fn responses_carry_a_request_id() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let app = TestApp::new(dir.path());

    let response = app.get("/health", None).await?;
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert_eq!(request_id.len(), 26);
    Ok(())
}
