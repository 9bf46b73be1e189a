//! In-process test harness: a temp-dir SQLite store behind the real router.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use cfpa_gate::auth::{TokenGenerator, issue_token};
use cfpa_gate::permissions::{replace_user_grants, seed_user_grants};
use cfpa_gate::server::{AppState, create_router};
use cfpa_gate::store::{SqliteStore, Store};
use cfpa_gate::types::{Item, Role, User, VocationalCenter};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    _temp_dir: TempDir,
    pub state: Arc<AppState>,
    router: Router,
}

pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("test.db")).expect("open store");
        store.initialize().expect("initialize schema");

        let state = Arc::new(AppState::new(Arc::new(store)));
        let router = create_router(state.clone());

        Self {
            _temp_dir: temp_dir,
            state,
            router,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    pub fn center(&self, code: &str) -> VocationalCenter {
        let center = VocationalCenter {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Center {code}"),
            is_active: true,
            created_at: Utc::now(),
        };
        self.store().create_center(&center).expect("create center");
        center
    }

    /// Creates a user with seeded grants plus `allow`, and issues a token.
    pub fn user(&self, username: &str, role: Role, center_id: Option<&str>, allow: &[&str]) -> TestUser {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            role,
            center_id: center_id.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store().create_user(&user).expect("create user");
        seed_user_grants(self.store(), &self.state.registry, &user).expect("seed grants");

        if !allow.is_empty() {
            let mut desired: BTreeMap<String, bool> = self
                .store()
                .list_user_grants(&user.id)
                .expect("list grants")
                .into_iter()
                .map(|g| (g.permission_key, g.allowed))
                .collect();
            for key in allow {
                desired.insert((*key).to_string(), true);
            }
            replace_user_grants(self.store(), &self.state.registry, &user.id, &desired)
                .expect("grant permissions");
        }

        let (_, token) =
            issue_token(self.store(), &TokenGenerator::new(), &user.id, None).expect("issue token");
        TestUser { user, token }
    }

    pub fn item(&self, name: &str, center_id: Option<&str>) -> Item {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            center_id: center_id.map(str::to_string),
            name: name.to_string(),
            quantity: 1.0,
            unit: "kg".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store().create_item(&item).expect("create item");
        item
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }
}
