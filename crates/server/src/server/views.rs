use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::post::Post;
use crate::server::constants::INDEX_TEMPLATE;

/// A rendered page: template name and the context it is rendered with. The
/// HTML itself is produced by the frontend.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub template: &'static str,
    pub context: Map<String, Value>,
}

impl Page {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            context: Map::new(),
        }
    }

    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.context.insert(key.to_string(), value);
        self
    }

    pub fn index(posts: Vec<Post>, username: Option<&str>) -> Self {
        Self::new(INDEX_TEMPLATE)
            .with("posts", posts)
            .with("username", username)
    }

    pub fn form(template: &'static str, error: Option<String>) -> Self {
        let page = Self::new(template);
        match error {
            Some(error) => page.with("error", error),
            None => page,
        }
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
