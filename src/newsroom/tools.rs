//! Newsroom tools: `list_business_units`, `list_users`, `get_user`.
//!
//! Each tool is a small handler struct holding the dependencies it was
//! constructed with; nothing is read from process-wide state at call time.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{GatewayConfig, NewsroomSource};
use crate::tool_registry::{
    ParamType, ToolArguments, ToolDefinition, ToolError, ToolHandler, ToolRegistry, ToolResult,
};
use crate::upstream::{join_url, UpstreamClient};

use super::data::NewsroomData;

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Where business units and users come from.
#[derive(Debug, Clone)]
pub enum NewsroomBackend {
    Local(Arc<NewsroomData>),
    Remote { upstream: UpstreamClient, base: String },
}

impl NewsroomBackend {
    async fn business_units(&self) -> anyhow::Result<Value> {
        match self {
            NewsroomBackend::Local(data) => Ok(data.business_units_payload()),
            NewsroomBackend::Remote { upstream, base } => {
                let url = join_url(base, "/newsroom/business-units");
                Ok(upstream.get_json(&url, &[], None).await?)
            }
        }
    }

    async fn users(&self, business_unit_id: Option<i64>) -> anyhow::Result<Value> {
        match self {
            NewsroomBackend::Local(data) => Ok(data.users_payload(business_unit_id)),
            NewsroomBackend::Remote { upstream, base } => {
                let url = join_url(base, "/newsroom/users");
                let query: Vec<(&str, String)> = business_unit_id
                    .map(|id| vec![("business_unit_id", id.to_string())])
                    .unwrap_or_default();
                Ok(upstream.get_json(&url, &query, None).await?)
            }
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

struct ListBusinessUnits {
    backend: NewsroomBackend,
}

#[async_trait]
impl ToolHandler for ListBusinessUnits {
    async fn call(&self, _arguments: ToolArguments) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::from_json(self.backend.business_units().await?))
    }
}

struct ListUsers {
    backend: NewsroomBackend,
}

#[async_trait]
impl ToolHandler for ListUsers {
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<ToolResult> {
        let business_unit_id = arguments.get("business_unit_id").and_then(Value::as_i64);
        Ok(ToolResult::from_json(
            self.backend.users(business_unit_id).await?,
        ))
    }
}

/// Looks up a user record in the external user API.
struct GetUser {
    upstream: UpstreamClient,
    base: String,
    token: Option<String>,
}

#[async_trait]
impl ToolHandler for GetUser {
    async fn call(&self, arguments: ToolArguments) -> anyhow::Result<ToolResult> {
        let app_id = integer_arg(&arguments, "app_id")?;
        let user_id = integer_arg(&arguments, "user_id")?;
        let url = join_url(&self.base, &format!("/api/users/{app_id}/{user_id}"));

        let record = self
            .upstream
            .get_json(&url, &[], self.token.as_deref())
            .await?;
        Ok(ToolResult::from_json(record))
    }
}

fn integer_arg(arguments: &ToolArguments, name: &str) -> anyhow::Result<i64> {
    arguments
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow::anyhow!("argument '{name}' must be an integer"))
}

// ─── Registry Construction ───────────────────────────────────────────────────

/// Build the gateway's tool registry.
///
/// Called once at startup; the result is wrapped in an `Arc` and shared by
/// every transport adapter.
pub fn build_registry(
    config: &GatewayConfig,
    data: Arc<NewsroomData>,
    upstream: UpstreamClient,
) -> Result<ToolRegistry, ToolError> {
    let backend = match config.newsroom_source {
        NewsroomSource::Local => NewsroomBackend::Local(data),
        NewsroomSource::Remote => NewsroomBackend::Remote {
            upstream: upstream.clone(),
            base: config.demo_base.clone(),
        },
    };

    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDefinition::new(
            "list_business_units",
            "List the newsroom business units.",
        ),
        ListBusinessUnits {
            backend: backend.clone(),
        },
    )?;

    registry.register(
        ToolDefinition::new(
            "list_users",
            "List newsroom users, optionally filtered by business unit.",
        )
        .optional(
            "business_unit_id",
            ParamType::Integer,
            "Only return users in this business unit",
        ),
        ListUsers { backend },
    )?;

    registry.register(
        ToolDefinition::new("get_user", "Fetch a user record from the user API.")
            .required("app_id", ParamType::Integer, "Application (organisation) id")
            .required("user_id", ParamType::Integer, "User id"),
        GetUser {
            upstream,
            base: config.apcbo_base.clone(),
            token: config.apcbo_token.clone(),
        },
    )?;

    tracing::info!(
        tools = ?registry.list(),
        source = ?config.newsroom_source,
        "built newsroom tool registry"
    );

    Ok(registry)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_registry::{arguments_from_value, normalize};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream() -> UpstreamClient {
        UpstreamClient::new(Duration::from_secs(2)).unwrap()
    }

    fn local_registry() -> ToolRegistry {
        build_registry(
            &GatewayConfig::default(),
            Arc::new(NewsroomData::seed()),
            upstream(),
        )
        .unwrap()
    }

    fn args(value: Value) -> Option<ToolArguments> {
        arguments_from_value("test", value).unwrap()
    }

    #[test]
    fn test_registry_lists_three_tools_in_order() {
        let registry = local_registry();
        assert_eq!(
            registry.list(),
            vec!["list_business_units", "list_users", "get_user"]
        );
    }

    #[tokio::test]
    async fn test_list_business_units_exact_sequence() {
        let registry = local_registry();
        let result = registry.invoke("list_business_units", None).await.unwrap();
        let value = normalize(result);
        let units: Vec<(i64, &str)> = value["business_units"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| (u["id"].as_i64().unwrap(), u["name"].as_str().unwrap()))
            .collect();
        assert_eq!(units, vec![(1, "Editorial"), (2, "Design"), (3, "Product")]);
    }

    #[tokio::test]
    async fn test_list_users_filter() {
        let registry = local_registry();
        let result = registry
            .invoke("list_users", args(serde_json::json!({"business_unit_id": 2})))
            .await
            .unwrap();
        let value = normalize(result);
        let names: Vec<&str> = value["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Ben Cho"]);
    }

    #[tokio::test]
    async fn test_list_users_unfiltered_returns_all() {
        let registry = local_registry();
        let value = normalize(registry.invoke("list_users", None).await.unwrap());
        assert_eq!(value["users"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_remote_source_forwards_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/newsroom/users"))
            .and(query_param("business_unit_id", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{"id": 103, "name": "Cara Singh"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GatewayConfig {
            newsroom_source: NewsroomSource::Remote,
            demo_base: server.uri(),
            ..GatewayConfig::default()
        };
        let registry =
            build_registry(&config, Arc::new(NewsroomData::seed()), upstream()).unwrap();
        let value = normalize(
            registry
                .invoke("list_users", args(serde_json::json!({"business_unit_id": 3})))
                .await
                .unwrap(),
        );
        assert_eq!(value["users"][0]["id"], 103);
    }

    #[tokio::test]
    async fn test_get_user_sends_bearer_and_returns_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/1/434369"))
            .and(header("authorization", "Bearer tok"))
            .and(header("accept", "*/*"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 434369, "name": "Dana"})),
            )
            .mount(&server)
            .await;

        let config = GatewayConfig {
            apcbo_base: server.uri(),
            apcbo_token: Some("tok".into()),
            ..GatewayConfig::default()
        };
        let registry =
            build_registry(&config, Arc::new(NewsroomData::seed()), upstream()).unwrap();
        let result = registry
            .invoke(
                "get_user",
                args(serde_json::json!({"app_id": 1, "user_id": 434369})),
            )
            .await
            .unwrap();
        assert_eq!(normalize(result), serde_json::json!({"id": 434369, "name": "Dana"}));
    }

    #[tokio::test]
    async fn test_get_user_upstream_failure_is_execution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = GatewayConfig {
            apcbo_base: server.uri(),
            ..GatewayConfig::default()
        };
        let registry =
            build_registry(&config, Arc::new(NewsroomData::seed()), upstream()).unwrap();
        let err = registry
            .invoke("get_user", args(serde_json::json!({"app_id": 1, "user_id": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
        assert!(err.is_upstream_failure());
    }

    #[tokio::test]
    async fn test_get_user_requires_both_ids() {
        let registry = local_registry();
        let err = registry
            .invoke("get_user", args(serde_json::json!({"app_id": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }
}
