// # Azure Load Balancer Client
//
// This crate provides the Azure Resource Manager implementation of
// `LoadBalancerClient` for lbsync.
//
// ## Behavior
//
// - One HTTP request per trait call; no retry, no backoff, no caching
// - HTTP timeout configured (30 seconds)
// - GET 404 is reported as "not found", not as an error
// - DELETE 404 is treated as already deleted
// - 401/403 map to authentication errors, 429 and 5xx to provider errors
//   carrying the operation, resource group and name
//
// ## Security
//
// - The access token never appears in logs or `Debug` output
// - An empty token is rejected at construction
//
// ## API Reference
//
// - Load Balancers REST API, api-version 2016-09-01
// - `GET|PUT|DELETE /subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/loadBalancers/{name}`

use async_trait::async_trait;
use lbsync_core::config::ProviderConfig;
use lbsync_core::model::LoadBalancer;
use lbsync_core::resource_id::{LOAD_BALANCERS, NETWORK_NAMESPACE};
use lbsync_core::{ClientRegistry, Error, LoadBalancerClient, LoadBalancerClientFactory, Result};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Azure Resource Manager endpoint
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Network API version the wire model is written against
pub const DEFAULT_API_VERSION: &str = "2016-09-01";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for load balancers in one Azure subscription
///
/// Stateless apart from the connection pool; every call goes to the remote.
pub struct AzureLoadBalancerClient {
    subscription_id: String,

    /// OAuth bearer token
    /// ⚠️ NEVER log this value
    access_token: String,

    endpoint: Url,
    api_version: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for AzureLoadBalancerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureLoadBalancerClient")
            .field("subscription_id", &self.subscription_id)
            .field("access_token", &"<REDACTED>")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Error envelope returned by Resource Manager
#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    error: ArmError,
}

#[derive(Debug, Deserialize)]
struct ArmError {
    code: String,
    message: String,
}

impl AzureLoadBalancerClient {
    /// Create a client
    ///
    /// `endpoint` and `api_version` fall back to [`DEFAULT_ENDPOINT`] and
    /// [`DEFAULT_API_VERSION`].
    pub fn new(
        subscription_id: impl Into<String>,
        access_token: impl Into<String>,
        endpoint: Option<&str>,
        api_version: Option<&str>,
    ) -> Result<Self> {
        let subscription_id = subscription_id.into();
        let access_token = access_token.into();

        if subscription_id.is_empty() {
            return Err(Error::config("Azure subscription ID cannot be empty"));
        }
        if access_token.is_empty() {
            return Err(Error::config("Azure access token cannot be empty"));
        }

        let raw_endpoint = endpoint.unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw_endpoint)
            .map_err(|e| Error::config(format!("Invalid Azure endpoint {}: {}", raw_endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::config(format!("Invalid Azure endpoint {}", raw_endpoint)));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            subscription_id,
            access_token,
            endpoint,
            api_version: api_version.unwrap_or(DEFAULT_API_VERSION).to_string(),
            client,
        })
    }

    /// URL of one load balancer
    fn url(&self, scope: &str, name: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourceGroups",
                scope,
                "providers",
                NETWORK_NAMESPACE,
                LOAD_BALANCERS,
                name,
            ]);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        url
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        scope: &str,
        name: &str,
        body: Option<&LoadBalancer>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method, self.url(scope, name))
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| Error::provider(operation, scope, name, format!("HTTP request failed: {}", e)))
    }

    /// Decode a successful response body
    async fn decode(
        operation: &'static str,
        scope: &str,
        name: &str,
        response: reqwest::Response,
    ) -> Result<LoadBalancer> {
        let text = response
            .text()
            .await
            .map_err(|e| Error::provider(operation, scope, name, format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            Error::malformed(format!(
                "{} of load balancer {} (resource group {}): {}",
                operation, name, scope, e
            ))
        })
    }
}

/// Map a non-success status to an error
async fn status_error(
    operation: &'static str,
    scope: &str,
    name: &str,
    response: reqwest::Response,
) -> Error {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    let detail = match serde_json::from_str::<ArmErrorBody>(&text) {
        Ok(body) => format!("{}: {}", body.error.code, body.error.message),
        Err(_) => text,
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(format!(
            "{} of load balancer {} (resource group {}) rejected with status {}",
            operation, name, scope, status
        )),
        StatusCode::TOO_MANY_REQUESTS => Error::provider(
            operation,
            scope,
            name,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        s if s.is_server_error() => Error::provider(
            operation,
            scope,
            name,
            format!("Azure server error (transient): {} - {}", status, detail),
        ),
        _ => Error::provider(
            operation,
            scope,
            name,
            format!("Unexpected status {} - {}", status, detail),
        ),
    }
}

#[async_trait]
impl LoadBalancerClient for AzureLoadBalancerClient {
    async fn get(&self, scope: &str, name: &str) -> Result<Option<LoadBalancer>> {
        tracing::debug!("GET load balancer {}/{}", scope, name);

        let response = self.send("get", Method::GET, scope, name, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Self::decode("get", scope, name, response).await.map(Some),
            _ => Err(status_error("get", scope, name, response).await),
        }
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        model: &LoadBalancer,
    ) -> Result<LoadBalancer> {
        tracing::info!("PUT load balancer {}/{}", scope, name);

        let response = self
            .send("create_or_update", Method::PUT, scope, name, Some(model))
            .await?;
        if !response.status().is_success() {
            return Err(status_error("create_or_update", scope, name, response).await);
        }
        Self::decode("create_or_update", scope, name, response).await
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<()> {
        tracing::info!("DELETE load balancer {}/{}", scope, name);

        let response = self.send("delete", Method::DELETE, scope, name, None).await?;
        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => {
                tracing::debug!("Load balancer {}/{} already deleted", scope, name);
                Ok(())
            }
            _ => Err(status_error("delete", scope, name, response).await),
        }
    }

    fn provider_name(&self) -> &'static str {
        "azure"
    }
}

/// Factory for creating Azure clients
pub struct AzureClientFactory;

impl LoadBalancerClientFactory for AzureClientFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn LoadBalancerClient>> {
        match config {
            ProviderConfig::Azure {
                subscription_id,
                access_token,
                endpoint,
                api_version,
            } => Ok(Box::new(AzureLoadBalancerClient::new(
                subscription_id.clone(),
                access_token.clone(),
                endpoint.as_deref(),
                api_version.as_deref(),
            )?)),
            _ => Err(Error::config("Invalid config for Azure provider")),
        }
    }
}

/// Register the Azure client with a registry
///
/// # Example
///
/// ```rust
/// use lbsync_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// lbsync_provider_azure::register(&registry);
/// assert!(registry.has_client("azure"));
/// ```
pub fn register(registry: &ClientRegistry) {
    registry.register_client("azure", Box::new(AzureClientFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbsync_core::model::LoadBalancerProperties;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LB_PATH: &str =
        "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Network/loadBalancers/lb-web";

    fn client(server: &MockServer) -> AzureLoadBalancerClient {
        AzureLoadBalancerClient::new("sub-1", "secret-token", Some(&server.uri()), None).unwrap()
    }

    fn remote_body(state: &str) -> serde_json::Value {
        json!({
            "id": LB_PATH,
            "name": "lb-web",
            "location": "westus",
            "etag": "W/\"abc\"",
            "properties": {
                "provisioningState": state,
                "backendAddressPools": [{ "name": "web" }]
            }
        })
    }

    #[tokio::test]
    async fn get_sends_token_and_api_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LB_PATH))
            .and(query_param("api-version", DEFAULT_API_VERSION))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(remote_body("Updating")))
            .expect(1)
            .mount(&server)
            .await;

        let remote = client(&server).get("rg-prod", "lb-web").await.unwrap().unwrap();

        assert_eq!(remote.id.as_deref(), Some(LB_PATH));
        assert_eq!(remote.etag.as_deref(), Some("W/\"abc\""));
        assert_eq!(remote.provisioning_state(), Some("Updating"));
    }

    #[tokio::test]
    async fn get_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LB_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ResourceNotFound", "message": "gone" }
            })))
            .mount(&server)
            .await;

        assert!(client(&server).get("rg-prod", "lb-web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_sends_expanded_model() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(LB_PATH))
            .and(body_partial_json(json!({
                "name": "lb-web",
                "location": "westus",
                "tags": { "env": "prod" },
                "properties": { "backendAddressPools": [{ "name": "web" }] }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(remote_body("Updating")))
            .expect(1)
            .mount(&server)
            .await;

        let model = LoadBalancer {
            name: Some("lb-web".into()),
            location: Some("westus".into()),
            tags: Some([("env".to_string(), "prod".to_string())].into()),
            properties: Some(LoadBalancerProperties {
                backend_address_pools: Some(vec![lbsync_core::model::BackendAddressPool {
                    name: Some("web".into()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let stored = client(&server)
            .create_or_update("rg-prod", "lb-web", &model)
            .await
            .unwrap();
        assert_eq!(stored.id.as_deref(), Some(LB_PATH));
    }

    #[tokio::test]
    async fn delete_accepts_success_and_not_found() {
        for status in [200, 202, 204, 404] {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path(LB_PATH))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            assert!(
                client(&server).delete("rg-prod", "lb-web").await.is_ok(),
                "status {}",
                status
            );
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).get("rg-prod", "lb-web").await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)), "{:?}", err);
        assert!(!err.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn rate_limit_carries_context() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_or_update("rg-prod", "lb-web", &LoadBalancer::default())
            .await
            .unwrap_err();

        match err {
            Error::Provider {
                operation,
                scope,
                name,
                message,
            } => {
                assert_eq!(operation, "create_or_update");
                assert_eq!(scope, "rg-prod");
                assert_eq!(name, "lb-web");
                assert!(message.contains("Rate limit"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn server_error_includes_arm_detail() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": "ServiceUnavailable", "message": "try later" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).delete("rg-prod", "lb-web").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("ServiceUnavailable: try later"), "{}", text);
        assert!(text.contains("503"));
    }

    #[tokio::test]
    async fn unparsable_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).get("rg-prod", "lb-web").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "{:?}", err);
    }

    #[test]
    fn url_layout() {
        let client = AzureLoadBalancerClient::new("sub-1", "t", None, Some("2017-03-01")).unwrap();
        assert_eq!(
            client.url("rg-prod", "lb-web").as_str(),
            format!("{}{}?api-version=2017-03-01", DEFAULT_ENDPOINT, LB_PATH)
        );
    }

    #[test]
    fn access_token_not_exposed_in_debug() {
        let client = AzureLoadBalancerClient::new("sub-1", "secret_token_12345", None, None).unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("AzureLoadBalancerClient"));
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = AzureLoadBalancerClient::new("sub-1", "", None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn factory_requires_azure_config() {
        let factory = AzureClientFactory;

        let config = ProviderConfig::Azure {
            subscription_id: "sub-1".into(),
            access_token: "token".into(),
            endpoint: None,
            api_version: None,
        };
        assert_eq!(factory.create(&config).unwrap().provider_name(), "azure");

        let custom = ProviderConfig::Custom {
            factory: "other".into(),
            config: json!({}),
        };
        assert!(factory.create(&custom).is_err());
    }

    #[test]
    fn register_adds_azure() {
        let registry = ClientRegistry::new();
        register(&registry);
        assert_eq!(registry.list_clients(), vec!["azure".to_string()]);
    }
}
