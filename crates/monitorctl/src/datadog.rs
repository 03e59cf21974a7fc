use monitors::batch::{ApiError, LiveMonitor, MonitorApi};
use reqwest::StatusCode;

#[derive(Debug, Clone, clap::Args)]
pub struct DatadogArgs {
    /// Datadog API key.
    #[clap(long, env = "DD_API_KEY", hide_env_values = true)]
    pub api_key: String,
    /// Datadog application key.
    #[clap(long, env = "DD_APP_KEY", hide_env_values = true)]
    pub app_key: String,
    /// Base URL of the Datadog site to use.
    #[clap(long, env = "DD_SITE", default_value = "https://api.datadoghq.com")]
    pub site: url::Url,
}

/// Client of the Datadog v1 monitors API.
#[derive(Clone)]
pub struct Client {
    http_client: reqwest::Client,
    site: url::Url,
    api_key: String,
    app_key: String,
}

impl Client {
    pub fn new(args: &DatadogArgs) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            site: args.site.clone(),
            api_key: args.api_key.clone(),
            app_key: args.app_key.clone(),
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.site.join(path).map_err(other)?;
        tracing::debug!(%method, %url, "sending monitor request");

        let mut builder = self
            .http_client
            .request(method, url)
            .header("DD-API-KEY", &self.api_key)
            .header("DD-APPLICATION-KEY", &self.app_key);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(other)?;
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(other)
        } else {
            let body = response.text().await.map_err(other)?;
            Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound,
                StatusCode::BAD_REQUEST => ApiError::Invalid(body),
                _ => ApiError::Other(format!("{status}: {body}")),
            })
        }
    }
}

fn other<E: std::fmt::Display>(err: E) -> ApiError {
    ApiError::Other(err.to_string())
}

impl MonitorApi for Client {
    async fn fetch(&self, id: i64) -> Result<LiveMonitor, ApiError> {
        let body = self
            .send(reqwest::Method::GET, &format!("api/v1/monitor/{id}"), None)
            .await?;
        LiveMonitor::from_body(body).map_err(other)
    }

    async fn validate<'s>(&'s self, body: &'s serde_json::Value) -> Result<(), ApiError> {
        self.send(reqwest::Method::POST, "api/v1/monitor/validate", Some(body))
            .await
            .map(|_| ())
    }

    async fn update<'s>(&'s self, id: i64, body: &'s serde_json::Value) -> Result<(), ApiError> {
        self.send(
            reqwest::Method::PUT,
            &format!("api/v1/monitor/{id}"),
            Some(body),
        )
        .await
        .map(|_| ())
    }
}
