//! API client for communicating with the forecast service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Non-success answer from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
}

/// API client for the forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => ApiError {
                    status,
                    message: parsed.error,
                    code: parsed.code,
                },
                Err(_) => ApiError {
                    status,
                    message: body,
                    code: None,
                },
            };
            return Err(error.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        self.get("health").await
    }

    pub async fn strategies(&self) -> Result<StrategyCatalog> {
        self.get("strategies").await
    }

    pub async fn predict_demand(&self, request: &DemandRequest) -> Result<DemandResponse> {
        self.post("api/demand-forecast/predict", request).await
    }

    pub async fn predict_price(&self, request: &PriceRequest) -> Result<PriceResponse> {
        self.post("api/price-forecast/predict", request).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub demand_strategies: Vec<String>,
    pub price_strategies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySummary {
    pub available: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyCatalog {
    pub demand: StrategySummary,
    pub price: StrategySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRequest {
    pub week: String,
    pub store_id: i64,
    pub sku_id: i64,
    pub base_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    pub is_featured_sku: u8,
    pub is_display_sku: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandResponse {
    pub predicted_units_sold: f64,
    pub record_id: Option<i64>,
    pub strategy_used: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    #[serde(rename = "Store")]
    pub store: u32,
    #[serde(rename = "Dept")]
    pub dept: u32,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "IsHoliday", skip_serializing_if = "Option::is_none")]
    pub is_holiday: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub predicted_weekly_sales: f64,
    pub store: u32,
    pub dept: u32,
    pub date: String,
    pub strategy_used: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "healthy",
                    "demand_strategies": ["lightgbm"],
                    "price_strategies": ["linear", "dnn"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        mock.assert_async().await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.price_strategies, vec!["linear", "dnn"]);
    }

    #[tokio::test]
    async fn test_strategies() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/strategies")
            .with_status(200)
            .with_body(
                json!({
                    "demand": {"available": ["lightgbm"], "default": "lightgbm"},
                    "price": {"available": ["linear", "dnn"], "default": "linear"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let catalog = client.strategies().await.unwrap();

        assert_eq!(catalog.demand.default.as_deref(), Some("lightgbm"));
        assert_eq!(catalog.price.available.len(), 2);
    }

    #[tokio::test]
    async fn test_predict_demand_omits_unset_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/demand-forecast/predict")
            .match_body(Matcher::Json(json!({
                "week": "17/01/11",
                "store_id": 8091,
                "sku_id": 216418,
                "base_price": 111.8625,
                "is_featured_sku": 0,
                "is_display_sku": 1
            })))
            .with_status(200)
            .with_body(
                json!({
                    "predicted_units_sold": 28.5,
                    "record_id": null,
                    "strategy_used": "lightgbm",
                    "status": "success"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client
            .predict_demand(&DemandRequest {
                week: "17/01/11".to_string(),
                store_id: 8091,
                sku_id: 216418,
                base_price: 111.8625,
                total_price: None,
                is_featured_sku: 0,
                is_display_sku: 1,
                strategy: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.predicted_units_sold, 28.5);
        assert!(response.record_id.is_none());
    }

    #[tokio::test]
    async fn test_predict_price_uses_column_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/price-forecast/predict")
            .match_body(Matcher::Json(json!({
                "Store": 1,
                "Dept": 1,
                "Date": "2012-11-02",
                "IsHoliday": false,
                "strategy": "dnn"
            })))
            .with_status(200)
            .with_body(
                json!({
                    "predicted_weekly_sales": 24924.5,
                    "store": 1,
                    "dept": 1,
                    "date": "2012-11-02",
                    "strategy_used": "dnn",
                    "status": "success"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client
            .predict_price(&PriceRequest {
                store: 1,
                dept: 1,
                date: "2012-11-02".to_string(),
                is_holiday: Some(false),
                strategy: Some("dnn".to_string()),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.strategy_used, "dnn");
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/price-forecast/predict")
            .with_status(400)
            .with_body(
                json!({
                    "error": "Strategy 'xgboost' not found. Available: [linear, dnn]",
                    "code": "not_found"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict_price(&PriceRequest {
                store: 1,
                dept: 1,
                date: "2012-11-02".to_string(),
                is_holiday: None,
                strategy: Some("xgboost".to_string()),
            })
            .await
            .unwrap_err();

        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.code.as_deref(), Some("not_found"));
        assert!(api_error.message.contains("Available: [linear, dnn]"));
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err();

        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api_error.message, "bad gateway");
        assert!(api_error.code.is_none());
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
