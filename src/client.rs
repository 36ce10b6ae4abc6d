use async_trait::async_trait;
use log::{debug, info};
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::config::DateRange;
use crate::model::{BillsDocument, ReadingsDocument};

/// Errors surfaced while loading dashboard data. The `Display` text is what
/// the user sees.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The API token contains characters not allowed in a header.
    #[error("API token is not a valid header value")]
    InvalidToken(#[from] header::InvalidHeaderValue),

    /// The API answered with a non-2xx status.
    #[error("Error {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Network failure, timeout, or an undecodable body.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    pub fn from_status(status: StatusCode) -> Self {
        FetchError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

/// Source of the two documents the dashboard is built from.
#[async_trait]
pub trait EnergyApi {
    async fn fetch_readings(&self, range: &DateRange) -> Result<ReadingsDocument, FetchError>;
    async fn fetch_bills(&self, range: &DateRange) -> Result<BillsDocument, FetchError>;
}

/// Both documents from one load. Either both are present or the load failed.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub readings: ReadingsDocument,
    pub bills: BillsDocument,
}

/// Fetch readings and bills concurrently. The first failure wins and the
/// other request is dropped, so no partial snapshot is ever returned.
pub async fn load_snapshot<A>(api: &A, range: &DateRange) -> Result<Snapshot, FetchError>
where
    A: EnergyApi + ?Sized,
{
    let (readings, bills) = tokio::try_join!(api.fetch_readings(range), api.fetch_bills(range))?;
    info!(
        "Loaded {} bill(s) and {} meter(s) of readings",
        bills.data.len(),
        readings.data.len()
    );
    Ok(Snapshot { readings, bills })
}

/// [`EnergyApi`] backed by the Snapmeter public REST API.
pub struct SnapmeterClient {
    client: Client,
    base_url: String,
    meter_id: String,
    service_id: String,
}

impl SnapmeterClient {
    /// Build a client that sends `token` verbatim in the `Authorization`
    /// header of every request. The header is marked sensitive.
    pub fn new(
        base_url: &str,
        meter_id: &str,
        service_id: &str,
        token: &SecretString,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut auth = header::HeaderValue::from_str(token.expose_secret())?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            meter_id: meter_id.to_string(),
            service_id: service_id.to_string(),
        })
    }

    pub fn readings_url(&self) -> String {
        format!("{}/meters/{}/readings", self.base_url, self.meter_id)
    }

    pub fn bills_url(&self) -> String {
        format!("{}/services/{}/bills", self.base_url, self.service_id)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        range: &DateRange,
    ) -> Result<T, FetchError> {
        info!("GET {} ({} to {})", url, range.start, range.end);
        let response = self.client.get(url).query(&range.query()).send().await?;

        let status = response.status();
        debug!("{} answered {}", url, status);
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl EnergyApi for SnapmeterClient {
    async fn fetch_readings(&self, range: &DateRange) -> Result<ReadingsDocument, FetchError> {
        self.get_json(&self.readings_url(), range).await
    }

    async fn fetch_bills(&self, range: &DateRange) -> Result<BillsDocument, FetchError> {
        self.get_json(&self.bills_url(), range).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeterAttributes, MeterReadings, ReadingSeries};
    use chrono::NaiveDate;

    enum Outcome {
        Ok,
        Fail(StatusCode),
        Hang,
    }

    struct FakeApi {
        readings: Outcome,
        bills: Outcome,
    }

    impl FakeApi {
        async fn settle(outcome: &Outcome) -> Result<(), FetchError> {
            match outcome {
                Outcome::Ok => Ok(()),
                Outcome::Fail(status) => Err(FetchError::from_status(*status)),
                Outcome::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl EnergyApi for FakeApi {
        async fn fetch_readings(&self, _range: &DateRange) -> Result<ReadingsDocument, FetchError> {
            Self::settle(&self.readings).await?;
            Ok(ReadingsDocument {
                data: vec![MeterReadings {
                    attributes: MeterAttributes {
                        readings: ReadingSeries::default(),
                    },
                }],
            })
        }

        async fn fetch_bills(&self, _range: &DateRange) -> Result<BillsDocument, FetchError> {
            Self::settle(&self.bills).await?;
            Ok(BillsDocument::default())
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn both_succeed() {
        let api = FakeApi {
            readings: Outcome::Ok,
            bills: Outcome::Ok,
        };
        let snapshot = load_snapshot(&api, &range()).await.unwrap();
        assert_eq!(snapshot.readings.data.len(), 1);
        assert!(snapshot.bills.data.is_empty());
    }

    #[tokio::test]
    async fn readings_failure_short_circuits_pending_bills() {
        let api = FakeApi {
            readings: Outcome::Fail(StatusCode::UNAUTHORIZED),
            bills: Outcome::Hang,
        };
        let err = load_snapshot(&api, &range()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error 401: Unauthorized");
    }

    #[tokio::test]
    async fn bills_failure_fails_whole_load() {
        let api = FakeApi {
            readings: Outcome::Hang,
            bills: Outcome::Fail(StatusCode::INTERNAL_SERVER_ERROR),
        };
        let err = load_snapshot(&api, &range()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let api: Box<dyn EnergyApi + Send + Sync> = Box::new(FakeApi {
            readings: Outcome::Ok,
            bills: Outcome::Fail(StatusCode::NOT_FOUND),
        });
        let err = load_snapshot(api.as_ref(), &range()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error 404: Not Found");
    }

    #[test]
    fn status_message() {
        let err = FetchError::from_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Error 503: Service Unavailable");
    }

    #[test]
    fn endpoint_urls() {
        let token = SecretString::new("abc-123".into());
        let client = SnapmeterClient::new(
            "https://snapmeter.com/api/public/",
            "2080448990211",
            "2080448990210",
            &token,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.readings_url(),
            "https://snapmeter.com/api/public/meters/2080448990211/readings"
        );
        assert_eq!(
            client.bills_url(),
            "https://snapmeter.com/api/public/services/2080448990210/bills"
        );
    }

    #[test]
    fn invalid_token_rejected() {
        let token = SecretString::new("bad\ntoken".into());
        let result = SnapmeterClient::new("http://localhost", "1", "2", &token, Duration::from_secs(1));
        assert!(matches!(result, Err(FetchError::InvalidToken(_))));
    }
}
