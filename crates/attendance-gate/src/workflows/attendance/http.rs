use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{AttendanceBackend, BackendError};
use super::domain::{
    AttendanceRecord, AttendanceSubmission, CheckoutReceipt, CheckoutRequest, EmployeeId,
};
use super::wfh::WfhEligibility;
use crate::workflows::geofence::{Office, OfficeDirectory, OfficeFetchError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// reqwest client for the attendance backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpAttendanceApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    body: T,
}

fn default_success() -> bool {
    true
}

#[derive(Deserialize)]
struct OfficeList {
    #[serde(default)]
    offices: Vec<Office>,
}

#[derive(Deserialize)]
struct TodayRecord {
    #[serde(default)]
    record: Option<AttendanceRecord>,
}

#[derive(Deserialize)]
struct Acknowledgement {}

impl HttpAttendanceApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, BackendError> {
        let raw = format!("{}/{}", self.base_url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|err| BackendError::Unavailable(format!("invalid backend url '{raw}': {err}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope<T>, BackendError> {
        let url = self.url(path, params)?;
        debug!(%url, "attendance backend GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;
        read_envelope(response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let url = self.url(path, &[])?;
        debug!(%url, "attendance backend POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Unavailable(err.to_string()))?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Envelope<Acknowledgement>>(&text)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or(text);
        return Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| BackendError::Malformed(err.to_string()))
}

async fn read_envelope<T: DeserializeOwned>(
    response: Response,
) -> Result<Envelope<T>, BackendError> {
    let status = response.status().as_u16();
    let envelope: Envelope<T> = read_json(response).await?;
    if !envelope.success {
        return Err(BackendError::Rejected {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        });
    }
    Ok(envelope)
}

#[async_trait]
impl AttendanceBackend for HttpAttendanceApi {
    async fn today_attendance(
        &self,
        employee: &EmployeeId,
    ) -> Result<Option<AttendanceRecord>, BackendError> {
        let envelope: Envelope<TodayRecord> = self
            .get("today-attendance", &[("employee_id", employee.0.as_str())])
            .await?;
        Ok(envelope.body.record)
    }

    async fn wfh_eligibility(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<WfhEligibility, BackendError> {
        let date = date.format("%Y-%m-%d").to_string();
        let envelope: Envelope<WfhEligibility> = self
            .get(
                "wfh-eligibility",
                &[("employee_id", employee.0.as_str()), ("date", date.as_str())],
            )
            .await?;
        Ok(envelope.body)
    }

    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), BackendError> {
        let envelope: Envelope<Acknowledgement> =
            self.post("mark-attendance", submission).await?;
        if envelope.success {
            Ok(())
        } else {
            Err(BackendError::Rejected {
                status: 200,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Failed to mark attendance".to_string()),
            })
        }
    }

    async fn check_out(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, BackendError> {
        let receipt: CheckoutReceipt = self.post("check-out", request).await?;
        if receipt.success {
            Ok(receipt)
        } else {
            Err(BackendError::Rejected {
                status: 200,
                message: receipt
                    .message
                    .unwrap_or_else(|| "Failed to record check-out".to_string()),
            })
        }
    }
}

#[async_trait]
impl OfficeDirectory for HttpAttendanceApi {
    async fn fetch_offices(&self, department: &str) -> Result<Vec<Office>, OfficeFetchError> {
        let envelope: Envelope<OfficeList> = self
            .get("offices", &[("active", "1"), ("department", department)])
            .await
            .map_err(|err| match err {
                BackendError::Unavailable(reason) => OfficeFetchError::Unavailable(reason),
                BackendError::Rejected { message, .. } => OfficeFetchError::Rejected(message),
                BackendError::Malformed(reason) => OfficeFetchError::Malformed(reason),
            })?;
        Ok(envelope.body.offices)
    }
}
