//! HTTP client for a remote intent classification service.
//!
//! The service receives `{"text": ...}` and answers with
//! `{"distribution": [{"label": ..., "probability": ...}, ...]}`.

use super::{ClassifierError, ClassifierResult, IntentClassifier, LabelDistribution};
use log::{error, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote classifier speaking the JSON distribution protocol.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    /// Creates a classifier for `endpoint` with the default request timeout.
    pub fn new(endpoint: impl Into<String>) -> ClassifierResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> ClassifierResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ClassifierError::InvalidModel(
                "classifier endpoint must not be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClassifierError::Unavailable(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl IntentClassifier for HttpClassifier {
    fn classify(&self, text: &str) -> ClassifierResult<LabelDistribution> {
        let started_at = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text })
            .send()
            .map_err(|err| {
                error!(
                    "event=classify_remote module=classifier status=error duration_ms={} error_code=transport error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                ClassifierError::Unavailable(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "event=classify_remote module=classifier status=error duration_ms={} error_code=http_status http_status={}",
                started_at.elapsed().as_millis(),
                status.as_u16()
            );
            return Err(ClassifierError::Unavailable(format!(
                "classifier service returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: ClassifyResponse = response
            .json()
            .map_err(|err| ClassifierError::Unavailable(format!("invalid response: {err}")))?;

        info!(
            "event=classify_remote module=classifier status=ok duration_ms={} labels={}",
            started_at.elapsed().as_millis(),
            body.distribution.len()
        );

        Ok(body.into_distribution())
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    distribution: Vec<LabelProbability>,
}

#[derive(Deserialize)]
struct LabelProbability {
    label: String,
    probability: f64,
}

impl ClassifyResponse {
    fn into_distribution(self) -> LabelDistribution {
        LabelDistribution::new(
            self.distribution
                .into_iter()
                .map(|entry| (entry.label, entry.probability))
                .collect(),
        )
    }
}
