//! ============================================================================
//! PII Detection - Personal information via Azure AI Language
//! ============================================================================
//! Sends the query to the PII entity recognition endpoint and reports it
//! as triggered when any entity comes back. Service failures are returned
//! as errors; the gate resolves them with the check's error policy.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SecurityCategory, SecurityCheck, ServiceErrorPolicy};
use crate::error::{QaError, Result};

const API_VERSION: &str = "2023-04-01";

/// An entity reported by the NER service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiiEntity {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub confidence_score: f64,
}

#[async_trait]
pub trait PiiDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Vec<PiiEntity>>;
}

/// Azure `language/:analyze-text` client
pub struct AzurePiiDetector {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    language: String,
}

impl AzurePiiDetector {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        language: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QaError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
            api_key,
            language,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

#[async_trait]
impl PiiDetector for AzurePiiDetector {
    async fn detect(&self, text: &str) -> Result<Vec<PiiEntity>> {
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return Err(QaError::Transport(
                "NER service not configured (LANGUAGE_ENDPOINT / LANGUAGE_KEY)".into(),
            ));
        };

        let request = AnalyzeRequest {
            kind: "PiiEntityRecognition",
            analysis_input: AnalysisInput {
                documents: vec![Document {
                    id: "1",
                    language: &self.language,
                    text,
                }],
            },
        };

        let response = self
            .client
            .post(format!("{}/language/:analyze-text", endpoint))
            .query(&[("api-version", API_VERSION)])
            .header("Ocp-Apim-Subscription-Key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(QaError::Service {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: AnalyzeResponse = serde_json::from_str(&body)
            .map_err(|e| QaError::Transport(format!("Failed to parse NER response: {}", e)))?;

        entities_for_first_document(parsed, status.as_u16())
    }
}

fn entities_for_first_document(response: AnalyzeResponse, status: u16) -> Result<Vec<PiiEntity>> {
    if let Some(failed) = response.results.errors.into_iter().find(|e| e.id == "1") {
        return Err(QaError::Service {
            status,
            message: format!("{}: {}", failed.error.code, failed.error.message),
        });
    }

    let entities = response
        .results
        .documents
        .into_iter()
        .find(|d| d.id == "1")
        .map(|d| d.entities)
        .unwrap_or_default();

    debug!("NER returned {} entities", entities.len());
    Ok(entities)
}

/// Second check of the gate
pub struct PiiCheck {
    detector: Arc<dyn PiiDetector>,
    on_error: ServiceErrorPolicy,
}

impl PiiCheck {
    pub fn new(detector: Arc<dyn PiiDetector>, on_error: ServiceErrorPolicy) -> Self {
        Self { detector, on_error }
    }
}

#[async_trait]
impl SecurityCheck for PiiCheck {
    fn category(&self) -> SecurityCategory {
        SecurityCategory::PersonalInformation
    }

    fn on_service_error(&self) -> ServiceErrorPolicy {
        self.on_error
    }

    async fn is_triggered(&self, text: &str) -> Result<bool> {
        let entities = self.detector.detect(text).await?;
        Ok(!entities.is_empty())
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    kind: &'a str,
    analysis_input: AnalysisInput<'a>,
}

#[derive(Serialize)]
struct AnalysisInput<'a> {
    documents: Vec<Document<'a>>,
}

#[derive(Serialize)]
struct Document<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    results: AnalyzeResults,
}

#[derive(Deserialize)]
struct AnalyzeResults {
    #[serde(default)]
    documents: Vec<DocumentResult>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Deserialize)]
struct DocumentResult {
    id: String,
    #[serde(default)]
    entities: Vec<PiiEntity>,
}

#[derive(Deserialize)]
struct DocumentError {
    id: String,
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticDetector(Vec<PiiEntity>);

    #[async_trait]
    impl PiiDetector for StaticDetector {
        async fn detect(&self, _text: &str) -> Result<Vec<PiiEntity>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_request_shape() {
        let request = AnalyzeRequest {
            kind: "PiiEntityRecognition",
            analysis_input: AnalysisInput {
                documents: vec![Document { id: "1", language: "es", text: "hola" }],
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["kind"], "PiiEntityRecognition");
        assert_eq!(json["analysisInput"]["documents"][0]["language"], "es");
    }

    #[test]
    fn test_parse_entities() {
        let raw = r#"{"kind":"PiiEntityRecognitionResults","results":{"documents":[{"id":"1",
            "redactedText":"Me llamo ****","entities":[{"text":"Juan","category":"Person",
            "offset":9,"length":4,"confidenceScore":0.98}],"warnings":[]}],"errors":[],
            "modelVersion":"2023-09-01"}}"#;
        let parsed: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        let entities = entities_for_first_document(parsed, 200).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].category, "Person");
    }

    #[test]
    fn test_document_error_is_service_error() {
        let raw = r#"{"kind":"PiiEntityRecognitionResults","results":{"documents":[],
            "errors":[{"id":"1","error":{"code":"InvalidArgument","message":"Invalid language"}}]}}"#;
        let parsed: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        let err = entities_for_first_document(parsed, 200).unwrap_err();
        assert!(matches!(err, QaError::Service { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_detector_errors() {
        let detector = AzurePiiDetector::new(None, None, "es".into(), Duration::from_secs(1)).unwrap();
        let err = detector.detect("Me llamo Juan").await.unwrap_err();
        assert!(err.is_service_failure());
    }

    #[tokio::test]
    async fn test_check_triggers_on_any_entity() {
        let entity = PiiEntity {
            text: "Juan".into(),
            category: "Person".into(),
            confidence_score: 0.9,
        };
        let check = PiiCheck::new(Arc::new(StaticDetector(vec![entity])), ServiceErrorPolicy::FailOpen);
        assert!(check.is_triggered("Me llamo Juan").await.unwrap());

        let check = PiiCheck::new(Arc::new(StaticDetector(vec![])), ServiceErrorPolicy::FailClosed);
        assert!(!check.is_triggered("Hola").await.unwrap());
        assert_eq!(check.on_service_error(), ServiceErrorPolicy::FailClosed);
    }
}
