//! HTTP client for a hosted text-classification model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, RawClassification};
use crate::error::AnalyzerError;

/// Classifier reached over HTTP.
///
/// Sends `POST {url}` with `{"inputs": "<text>"}`. Accepts a single
/// `{label, confidence|score}` object, a list of them, or a list of lists
/// (one inner list per input). When several candidates come back the one
/// with the highest confidence wins.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Single(RawClassification),
    Ranked(Vec<RawClassification>),
    Batched(Vec<Vec<RawClassification>>),
}

impl ClassifyResponse {
    fn into_best(self) -> Option<RawClassification> {
        let candidates = match self {
            ClassifyResponse::Single(one) => return Some(one),
            ClassifyResponse::Ranked(list) => list,
            ClassifyResponse::Batched(lists) => lists.into_iter().next()?,
        };
        candidates
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

impl HttpClassifier {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Classifier`] if the request fails or the
    /// endpoint answers with a non-success status, and
    /// [`AnalyzerError::MalformedClassification`] if the body cannot be parsed
    /// or carries no candidates.
    async fn classify(&self, text: &str) -> Result<RawClassification, AnalyzerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { inputs: text })
            .send()
            .await
            .map_err(|e| AnalyzerError::Classifier(format!("classifier request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Classifier(format!(
                "classifier returned status {}",
                response.status()
            )));
        }

        let body: ClassifyResponse = response.json().await.map_err(|e| {
            AnalyzerError::MalformedClassification(format!("classifier response parse error: {e}"))
        })?;

        body.into_best().ok_or_else(|| {
            AnalyzerError::MalformedClassification("classifier returned no candidates".to_string())
        })
    }
}
