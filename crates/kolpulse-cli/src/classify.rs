//! One-off classification against the configured classifier endpoint.

use std::sync::Arc;

use kolpulse_analyzer::{
    propagation_score, AnalyzerConfig, Classification, Classifier, ClassifierAdapter,
    HttpClassifier,
};
use kolpulse_core::{AppConfig, PropagationWeights};

/// Classify `text` and print the mapped emotion and its propagation score at
/// zero engagement.
///
/// Uses the same adapter as the analyzer, so a failing classifier prints the
/// neutral fallback rather than an error.
///
/// # Errors
///
/// Does not fail once configuration has loaded.
pub(crate) async fn run_classify(config: &AppConfig, text: &str) -> anyhow::Result<()> {
    let analyzer_config = AnalyzerConfig::from_app_config(config);
    let inner: Arc<dyn Classifier> = Arc::new(HttpClassifier::new(&config.classifier_url));
    let adapter = ClassifierAdapter::from_config(inner, &analyzer_config);

    let classification = adapter.classify(text).await;
    println!(
        "{}",
        describe(&classification, &analyzer_config.weights)
    );
    Ok(())
}

fn describe(classification: &Classification, weights: &PropagationWeights) -> String {
    let score = propagation_score(
        weights,
        classification.emotion,
        classification.confidence,
        0.0,
    );
    let source = classification
        .raw_label
        .as_deref()
        .map_or_else(|| "fallback".to_string(), |raw| format!("raw: {raw}"));
    format!(
        "emotion: {}  confidence: {:.3}  propagation: {:.3}  ({source})",
        classification.emotion, classification.confidence, score
    )
}
