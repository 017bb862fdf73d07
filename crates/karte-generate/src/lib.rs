pub mod engine;
mod error;
mod parse;
pub mod prompt;

pub use engine::{CompletionClient, HttpCompletionClient, UpstreamReply};
pub use error::{GenerateError, GENERIC_UPSTREAM_MESSAGE};

use karte_core::{FlowchartResult, GeneratorSettings, HypothesisInput};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Turn hypotheses into a flowchart through the completion service.
///
/// The returned value is the parsed completion, forwarded as-is once it is
/// known to carry a `nodes` array. Broken parent links are logged, not rejected.
pub async fn generate_flowchart(
    client: &dyn CompletionClient,
    settings: &GeneratorSettings,
    hypotheses: &[HypothesisInput],
) -> Result<Value, GenerateError> {
    let prompt = prompt::flowchart_prompt(hypotheses);

    let raw = engine::complete(client, settings, &prompt).await?;
    debug!("raw completion output:\n{}", raw);

    let data = parse::normalize(&raw)?;
    report_link_issues(&data, expected_node_count(hypotheses));
    Ok(data)
}

/// One problem node per hypothesis plus one finding node per non-empty line.
pub fn expected_node_count(hypotheses: &[HypothesisInput]) -> usize {
    hypotheses
        .iter()
        .map(|h| 1 + h.finding_lines().len())
        .sum()
}

fn report_link_issues(data: &Value, expected: usize) {
    let chart = match FlowchartResult::deserialize(data) {
        Ok(chart) => chart,
        Err(e) => {
            warn!("completion nodes do not match the flowchart schema: {}", e);
            return;
        }
    };

    if chart.nodes.len() != expected {
        debug!(
            expected,
            actual = chart.nodes.len(),
            "node count differs from hypotheses and finding lines"
        );
    }

    let issues = chart.link_issues();
    for issue in &issues {
        warn!("flowchart link issue: {}", issue);
    }
    info!(
        nodes = chart.nodes.len(),
        issues = issues.len(),
        "flowchart generated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedClient(Value);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn post(&self, _: &str, _: &str, _: &Value) -> Result<UpstreamReply, GenerateError> {
            Ok(UpstreamReply {
                status: 200,
                body: self.0.clone(),
            })
        }
    }

    fn wrap(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    fn settings() -> GeneratorSettings {
        GeneratorSettings {
            api_key: Some("k".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn scenario_single_hypothesis() {
        let chart = json!({"nodes": [
            {"id": "problem-1", "label": "H1", "type": "problem", "parentId": null},
            {"id": "finding-1-1", "label": "F1", "type": "finding", "parentId": "problem-1"},
            {"id": "finding-1-2", "label": "F2", "type": "finding", "parentId": "problem-1"}
        ]});
        let client = FixedClient(wrap(&chart.to_string()));
        let out = generate_flowchart(&client, &settings(), &[HypothesisInput::new("H1", "F1\nF2")])
            .await
            .unwrap();
        assert_eq!(out, chart);
    }

    #[tokio::test]
    async fn broken_links_still_pass_through() {
        let chart = json!({"nodes": [
            {"id": "finding-1-1", "label": "F1", "type": "finding", "parentId": "nowhere"},
            {"id": "x", "label": "?", "type": "other"}
        ]});
        let client = FixedClient(wrap(&chart.to_string()));
        let out = generate_flowchart(&client, &settings(), &[HypothesisInput::new("H1", "F1")])
            .await
            .unwrap();
        assert_eq!(out, chart);
    }

    #[test]
    fn expected_count_follows_finding_lines() {
        let hs = [
            HypothesisInput::new("H1", "F1\nF2\n\n"),
            HypothesisInput::new("H2", ""),
            HypothesisInput::new("H3", "  F3  "),
        ];
        assert_eq!(expected_node_count(&hs), 3 + 2 + 1);
        assert_eq!(expected_node_count(&[]), 0);
    }

    #[tokio::test]
    async fn missing_nodes_fails() {
        let client = FixedClient(wrap(r#"{"items": []}"#));
        let err = generate_flowchart(&client, &settings(), &[HypothesisInput::new("H1", "F1")])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::InvalidShape));
    }
}
