//! AI findings adapter.
//!
//! Wraps the external generative-AI provider. The provider only ever sees
//! sanitized data: the complete prompt is passed through the sanitizer again
//! immediately before dispatch. Provider failures degrade to a synthetic
//! `analysis_error` finding instead of failing the evaluation; only a safety
//! block propagates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use risk_gate_llm::{CompletionRequest, LlmBackend};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::{Result, RiskGateError};
use crate::policy::{
    ANALYSIS_ERROR_RECOMMENDATION, ANALYSIS_ERROR_SCORE, ANALYSIS_ERROR_SECTION, MAX_RUN_SCORE,
    MIN_RUN_SCORE,
};
use crate::sanitizer::enforce_safe;
use crate::types::{Assessment, Finding, FindingCategory, Severity};

const SYSTEM_PROMPT: &str =
    "You are an expert proposal risk analyzer. Always respond with valid JSON.";

const ANALYSIS_INSTRUCTIONS: &str = "Analyze this proposal for risks and compliance issues.

Look for:
1. Missing or incomplete mandatory sections
2. Incomplete client details or engagement metadata
3. Vague or unclear deliverables
4. Missing risk assessments or assumptions
5. Compliance issues with branding or standards
6. Altered clauses that need review

Respond with one JSON object:
{\"risk_score\": <integer 0 to 100>,
 \"findings\": [{\"category\": \"missing_section|incomplete_content|compliance|clarity\",
                \"severity\": \"low|medium|high|critical\",
                \"section\": \"section name\",
                \"description\": \"issue description\",
                \"recommendation\": \"how to fix\"}],
 \"summary\": \"brief summary\"}

Sensitive values have been replaced with [REDACTED_*] tokens; do not speculate about them.

Proposal:
";

/// Provider output before it is merged with the deterministic checks.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAssessment {
    pub risk_score: i64,
    pub findings: Vec<Finding>,
    pub summary: String,
}

impl From<AiAssessment> for Assessment {
    fn from(ai: AiAssessment) -> Self {
        Assessment::from_score(ai.risk_score, ai.findings, ai.summary)
    }
}

/// Source of AI findings for a sanitized proposal.
#[async_trait]
pub trait FindingsProvider: Send + Sync {
    /// Provider identifier for logs.
    fn id(&self) -> &str;

    /// Produce findings. Fails with [`RiskGateError::Safety`] if the outbound
    /// prompt is blocked; any other error is treated as a provider failure.
    async fn generate_findings(&self, sanitized: &Value) -> Result<AiAssessment>;
}

/// [`FindingsProvider`] backed by an LLM completion backend.
pub struct LlmFindingsProvider {
    backend: Arc<dyn LlmBackend>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmFindingsProvider {
    pub fn new(backend: Arc<dyn LlmBackend>, config: &AiConfig) -> Self {
        Self {
            backend,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// System and user prompts, both sanitized.
    fn build_prompt(&self, sanitized: &Value) -> Result<(String, String)> {
        let body = serde_json::to_string_pretty(sanitized)?;
        let envelope = json!({
            "system": SYSTEM_PROMPT,
            "user": format!("{}{}", ANALYSIS_INSTRUCTIONS, body),
        });

        let safe = enforce_safe(&envelope)?;
        let system = safe["system"].as_str().unwrap_or_default().to_string();
        let user = safe["user"].as_str().unwrap_or_default().to_string();
        Ok((system, user))
    }
}

#[async_trait]
impl FindingsProvider for LlmFindingsProvider {
    fn id(&self) -> &str {
        self.backend.id()
    }

    async fn generate_findings(&self, sanitized: &Value) -> Result<AiAssessment> {
        let (system, user) = self.build_prompt(sanitized)?;

        let request = CompletionRequest::new(user)
            .with_system(system)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_json_output();

        let completion = self
            .backend
            .complete(request)
            .await
            .map_err(|e| RiskGateError::Adapter(e.to_string()))?;

        debug!(
            backend = self.backend.id(),
            tokens = completion.usage.total(),
            truncated = completion.truncated,
            "AI provider responded"
        );

        parse_provider_output(&completion.content).map_err(|err| {
            if completion.truncated {
                RiskGateError::Adapter("AI response was cut off at the token limit".to_string())
            } else {
                err
            }
        })
    }
}

/// Parse provider text into an [`AiAssessment`].
///
/// Tolerates prose around the JSON object, an `issues` key in place of
/// `findings`, fractional scores and unknown severities (read as medium).
/// Scores are clamped to 0..=100. An object without a numeric `risk_score`
/// or a findings array is an adapter failure.
pub fn parse_provider_output(content: &str) -> Result<AiAssessment> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json_text = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(RiskGateError::Adapter(
                "AI response did not contain a JSON object".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(json_text)
        .map_err(|e| RiskGateError::Adapter(format!("Could not parse AI response: {}", e)))?;

    let risk_score = value
        .get("risk_score")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
        .ok_or_else(|| {
            RiskGateError::Adapter("AI response has no numeric risk_score".to_string())
        })?
        .clamp(MIN_RUN_SCORE, MAX_RUN_SCORE);

    let findings = value
        .get("findings")
        .and_then(Value::as_array)
        .or_else(|| value.get("issues").and_then(Value::as_array))
        .ok_or_else(|| RiskGateError::Adapter("AI response has no findings array".to_string()))?
        .iter()
        .filter_map(parse_finding)
        .collect();

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(AiAssessment {
        risk_score,
        findings,
        summary,
    })
}

fn parse_finding(item: &Value) -> Option<Finding> {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let description = text("description")?;
    let category = text("category").unwrap_or("clarity");
    let severity = text("severity")
        .map(Severity::parse_lenient)
        .unwrap_or(Severity::Medium);

    let mut finding = Finding::new(
        FindingCategory::from(category.to_lowercase()),
        severity,
        text("section").unwrap_or("General"),
        description,
        text("recommendation").unwrap_or_default(),
    );
    if let Some(points) = item.get("points").and_then(Value::as_u64) {
        finding = finding.with_points(u32::try_from(points).unwrap_or(u32::MAX));
    }
    Some(finding)
}

/// What the adapter produced for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    /// Provider returned findings
    Assessed(Assessment),
    /// Provider failed; a synthetic `analysis_error` assessment stands in
    Degraded { assessment: Assessment, reason: String },
    /// The outbound prompt was blocked by the sanitizer
    Blocked { reasons: Vec<String> },
}

/// Bounded, failure-tolerant wrapper around an optional [`FindingsProvider`].
#[derive(Clone)]
pub struct AiFindingsAdapter {
    provider: Option<Arc<dyn FindingsProvider>>,
    timeout: Duration,
}

impl AiFindingsAdapter {
    pub fn new(provider: Option<Arc<dyn FindingsProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Adapter with no provider; every call degrades.
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_millis(0))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Ask the provider for findings on an already sanitized payload.
    pub async fn assess(&self, sanitized: &Value) -> AdapterOutcome {
        let Some(provider) = &self.provider else {
            return degraded("AI provider not configured");
        };

        match tokio::time::timeout(self.timeout, provider.generate_findings(sanitized)).await {
            Ok(Ok(ai)) => {
                debug!(
                    provider = provider.id(),
                    findings = ai.findings.len(),
                    risk_score = ai.risk_score,
                    "AI findings received"
                );
                AdapterOutcome::Assessed(ai.into())
            }
            Ok(Err(RiskGateError::Safety { reasons })) => {
                warn!(reasons = ?reasons, "Outbound AI prompt blocked");
                AdapterOutcome::Blocked { reasons }
            }
            Ok(Err(err)) => {
                warn!(provider = provider.id(), error = %err, "AI provider failed");
                degraded(&err.to_string())
            }
            Err(_) => {
                warn!(
                    provider = provider.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "AI provider timed out"
                );
                degraded(&format!(
                    "AI provider timed out after {}ms",
                    self.timeout.as_millis()
                ))
            }
        }
    }
}

/// Stand-in assessment for a failed provider call.
pub fn analysis_error_assessment(reason: &str) -> Assessment {
    let finding = Finding::new(
        FindingCategory::AnalysisError,
        Severity::Medium,
        ANALYSIS_ERROR_SECTION,
        format!("AI analysis unavailable: {}", reason),
        ANALYSIS_ERROR_RECOMMENDATION,
    );
    Assessment::from_score(
        ANALYSIS_ERROR_SCORE,
        vec![finding],
        "AI analysis unavailable; manual review required.",
    )
}

fn degraded(reason: &str) -> AdapterOutcome {
    AdapterOutcome::Degraded {
        assessment: analysis_error_assessment(reason),
        reason: reason.to_string(),
    }
}
