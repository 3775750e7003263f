//! Delegation check for routing cases
//!
//! Evidence tiers, strongest first:
//!
//! | evidence | score | confidence |
//! |---|---|---|
//! | delegation tool call targeting the expected agent | 100 | 1.0 |
//! | delegation tool calls to other agents only | 0 | 0.9 |
//! | prose naming the expected agent with delegation intent | 70 | 0.6 |
//! | prose naming it without intent, or naming rivals too | 40 | 0.3 |
//! | nothing | 0 | 1.0 |

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};

use super::{Judge, JudgeContext};
use crate::cases::CaseKind;
use crate::error::EvalResult;
use crate::outcome::{JudgeResult, ToolCallRecord};

const PASS_THRESHOLD: f64 = 70.0;

const DELEGATION_TOOLS: &[&str] = &[
    "task",
    "agent",
    "delegate",
    "delegate_task",
    "handoff",
    "route",
    "transfer",
    "spawn_agent",
    "subagent",
];

const TARGET_PREFIXES: &[&str] = &["transfer_to_", "delegate_to_", "handoff_to_", "route_to_"];

const TARGET_KEYS: &[&str] = &[
    "subagent_type",
    "subagentType",
    "agent",
    "agentName",
    "agent_name",
    "target",
    "to",
    "name",
];

const INTENT_PATTERN: &str = r"(?i)\b(delegat\w*|hand(?:ing|ed|s)?\s+(?:it\s+|this\s+)?(?:off|over)|rout(?:e|ed|ing)|forward\w*|transfer\w*|assign\w*|pass(?:ing|ed)?\s+(?:it|this|the task)\s+to)\b";

/// Checks that the agent delegated to the expected agent
pub struct RoutingJudge {
    intent: Option<Regex>,
}

impl RoutingJudge {
    pub const ID: &'static str = "routing";

    pub fn new() -> Self {
        Self {
            intent: Regex::new(INTENT_PATTERN).ok(),
        }
    }

    /// Delegation target of a tool call, if it is one
    fn delegation_target(call: &ToolCallRecord) -> Option<String> {
        let name = call.name.to_lowercase();

        if let Some(target) = TARGET_PREFIXES
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
        {
            return Some(target.to_string());
        }

        if !DELEGATION_TOOLS.contains(&name.as_str()) {
            return None;
        }

        let target = match &call.input {
            Value::Object(obj) => TARGET_KEYS
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(str::to_string),
            Value::String(s) => Some(s.clone()),
            _ => None,
        };
        Some(target.unwrap_or_default())
    }

    fn mentions(text: &str, agent: &str) -> bool {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(agent));
        Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
    }

    fn same_agent(a: &str, b: &str) -> bool {
        let norm = |s: &str| s.to_lowercase().replace(['-', ' '], "_");
        norm(a) == norm(b)
    }
}

impl Default for RoutingJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for RoutingJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Checks that the request was routed to the expected agent"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let (expected, known) = match &ctx.eval_case.kind {
            CaseKind::Routing {
                expected_agent,
                known_agents,
                ..
            } => (expected_agent, known_agents),
            _ => return Ok(JudgeResult::not_applicable(Self::ID, "not a routing case")),
        };

        let targets: Vec<String> = ctx
            .execution
            .tool_calls
            .iter()
            .filter_map(Self::delegation_target)
            .collect();

        if targets.iter().any(|t| Self::same_agent(t, expected)) {
            return Ok(JudgeResult::new(
                Self::ID,
                true,
                100.0,
                format!("Delegated to {} via tool call", expected),
            )
            .with_details(json!({ "evidence": "tool-call", "targets": targets })));
        }

        if !targets.is_empty() {
            return Ok(JudgeResult::new(
                Self::ID,
                false,
                0.0,
                format!(
                    "Delegated to {} instead of {}",
                    targets.join(", "),
                    expected
                ),
            )
            .with_confidence(0.9)
            .with_details(json!({ "evidence": "tool-call", "targets": targets })));
        }

        let output = &ctx.execution.output;
        let has_intent = self.intent.as_ref().is_some_and(|re| re.is_match(output));
        let names_expected = Self::mentions(output, expected);
        let rivals: Vec<&String> = known
            .iter()
            .filter(|a| !Self::same_agent(a, expected) && Self::mentions(output, a))
            .collect();

        let (passed, score, confidence, evidence, reasoning) = if names_expected && has_intent {
            if rivals.is_empty() {
                (
                    true,
                    70.0,
                    0.6,
                    "prose-intent",
                    format!("Output expresses intent to delegate to {}", expected),
                )
            } else {
                (
                    false,
                    40.0,
                    0.3,
                    "ambiguous",
                    format!(
                        "Output names {} but also {}",
                        expected,
                        rivals.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                    ),
                )
            }
        } else if names_expected {
            (
                false,
                40.0,
                0.3,
                "mention",
                format!("Output mentions {} without delegating", expected),
            )
        } else {
            (
                false,
                0.0,
                1.0,
                "none",
                format!("No evidence of routing to {}", expected),
            )
        };

        Ok(JudgeResult::new(Self::ID, passed && score >= PASS_THRESHOLD, score, reasoning)
            .with_confidence(confidence)
            .with_details(json!({ "evidence": evidence })))
    }
}
