//! Normalization of loosely shaped agent output
//!
//! Process-backed agents are written against different SDKs and report their
//! results with different key spellings. Everything is folded into
//! [`AgentResult`].

use serde_json::Value;

use super::AgentResult;
use crate::outcome::{ToolCallRecord, Usage};

fn first<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn normalize_tool_call(value: &Value) -> Option<ToolCallRecord> {
    let obj = value.as_object()?;
    let name = first(obj, &["name", "toolName", "tool"])?.as_str()?.to_string();
    let input = first(obj, &["input", "args", "arguments"])
        .cloned()
        .unwrap_or(Value::Null);
    let output = first(obj, &["output", "result"]).map(as_text);
    let is_error = first(obj, &["isError", "is_error", "error"]).and_then(Value::as_bool);

    Some(ToolCallRecord {
        name,
        input,
        output,
        is_error,
    })
}

fn normalize_usage(value: &Value) -> Option<Usage> {
    let obj = value.as_object()?;
    Some(Usage {
        input_tokens: first(obj, &["inputTokens", "input_tokens", "promptTokens"])
            .and_then(as_u64)
            .unwrap_or(0),
        output_tokens: first(obj, &["outputTokens", "output_tokens", "completionTokens"])
            .and_then(as_u64)
            .unwrap_or(0),
        cost_usd: first(obj, &["costUsd", "cost_usd", "totalCostUsd", "total_cost_usd"])
            .and_then(Value::as_f64),
    })
}

/// Fold a JSON value reported by an agent into an [`AgentResult`]
///
/// A bare string is a successful output. Success defaults to `true` unless
/// an error is present.
pub fn normalize_agent_value(value: Value) -> AgentResult {
    let obj = match value {
        Value::String(output) => return AgentResult::success(output),
        Value::Object(obj) => obj,
        other => return AgentResult::success(other.to_string()),
    };

    let error = first(&obj, &["error", "errorMessage"]).map(as_text);
    let success = first(&obj, &["success", "ok"])
        .and_then(Value::as_bool)
        .unwrap_or(error.is_none());

    let tool_calls = first(&obj, &["toolCalls", "tool_calls"])
        .and_then(Value::as_array)
        .map(|calls| calls.iter().filter_map(normalize_tool_call).collect())
        .unwrap_or_default();

    AgentResult {
        output: first(&obj, &["output", "result", "text"])
            .map(as_text)
            .unwrap_or_default(),
        success,
        tool_calls,
        duration_ms: first(&obj, &["durationMs", "duration_ms", "duration"]).and_then(as_u64),
        session_id: first(&obj, &["sessionId", "session_id"]).map(as_text),
        usage: obj.get("usage").and_then(normalize_usage),
        error,
    }
}
