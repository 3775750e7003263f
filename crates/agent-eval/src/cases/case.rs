//! Core eval case types
//!
//! An eval case is a struct of common fields plus a [`CaseKind`] tagged union
//! whose discriminant is the case category. Judges match on the variant.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Category of eval case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Single prompt, judged on output
    Basic,
    /// Single prompt, judged on tool usage
    Tool,
    /// Single prompt, judged on generated files
    CodeGen,
    /// Single prompt, judged on delegation to another agent
    Routing,
    /// Ordered prompts sharing one workspace and session
    MultiTurn,
}

impl Category {
    /// Get the identifier used in case files and filters
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Tool => "tool",
            Category::CodeGen => "code-gen",
            Category::Routing => "routing",
            Category::MultiTurn => "multi-turn",
        }
    }

    /// Get display name for this category
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Basic => "Basic",
            Category::Tool => "Tool Use",
            Category::CodeGen => "Code Generation",
            Category::Routing => "Routing",
            Category::MultiTurn => "Multi-Turn",
        }
    }

    /// Get all categories
    pub fn all() -> &'static [Category] {
        &[
            Category::Basic,
            Category::Tool,
            Category::CodeGen,
            Category::Routing,
            Category::MultiTurn,
        ]
    }

    /// Parse a category identifier, accepting `_` as separator too
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "basic" => Some(Category::Basic),
            "tool" => Some(Category::Tool),
            "code-gen" | "codegen" => Some(Category::CodeGen),
            "routing" => Some(Category::Routing),
            "multi-turn" | "multiturn" => Some(Category::MultiTurn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expected invocation bounds for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExpectation {
    /// Tool name as reported by the agent
    pub tool_name: String,

    /// Minimum number of calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_calls: Option<u32>,

    /// Maximum number of calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calls: Option<u32>,
}

impl ToolExpectation {
    /// Expect at least `min` calls of `tool_name`
    pub fn at_least(tool_name: impl Into<String>, min: u32) -> Self {
        Self {
            tool_name: tool_name.into(),
            min_calls: Some(min),
            max_calls: None,
        }
    }

    /// Expect at most `max` calls of `tool_name`
    pub fn at_most(tool_name: impl Into<String>, max: u32) -> Self {
        Self {
            tool_name: tool_name.into(),
            min_calls: None,
            max_calls: Some(max),
        }
    }

    /// Set the upper bound
    pub fn with_max(mut self, max: u32) -> Self {
        self.max_calls = Some(max);
        self
    }

    /// Lower bound, defaulting to one call when no bound is given at all
    pub fn effective_min(&self) -> Option<u32> {
        match (self.min_calls, self.max_calls) {
            (None, None) => Some(1),
            (min, _) => min,
        }
    }
}

/// One turn of a multi-turn case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub prompt: String,
}

impl Turn {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Category-specific part of an eval case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "category",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum CaseKind {
    Basic {
        prompt: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        expected_patterns: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        forbidden_patterns: Vec<String>,
    },
    Tool {
        prompt: String,
        #[serde(default)]
        expected_tool_calls: Vec<ToolExpectation>,
    },
    CodeGen {
        prompt: String,
        #[serde(default)]
        target_files: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        expected_patterns: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        forbidden_patterns: Vec<String>,
    },
    Routing {
        prompt: String,
        expected_agent: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        known_agents: Vec<String>,
    },
    MultiTurn {
        turns: Vec<Turn>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        expected_patterns: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        forbidden_patterns: Vec<String>,
    },
}

impl CaseKind {
    /// Category discriminant of this variant
    pub fn category(&self) -> Category {
        match self {
            CaseKind::Basic { .. } => Category::Basic,
            CaseKind::Tool { .. } => Category::Tool,
            CaseKind::CodeGen { .. } => Category::CodeGen,
            CaseKind::Routing { .. } => Category::Routing,
            CaseKind::MultiTurn { .. } => Category::MultiTurn,
        }
    }
}

/// An eval case definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalCase {
    /// Unique identifier for the case
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// What the case exercises
    #[serde(default)]
    pub description: String,

    /// Judge identifiers, in scoring order
    #[serde(default)]
    pub judges: Vec<String>,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Disabled cases are never loaded for a run
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timeout override in milliseconds
    #[serde(default, alias = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Natural-language rubric for the rubric judge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<String>,

    /// Category and expectations
    #[serde(flatten)]
    pub kind: CaseKind,
}

fn default_enabled() -> bool {
    true
}

impl EvalCase {
    /// Create a new eval case
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: CaseKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            judges: Vec::new(),
            tags: Vec::new(),
            enabled: true,
            timeout_ms: None,
            rubric: None,
            kind,
        }
    }

    /// Basic prompt case
    pub fn basic(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            id.clone(),
            id,
            CaseKind::Basic {
                prompt: prompt.into(),
                expected_patterns: Vec::new(),
                forbidden_patterns: Vec::new(),
            },
        )
    }

    /// Multi-turn case from an ordered list of prompts
    pub fn multi_turn<I, S>(id: impl Into<String>, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        Self::new(
            id.clone(),
            id,
            CaseKind::MultiTurn {
                turns: prompts.into_iter().map(Turn::new).collect(),
                expected_patterns: Vec::new(),
                forbidden_patterns: Vec::new(),
            },
        )
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a judge identifier
    pub fn with_judge(mut self, judge_id: impl Into<String>) -> Self {
        self.judges.push(judge_id.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set the timeout override
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Set the rubric
    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = Some(rubric.into());
        self
    }

    /// Mark the case disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Category of this case
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Single prompt, `None` for multi-turn cases
    pub fn prompt(&self) -> Option<&str> {
        match &self.kind {
            CaseKind::Basic { prompt, .. }
            | CaseKind::Tool { prompt, .. }
            | CaseKind::CodeGen { prompt, .. }
            | CaseKind::Routing { prompt, .. } => Some(prompt),
            CaseKind::MultiTurn { .. } => None,
        }
    }

    /// Turns, `None` for single-prompt cases
    pub fn turns(&self) -> Option<&[Turn]> {
        match &self.kind {
            CaseKind::MultiTurn { turns, .. } => Some(turns),
            _ => None,
        }
    }

    /// Whether the case is executed as a turn sequence
    pub fn is_multi_turn(&self) -> bool {
        matches!(self.kind, CaseKind::MultiTurn { .. })
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> EvalResult<()> {
        if self.id.trim().is_empty() {
            return Err(EvalError::invalid_case(&self.id, "id must not be empty"));
        }

        match &self.kind {
            CaseKind::MultiTurn { turns, .. } => {
                if turns.is_empty() {
                    return Err(EvalError::invalid_case(
                        &self.id,
                        "multi-turn case needs at least one turn",
                    ));
                }
                if let Some(index) = turns.iter().position(|t| t.prompt.trim().is_empty()) {
                    return Err(EvalError::invalid_case(
                        &self.id,
                        format!("turn {} has an empty prompt", index + 1),
                    ));
                }
            }
            CaseKind::Tool {
                expected_tool_calls,
                ..
            } => {
                for expectation in expected_tool_calls {
                    if let (Some(min), Some(max)) = (expectation.min_calls, expectation.max_calls) {
                        if min > max {
                            return Err(EvalError::invalid_case(
                                &self.id,
                                format!(
                                    "{}: minCalls {} exceeds maxCalls {}",
                                    expectation.tool_name, min, max
                                ),
                            ));
                        }
                    }
                }
            }
            _ => {}
        }

        if let Some(prompt) = self.prompt() {
            if prompt.trim().is_empty() {
                return Err(EvalError::invalid_case(&self.id, "prompt must not be empty"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("code-gen"), Some(Category::CodeGen));
        assert_eq!(Category::parse("code_gen"), Some(Category::CodeGen));
        assert_eq!(Category::parse("Multi-Turn"), Some(Category::MultiTurn));
        assert_eq!(Category::parse("refactoring"), None);
    }

    #[test]
    fn test_case_deserializes_by_category() {
        let json = r#"{
            "id": "tool-001",
            "name": "Reads files",
            "category": "tool",
            "prompt": "Summarize README.md",
            "judges": ["tool-calls"],
            "expectedToolCalls": [{"toolName": "Read", "minCalls": 3}]
        }"#;

        let case: EvalCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.category(), Category::Tool);
        assert!(case.enabled);
        assert_eq!(case.prompt(), Some("Summarize README.md"));
        match &case.kind {
            CaseKind::Tool {
                expected_tool_calls,
                ..
            } => {
                assert_eq!(expected_tool_calls[0], ToolExpectation::at_least("Read", 3));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_multi_turn_has_no_prompt() {
        let case = EvalCase::multi_turn("mt-001", ["first", "second"]);
        assert!(case.is_multi_turn());
        assert_eq!(case.prompt(), None);
        assert_eq!(case.turns().map(|t| t.len()), Some(2));
    }

    #[test]
    fn test_timeout_alias() {
        let yaml = r#"
id: basic-001
name: Timeout alias
category: basic
prompt: hi
timeout: 1500
"#;
        let case: EvalCase = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(case.timeout_ms, Some(1500));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let case = EvalCase::new(
            "tool-002",
            "Bad bounds",
            CaseKind::Tool {
                prompt: "go".to_string(),
                expected_tool_calls: vec![ToolExpectation::at_least("Bash", 4).with_max(2)],
            },
        );
        assert!(case.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_turns() {
        let case = EvalCase::multi_turn("mt-002", Vec::<String>::new());
        assert!(case.validate().is_err());
        assert!(EvalCase::basic("ok", "prompt").validate().is_ok());
    }

    #[test]
    fn test_effective_min() {
        let bare = ToolExpectation {
            tool_name: "Read".into(),
            min_calls: None,
            max_calls: None,
        };
        assert_eq!(bare.effective_min(), Some(1));
        assert_eq!(ToolExpectation::at_most("Bash", 0).effective_min(), None);
    }
}
