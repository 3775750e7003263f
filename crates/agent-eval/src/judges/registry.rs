//! Judge registry
//!
//! Maps judge identifiers to instances. Constructed explicitly and shared by
//! reference with the runner, so tests can build isolated registries.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{
    FileExistsJudge, Judge, PatternMatchJudge, RoutingJudge, RubricGrader, RubricJudge,
    SyntaxJudge, ToolCallsJudge,
};

/// Registry of judges by identifier
#[derive(Default)]
pub struct JudgeRegistry {
    judges: RwLock<HashMap<String, Arc<dyn Judge>>>,
}

impl JudgeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in judge; the rubric judge has no grader
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins(None);
        registry
    }

    /// Registry holding every built-in judge with a rubric grader
    pub fn with_builtins_and_grader(grader: Arc<dyn RubricGrader>) -> Self {
        let registry = Self::new();
        registry.register_builtins(Some(grader));
        registry
    }

    fn register_builtins(&self, grader: Option<Arc<dyn RubricGrader>>) {
        self.register(Arc::new(FileExistsJudge));
        self.register(Arc::new(ToolCallsJudge));
        self.register(Arc::new(PatternMatchJudge));
        self.register(Arc::new(SyntaxJudge));
        self.register(Arc::new(RoutingJudge::new()));
        self.register(Arc::new(match grader {
            Some(grader) => RubricJudge::with_grader(grader),
            None => RubricJudge::new(),
        }));
    }

    /// Register a judge under its id, replacing any previous one
    pub fn register(&self, judge: Arc<dyn Judge>) {
        let id = judge.id().to_string();
        if self.judges.write().insert(id.clone(), judge).is_some() {
            tracing::debug!(judge_id = %id, "Replaced registered judge");
        }
    }

    /// Look up a judge
    pub fn get(&self, id: &str) -> Option<Arc<dyn Judge>> {
        self.judges.read().get(id).cloned()
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.judges.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether the id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.judges.read().contains_key(id)
    }

    /// Remove every judge
    pub fn reset(&self) {
        self.judges.write().clear();
    }

    /// Number of registered judges
    pub fn len(&self) -> usize {
        self.judges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.read().is_empty()
    }
}

impl std::fmt::Debug for JudgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeRegistry")
            .field("judges", &self.ids())
            .finish()
    }
}
