//! Eval case definitions and loading

mod case;
mod loader;

pub use case::{CaseKind, Category, EvalCase, ToolExpectation, Turn};
pub use loader::{CaseFilter, CaseLoader, load_cases_from_yaml};
