//! Evaluation of models against kitchen scenarios

mod catalog;
mod evaluator;
mod replay;
mod results;
mod synthetic;

pub use catalog::{ModelCatalog, ModelInfo, Scenario, ScenarioCatalog};
pub use evaluator::{EvalError, Evaluation, EvaluationStrategy, Evaluator};
pub use replay::TraceEvaluation;
pub use results::{EvaluationMode, EvaluationResult, EventLog};
pub use synthetic::SyntheticEvaluation;
