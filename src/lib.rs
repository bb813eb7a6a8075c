pub mod error;
pub mod expr;
pub mod problems;
pub mod program;
pub mod scope;
pub mod score;
pub mod search;
pub mod synth;
pub mod value;

#[cfg(test)]
mod tests_utils;

pub use error::{Error, Result};
pub use program::{Function, FunctionId, Program};
pub use scope::Scope;
pub use search::{Choice, SearchCoordinator, SearchTree};
pub use synth::{
    learner::{Learned, Learner, LearnerConfig},
    model::{Model, ModelBuilder},
    Dataset, Example,
};
pub use value::{TypeTag, Value};
