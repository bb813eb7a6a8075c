use crate::{
    error::{Error, Result},
    program::Program,
    synth::{model::Model, Dataset},
};

/// Everything a finished trial produced.
#[derive(Debug, Clone, Copy)]
pub struct TrialOutcome<'a> {
    pub program: &'a Program,
    pub model: &'a Model,
    pub dataset: &'a Dataset,
    /// Synthesized program nodes plus model nodes.
    pub cost: usize,
}

/// Turns a trial into a reward. Larger is better.
pub trait Scorer {
    fn score(&self, outcome: &TrialOutcome<'_>) -> Result<f64>;
}

impl<F> Scorer for F
where
    F: Fn(&TrialOutcome<'_>) -> Result<f64>,
{
    fn score(&self, outcome: &TrialOutcome<'_>) -> Result<f64> {
        self(outcome)
    }
}

/// Prefers the smallest program and model: the reward is `-cost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCount;

impl Scorer for NodeCount {
    fn score(&self, outcome: &TrialOutcome<'_>) -> Result<f64> {
        Ok(-(outcome.cost as f64))
    }
}

/// `-cost` plus `weight` times the accuracy on a held-out dataset.
#[derive(Debug, Clone)]
pub struct AccuracyBlend {
    pub validation: Dataset,
    pub weight: f64,
}

impl Scorer for AccuracyBlend {
    fn score(&self, outcome: &TrialOutcome<'_>) -> Result<f64> {
        let accuracy = accuracy(outcome.program, outcome.model, &self.validation)?;

        Ok(self.weight * accuracy - outcome.cost as f64)
    }
}

/// Share of `dataset` rows the model labels correctly.
pub fn accuracy(program: &Program, model: &Model, dataset: &Dataset) -> Result<f64> {
    if dataset.is_empty() {
        return Err(Error::Scorer("cannot measure accuracy on an empty dataset".to_string()));
    }

    let mut hits = 0;
    for example in dataset.examples() {
        if model.evaluate(program, &example.input)? == example.output {
            hits += 1;
        }
    }

    Ok(hits as f64 / dataset.len() as f64)
}
