use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    error::{Error, Result},
    program::Program,
    scope::Scope,
    score::{NodeCount, Scorer, TrialOutcome},
    search::{Choice, SearchCoordinator, SearchTree},
    synth::{
        model::{Model, ModelBuilder, DEFAULT_MAX_SPLIT_ATTEMPTS},
        Dataset,
    },
    value::Value,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    pub trials: usize,
    /// Depth budget of every binning function body.
    pub depth_budget: usize,
    /// UCB1 exploration constant.
    pub exploration_constant: f64,
    pub seed: u64,
    pub max_split_attempts: usize,
    /// Let binning functions define and call helper functions.
    pub helper_functions: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            depth_budget: 3,
            exploration_constant: 10.0,
            seed: 27,
            max_split_attempts: DEFAULT_MAX_SPLIT_ATTEMPTS,
            helper_functions: false,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::InvalidConfig("at least one trial is required".to_string()));
        }
        if self.max_split_attempts == 0 {
            return Err(Error::InvalidConfig("max_split_attempts must be positive".to_string()));
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "exploration constant must be finite and non-negative, got {}",
                self.exploration_constant,
            )));
        }

        Ok(())
    }
}

/// The best trial of a run.
#[derive(Debug, Clone)]
pub struct Learned {
    /// The host program extended with the winning trial's functions.
    pub program: Program,
    pub model: Model,
    pub reward: f64,
    /// Index of the trial that produced `model`.
    pub trial: usize,
    /// The retained reward after each trial, `-inf` until a trial
    /// produces a model.
    pub history: Vec<f64>,
    /// Trials whose binning search ran out of attempts.
    pub discarded: usize,
}

impl Learned {
    pub fn predict(&self, input: &[Value]) -> Result<bool> {
        self.model.evaluate(&self.program, input)
    }
}

/// Runs trials of model construction against one search tree and keeps
/// the best-scoring one.
#[derive(Debug, Clone)]
pub struct Learner<S = NodeCount> {
    config: LearnerConfig,
    scorer: S,
}

impl Learner {
    pub fn new(config: LearnerConfig) -> Self {
        Self::with_scorer(config, NodeCount)
    }
}

impl<S: Scorer> Learner<S> {
    pub fn with_scorer(config: LearnerConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Every trial starts from copies of `program` and `scope`; only
    /// `tree` carries state from one trial to the next. A trial whose
    /// binning search gives up is discarded and its path penalized; the run
    /// fails only if every trial is discarded.
    pub fn learn(
        &self,
        program: &Program,
        scope: &Scope,
        dataset: &Dataset,
        tree: &mut SearchTree<Choice>,
    ) -> Result<Learned> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(Error::NoData);
        }

        info!(
            "Learning from {} row(s) with {} function(s), {} trial(s)",
            dataset.len(),
            program.len(),
            self.config.trials,
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut best: Option<(Program, Model, f64, usize)> = None;
        let mut worst: Option<f64> = None;
        let mut history = Vec::with_capacity(self.config.trials);
        let mut discarded = 0;
        let mut last_failure = None;

        for trial in 0..self.config.trials {
            let mut trial_program = program.clone();
            let mut trial_scope = scope.clone();
            let mut session = tree.session(self.config.exploration_constant, &mut rng);

            let built = ModelBuilder::new(
                &mut trial_program,
                &mut trial_scope,
                &mut session,
                self.config.depth_budget,
            )
            .with_max_split_attempts(self.config.max_split_attempts)
            .with_helpers(self.config.helper_functions)
            .build_model(dataset);

            let model = match built {
                Ok(model) => model,
                Err(e @ Error::SplitExhausted { .. }) => {
                    // The path still ends, ranked below every scored trial.
                    // Before any trial is scored, charge a full tree over
                    // the data on top of what this trial synthesized.
                    let penalty = worst.unwrap_or_else(|| {
                        -((2 * dataset.len() + trial_program.node_count()) as f64)
                    }) - 1.0;
                    session.choose(&[Choice::Terminate])?;
                    session.terminate(penalty);
                    debug!("Trial {trial}: discarded with penalty {penalty}: {e}");

                    discarded += 1;
                    last_failure = Some(e);
                    history.push(best.as_ref().map_or(f64::NEG_INFINITY, |(_, _, r, _)| *r));
                    continue;
                },
                Err(e) => return Err(e),
            };

            let cost = trial_program.node_count() + model.node_count();
            let reward = self.scorer.score(&TrialOutcome {
                program: &trial_program,
                model: &model,
                dataset,
                cost,
            })?;
            if reward.is_nan() {
                return Err(Error::Scorer(format!("trial {trial} scored NaN")));
            }

            session.choose(&[Choice::Terminate])?;
            session.terminate(reward);
            debug!("Trial {trial}: reward {reward} for {cost} node(s)");
            worst = Some(worst.map_or(reward, |w| w.min(reward)));

            let improved = best.as_ref().is_none_or(|(_, _, r, _)| reward > *r);
            if improved {
                info!("Trial {trial}: new best reward {reward}: {}", model.repr(&trial_program));
                best = Some((trial_program, model, reward, trial));
            }

            history.push(best.as_ref().map_or(f64::NEG_INFINITY, |(_, _, r, _)| *r));
        }

        let Some((program, model, reward, trial)) = best else {
            return Err(last_failure
                .unwrap_or_else(|| Error::InvalidConfig("no trial was run".to_string())));
        };
        if discarded > 0 {
            info!("{discarded} trial(s) discarded after exhausting their binning search");
        }

        Ok(Learned {
            program,
            model,
            reward,
            trial,
            history,
            discarded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Example;

    #[test]
    fn config_validation() {
        assert_eq!(LearnerConfig::default().validate(), Ok(()));

        let bad = [
            LearnerConfig { trials: 0, ..Default::default() },
            LearnerConfig { max_split_attempts: 0, ..Default::default() },
            LearnerConfig { exploration_constant: -1.0, ..Default::default() },
            LearnerConfig { exploration_constant: f64::INFINITY, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn failing_scorer_aborts() {
        let mut program = Program::new();
        program.register_primitive("not", |x: bool| !x);
        let scope = Scope::index(&program);
        let dataset = Dataset::infer(vec![
            Example::new([true.into()], true),
            Example::new([false.into()], false),
        ])
        .unwrap();

        let scorer = |_: &TrialOutcome<'_>| Err::<f64, _>(Error::Scorer("boom".to_string()));
        let learner = Learner::with_scorer(LearnerConfig { trials: 3, ..Default::default() }, scorer);
        let res = learner.learn(&program, &scope, &dataset, &mut SearchTree::new());

        assert!(matches!(res, Err(Error::Scorer(msg)) if msg == "boom"));
    }

    #[test]
    fn single_column_identity() {
        let mut program = Program::new();
        program.register_primitive("not", |x: bool| !x);
        let scope = Scope::index(&program);
        let dataset = Dataset::infer(vec![
            Example::new([true.into()], true),
            Example::new([false.into()], false),
        ])
        .unwrap();

        let learned = Learner::new(LearnerConfig { trials: 20, ..Default::default() })
            .learn(&program, &scope, &dataset, &mut SearchTree::new())
            .unwrap();

        // One split on `?0` or `not(?0)` and two leaves is the smallest
        // possible model.
        assert_eq!(learned.model.node_count(), 3);
        assert_eq!(learned.history.len(), 20);
        for example in dataset.examples() {
            assert_eq!(learned.predict(&example.input), Ok(example.output));
        }
    }

    fn identity_data() -> (Program, Scope, Dataset) {
        let mut program = Program::new();
        program.register_primitive("not", |x: bool| !x);
        let scope = Scope::index(&program);
        let dataset = Dataset::infer(vec![
            Example::new([true.into()], true),
            Example::new([false.into()], false),
        ])
        .unwrap();

        (program, scope, dataset)
    }

    #[test]
    fn nan_reward_aborts() {
        let (program, scope, dataset) = identity_data();
        let scorer = |_: &TrialOutcome<'_>| Ok::<_, Error>(f64::NAN);
        let learner = Learner::with_scorer(LearnerConfig { trials: 3, ..Default::default() }, scorer);

        let res = learner.learn(&program, &scope, &dataset, &mut SearchTree::new());

        assert!(matches!(res, Err(Error::Scorer(msg)) if msg.contains("NaN")));
    }

    /// With depth 1 and a single attempt, `not(_)` always dead-ends while
    /// `?0` splits. The first two trials take one root choice each, so one
    /// of them exhausts and the other succeeds.
    #[test]
    fn exhausted_trials_are_discarded() {
        let (program, scope, dataset) = identity_data();
        let config = LearnerConfig {
            trials: 2,
            depth_budget: 1,
            max_split_attempts: 1,
            ..Default::default()
        };
        let mut tree = SearchTree::new();

        let learned = Learner::new(config)
            .learn(&program, &scope, &dataset, &mut tree)
            .unwrap();

        assert_eq!(learned.discarded, 1);
        assert_eq!(learned.history.len(), 2);
        assert_eq!(learned.history.last().copied(), Some(learned.reward));
        assert_eq!(learned.model.node_count(), 3);
        // Both paths were closed, the discarded one below the scored one.
        assert_eq!(tree.visits(), 2);
        assert!(tree.mean_reward().unwrap() < learned.reward);
        for example in dataset.examples() {
            assert_eq!(learned.predict(&example.input), Ok(example.output));
        }
    }

    #[test]
    fn every_trial_exhausted_is_an_error() {
        let mut program = Program::new();
        program.register_primitive("not", |x: bool| !x);
        let scope = Scope::index(&program);
        let dataset = Dataset::infer(vec![
            Example::new([true.into()], true),
            Example::new([true.into()], false),
        ])
        .unwrap();
        let config = LearnerConfig { trials: 4, max_split_attempts: 8, ..Default::default() };

        let res = Learner::new(config).learn(&program, &scope, &dataset, &mut SearchTree::new());

        assert_eq!(res.map(|l| l.reward), Err(Error::SplitExhausted { rows: 2, attempts: 8 }));
    }
}
