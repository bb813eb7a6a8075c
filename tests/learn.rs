use std::cell::Cell;

use treesynth::{
    expr::FunctionNode,
    problems,
    program::Parameter,
    score::TrialOutcome,
    Dataset, Error, Example, Learned, Learner, LearnerConfig, Program, Scope, SearchTree, TypeTag,
    Value,
};

pub const EXAMPLE_TRIALS: usize = 50;

pub fn init_logging() {
    let _ = colog::default_builder()
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn and_or_not() -> (Program, Dataset) {
    problems::find("and-or-not").unwrap().setup().unwrap()
}

fn learn(program: &Program, dataset: &Dataset, config: LearnerConfig) -> Learned {
    let scope = Scope::index(program);

    Learner::new(config)
        .learn(program, &scope, dataset, &mut SearchTree::new())
        .unwrap()
}

fn assert_fits(learned: &Learned, dataset: &Dataset) {
    for example in dataset.examples() {
        assert_eq!(
            learned.predict(&example.input),
            Ok(example.output),
            "{:?} with {}",
            example.input,
            learned.model.repr(&learned.program),
        );
    }
}

#[test]
fn test_four_row_example() {
    init_logging();

    let (program, dataset) = and_or_not();
    let learned = learn(&program, &dataset, LearnerConfig {
        trials: EXAMPLE_TRIALS,
        ..Default::default()
    });

    assert_fits(&learned, &dataset);
    assert_eq!(learned.history.len(), EXAMPLE_TRIALS);
    assert!(learned.trial < EXAMPLE_TRIALS);
}

#[test]
fn test_retained_reward_never_drops() {
    init_logging();

    let (program, dataset) = and_or_not();
    let learned = learn(&program, &dataset, LearnerConfig {
        trials: EXAMPLE_TRIALS,
        ..Default::default()
    });

    assert!(learned.history.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(learned.history.last().copied(), Some(learned.reward));
    assert_eq!(learned.history[learned.trial], learned.reward);

    // The winner is scored the default way.
    let cost = learned.program.node_count() + learned.model.node_count();
    assert_eq!(learned.reward, -(cost as f64));
}

#[test]
fn test_same_seed_same_result() {
    init_logging();

    let (program, dataset) = and_or_not();
    let config = LearnerConfig { trials: 30, seed: 5, ..Default::default() };
    let first = learn(&program, &dataset, config.clone());
    let second = learn(&program, &dataset, config);

    assert_eq!(first.reward, second.reward);
    assert_eq!(first.trial, second.trial);
    assert_eq!(first.history, second.history);
    assert_eq!(first.program.to_string(), second.program.to_string());
    assert_eq!(first.model.repr(&first.program), second.model.repr(&second.program));
}

#[test]
fn test_empty_dataset_is_an_error() {
    init_logging();

    let (program, _) = and_or_not();
    let empty = Dataset::new(vec![TypeTag::of::<bool>(); 3], Vec::new()).unwrap();
    let scope = Scope::index(&program);

    let res = Learner::new(LearnerConfig::default())
        .learn(&program, &scope, &empty, &mut SearchTree::new());

    assert!(matches!(res, Err(Error::NoData)));
}

#[test]
fn test_learning_leaves_the_input_alone() {
    init_logging();

    let (program, dataset) = and_or_not();
    let before = program.to_string();
    let learned = learn(&program, &dataset, LearnerConfig { trials: 10, ..Default::default() });

    assert_eq!(program.to_string(), before);
    assert!(learned.program.len() > program.len());
}

#[test]
fn test_evaluation_is_pure() {
    let (program, dataset) = and_or_not();
    let learned = learn(&program, &dataset, LearnerConfig { trials: 10, ..Default::default() });

    for example in dataset.examples() {
        let first = learned.predict(&example.input);
        let second = learned.predict(&example.input);
        assert_eq!(first, second);
    }
}

/// `outer(?0, ?1) = inner(?1)` where `inner(?0) = ?0 > 10`. A call must
/// hand `inner` its own frame: reading the caller's `?0` would be wrong.
#[test]
fn test_calls_do_not_leak_parameters() {
    let int = TypeTag::of::<i32>();
    let boolean = TypeTag::of::<bool>();
    let mut program = Program::new();
    let gt = program.register_primitive("gt", |x: i32, y: i32| x > y);
    let ten = program.register_primitive("ten", || 10i32);
    let native = |p: &Program, id| p.get(id).unwrap().native().unwrap().clone();

    let inner_body = FunctionNode::primitive(gt, native(&program, gt), vec![
        FunctionNode::parameter(0),
        FunctionNode::primitive(ten, native(&program, ten), Vec::new()),
    ]);
    let inner = program.define("inner", boolean, vec![Parameter::new(int, 0)], inner_body)
        .unwrap();
    let outer = program.define(
        "outer",
        boolean,
        vec![Parameter::new(int, 0), Parameter::new(int, 1)],
        FunctionNode::call(inner, vec![FunctionNode::parameter(1)]),
    )
    .unwrap();

    let call = |x: i32, y: i32| program.call(outer, &[Value::from(x), Value::from(y)])
        .and_then(|v| v.read::<bool>());

    assert_eq!(call(0, 20), Ok(true));
    assert_eq!(call(20, 0), Ok(false));
    assert_eq!(program.get(outer).unwrap().repr(&program), "inner(?1)");
}

#[test]
fn test_helper_functions() {
    init_logging();

    let (program, dataset) = problems::find("xor3").unwrap().setup().unwrap();
    let scope = Scope::index(&program);
    let helper_trials = Cell::new(0);
    let scorer = |outcome: &TrialOutcome<'_>| {
        let helpers = outcome.program.iter()
            .filter(|(_, f)| f.name().starts_with("fn"))
            .map(|(_, f)| f.cost())
            .collect::<Vec<_>>();

        if !helpers.is_empty() {
            helper_trials.set(helper_trials.get() + 1);
            let bins = outcome.model.binning_functions().into_iter()
                .map(|id| outcome.program.get(id).unwrap().cost())
                .sum::<usize>();
            assert!(helpers.iter().all(|cost| *cost > 0));
            assert_eq!(outcome.program.node_count(), helpers.iter().sum::<usize>() + bins);
        }
        assert_eq!(outcome.cost, outcome.program.node_count() + outcome.model.node_count());

        Ok::<_, Error>(-(outcome.cost as f64))
    };

    let config = LearnerConfig { trials: 30, helper_functions: true, ..Default::default() };
    let learned = Learner::with_scorer(config, scorer)
        .learn(&program, &scope, &dataset, &mut SearchTree::new())
        .unwrap();

    assert!(helper_trials.get() > 0);
    assert_fits(&learned, &dataset);
}

#[test]
fn test_exhausted_trials_do_not_end_the_run() {
    init_logging();

    let (program, dataset) = problems::find("and-or-not").unwrap().setup().unwrap();
    let learned = learn(&program, &dataset, LearnerConfig {
        trials: 20,
        max_split_attempts: 1,
        helper_functions: true,
        ..Default::default()
    });

    assert!(learned.discarded > 0);
    assert!(learned.discarded < 20);
    assert_eq!(learned.history.len(), 20);
    assert!(learned.history.windows(2).all(|w| w[0] <= w[1]));
    assert_fits(&learned, &dataset);
}

#[test]
fn test_demo_problems() {
    init_logging();

    for problem in problems::PROBLEMS {
        let (program, dataset) = problem.setup().unwrap();
        let learned = learn(&program, &dataset, LearnerConfig {
            trials: 10,
            ..problem.config()
        });

        assert_fits(&learned, &dataset);
    }
}

#[test]
fn test_unseen_rows_get_a_label() {
    let (program, _) = and_or_not();
    let dataset = Dataset::infer(vec![
        Example::new([false.into(), false.into(), false.into()], false),
        Example::new([false.into(), false.into(), true.into()], true),
    ])
    .unwrap();
    let learned = learn(&program, &dataset, LearnerConfig { trials: 5, ..Default::default() });

    for bits in 0..8u8 {
        let row = (0..3).map(|i| Value::from(bits & (1 << i) != 0)).collect::<Vec<_>>();
        assert!(learned.predict(&row).is_ok());
    }
}
