use clap::Parser;
use log::{error, info, LevelFilter};

use treesynth::{problems, Learner, Result, Scope, SearchTree};

/// Learns a decision tree of synthesized boolean functions for one of the
/// built-in problems.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Name of the problem to learn
    #[arg(short, long, default_value = "and-or-not")]
    problem: String,

    /// Number of trials
    #[arg(short, long)]
    trials: Option<usize>,

    /// Depth budget of every binning function
    #[arg(short, long)]
    depth: Option<usize>,

    /// UCB1 exploration constant
    #[arg(short, long)]
    exploration: Option<f64>,

    /// Seed of the search
    #[arg(short, long)]
    seed: Option<u64>,

    /// Rejected binning functions allowed per model node
    #[arg(long)]
    max_split_attempts: Option<usize>,

    /// Let binning functions define helper functions
    #[arg(long)]
    helpers: bool,

    /// List the problems and exit
    #[arg(long)]
    list: bool,

    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.list {
        for problem in problems::PROBLEMS {
            println!("{:<14} {}", problem.name, problem.description);
        }
        return Ok(());
    }

    let Some(problem) = problems::find(&cli.problem) else {
        return Err(treesynth::Error::InvalidConfig(format!(
            "unknown problem `{}`, try --list",
            cli.problem,
        )));
    };

    let mut config = problem.config();
    config.trials = cli.trials.unwrap_or(config.trials);
    config.depth_budget = cli.depth.unwrap_or(config.depth_budget);
    config.exploration_constant = cli.exploration.unwrap_or(config.exploration_constant);
    config.seed = cli.seed.unwrap_or(config.seed);
    config.max_split_attempts = cli.max_split_attempts.unwrap_or(config.max_split_attempts);
    config.helper_functions |= cli.helpers;

    let (program, dataset) = problem.setup()?;
    let scope = Scope::index(&program);
    let mut tree = SearchTree::new();

    info!("Problem {}: {}", problem.name, problem.description);
    let learned = Learner::new(config).learn(&program, &scope, &dataset, &mut tree)?;

    info!(
        "Best reward {} at trial {}, search tree of {} node(s)",
        learned.reward,
        learned.trial,
        tree.node_count(),
    );
    print!("{}", learned.program);
    println!("model = {}", learned.model.repr(&learned.program));

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    colog::default_builder()
        .filter_level(cli.level())
        .init();

    if let Err(e) = run(&cli) {
        error!("{e}");
        std::process::exit(1);
    }
}
