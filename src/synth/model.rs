use log::{debug, trace};

use crate::{
    error::{Error, Result},
    program::{Function, FunctionId, Program},
    scope::{Layout, Parameters, Scope},
    search::{Choice, SearchCoordinator},
    synth::{builder::Builder, Dataset, Example},
    value::{TypeTag, Value},
};

pub const DEFAULT_MAX_SPLIT_ATTEMPTS: usize = 256;

/// A binary decision tree whose internal nodes are boolean functions of
/// the input row.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Leaf(bool),
    Internal {
        binning: FunctionId,
        negative: Box<Model>,
        positive: Box<Model>,
    },
}

impl Model {
    pub fn internal(binning: FunctionId, negative: Model, positive: Model) -> Self {
        Model::Internal {
            binning,
            negative: Box::new(negative),
            positive: Box::new(positive),
        }
    }

    pub fn evaluate(&self, program: &Program, input: &[Value]) -> Result<bool> {
        let mut node = self;

        loop {
            match node {
                Model::Leaf(value) => return Ok(*value),
                Model::Internal { binning, negative, positive } => {
                    node = if program.call(*binning, input)?.read::<bool>()? {
                        positive
                    } else {
                        negative
                    };
                },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Model::Leaf(_) => 1,
            Model::Internal { negative, positive, .. } => {
                1 + negative.node_count() + positive.node_count()
            },
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Model::Leaf(_) => 0,
            Model::Internal { negative, positive, .. } => {
                1 + negative.depth().max(positive.depth())
            },
        }
    }

    /// Binning functions in pre-order.
    pub fn binning_functions(&self) -> Vec<FunctionId> {
        let mut out = Vec::new();
        self.collect_binning(&mut out);
        out
    }

    fn collect_binning(&self, out: &mut Vec<FunctionId>) {
        if let Model::Internal { binning, negative, positive } = self {
            out.push(*binning);
            negative.collect_binning(out);
            positive.collect_binning(out);
        }
    }

    /// Renders the tree as nested conditionals, e.g. `(bin3 ? true : false)`.
    pub fn repr(&self, program: &Program) -> String {
        match self {
            Model::Leaf(value) => value.to_string(),
            Model::Internal { binning, negative, positive } => {
                let name = program.get(*binning)
                    .map(|f| f.name().to_string())
                    .unwrap_or_else(|_| format!("#{}", binning.index()));

                format!("({name} ? {} : {})", positive.repr(program), negative.repr(program))
            },
        }
    }
}

/// Grows a [`Model`] by recursively splitting a dataset with synthesized
/// binning functions. Every binning function that ends up in the model is
/// registered in the program.
pub struct ModelBuilder<'a, C: ?Sized> {
    program: &'a mut Program,
    scope: &'a mut Scope,
    coordinator: &'a mut C,
    depth_budget: usize,
    max_split_attempts: usize,
    helpers: bool,
}

impl<'a, C> ModelBuilder<'a, C>
where
    C: SearchCoordinator<Choice> + ?Sized,
{
    pub fn new(
        program: &'a mut Program,
        scope: &'a mut Scope,
        coordinator: &'a mut C,
        depth_budget: usize,
    ) -> Self {
        Self {
            program,
            scope,
            coordinator,
            depth_budget,
            max_split_attempts: DEFAULT_MAX_SPLIT_ATTEMPTS,
            helpers: false,
        }
    }

    /// How many binning functions may be rejected at a single node before
    /// giving up with [`Error::SplitExhausted`].
    pub fn with_max_split_attempts(mut self, attempts: usize) -> Self {
        self.max_split_attempts = attempts;
        self
    }

    pub fn with_helpers(mut self, helpers: bool) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn build_model(&mut self, dataset: &Dataset) -> Result<Model> {
        let rows = dataset.examples().iter().collect::<Vec<_>>();

        self.build_node(dataset.schema(), &rows)
    }

    fn build_node(&mut self, schema: &[TypeTag], rows: &[&Example]) -> Result<Model> {
        let Some(first) = rows.first() else {
            return Err(Error::NoData);
        };

        if rows.iter().all(|row| row.output == first.output) {
            return Ok(Model::Leaf(first.output));
        }

        let (binning, negative, positive) = self.split(schema, rows)?;
        debug!(
            "Split {} row(s) into {}/{} with {}",
            rows.len(),
            negative.len(),
            positive.len(),
            binning.repr(self.program),
        );
        let binning = self.program.register(binning);

        let negative = self.build_node(schema, &negative)?;
        let positive = self.build_node(schema, &positive)?;

        Ok(Model::internal(binning, negative, positive))
    }

    /// Searches for a binning function sending at least one row each way.
    /// Rejected attempts leave no trace in the program or the scope.
    fn split<'r>(
        &mut self,
        schema: &[TypeTag],
        rows: &[&'r Example],
    ) -> Result<(Function, Vec<&'r Example>, Vec<&'r Example>)> {
        let boolean = TypeTag::of::<bool>();
        let program_snapshot = self.program.clone();
        let scope_snapshot = self.scope.clone();

        for attempt in 1..=self.max_split_attempts {
            let mut params = Parameters::new(Layout::Bound(schema.to_vec()));
            let built = Builder::new(&mut *self.program, &mut *self.scope, &mut *self.coordinator)
                .with_helpers(self.helpers)
                .build(&mut params, boolean, true, self.depth_budget);

            let body = match built {
                Ok(body) => body,
                Err(e) if e.is_recoverable() => {
                    debug!("Attempt {attempt}: {e}");
                    self.restore(&program_snapshot, &scope_snapshot);
                    continue;
                },
                Err(e) => return Err(e),
            };

            let name = format!("bin{}", self.program.next_id().index());
            let binning = Function::synthesized(name, boolean, params.into_params(), body);

            let mut negative = Vec::new();
            let mut positive = Vec::new();
            for row in rows {
                let bin = binning.call(self.program, &row.input)?.read::<bool>()?;
                trace!("{} on {:?}: {bin}", binning.name(), row.input);
                if bin {
                    positive.push(*row);
                } else {
                    negative.push(*row);
                }
            }

            if !negative.is_empty() && !positive.is_empty() {
                return Ok((binning, negative, positive));
            }

            debug!("Attempt {attempt}: {} does not split", binning.repr(self.program));
            self.restore(&program_snapshot, &scope_snapshot);
        }

        Err(Error::SplitExhausted {
            rows: rows.len(),
            attempts: self.max_split_attempts,
        })
    }

    fn restore(&mut self, program: &Program, scope: &Scope) {
        if self.program.len() != program.len() {
            *self.program = program.clone();
            *self.scope = scope.clone();
        }
    }
}
