use std::collections::BTreeMap;

use log::trace;

use crate::{
    program::{Function, FunctionId, Parameter, Program},
    search::Choice,
    value::TypeTag,
};

#[derive(Debug, Clone, Default)]
struct ScopeEntry {
    nullaries: Vec<FunctionId>,
    non_nullaries: Vec<FunctionId>,
}

/// Functions available to the builder, grouped by return type and
/// split by arity.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: BTreeMap<TypeTag, ScopeEntry>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every function of `program` that can be the target of a
    /// node.
    pub fn index(program: &Program) -> Self {
        let mut scope = Self::new();
        for (id, function) in program.iter() {
            scope.add_function(id, function);
        }

        scope
    }

    pub fn add_function(&mut self, id: FunctionId, function: &Function) {
        if !function.is_dense() {
            trace!("Not indexing {}: sparse parameters", function.name());
            return;
        }

        let entry = self.entries.entry(function.return_type()).or_default();
        if function.is_nullary() {
            entry.nullaries.push(id);
        } else {
            entry.non_nullaries.push(id);
        }
    }

    /// Reuse choices producing `ty`: every nullary function, and the
    /// others only when `allow_non_nullary` is set.
    pub fn candidates(&self, ty: TypeTag, allow_non_nullary: bool) -> Vec<Choice> {
        let Some(entry) = self.entries.get(&ty) else {
            return Vec::new();
        };

        let non_nullaries = allow_non_nullary
            .then_some(entry.non_nullaries.as_slice())
            .unwrap_or_default();

        entry.nullaries.iter()
            .chain(non_nullaries)
            .map(|id| Choice::Reuse(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values()
            .map(|e| e.nullaries.len() + e.non_nullaries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn types(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.entries.keys().copied()
    }
}

/// Where a function build places newly introduced parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Positions are handed out in order, starting at 0.
    Free,
    /// The frame is a dataset row with this schema. A new parameter of a
    /// type may read any column of that type not read yet.
    Bound(Vec<TypeTag>),
}

/// The parameters introduced while building one function body, layered
/// over a [`Scope`] for the duration of that build only.
#[derive(Debug, Clone)]
pub struct Parameters {
    layout: Layout,
    introduced: Vec<Parameter>,
}

impl Parameters {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            introduced: Vec::new(),
        }
    }

    pub fn introduced(&self) -> &[Parameter] {
        &self.introduced
    }

    pub fn into_params(self) -> Vec<Parameter> {
        self.introduced
    }

    pub fn contains(&self, index: usize) -> bool {
        self.introduced.iter().any(|p| p.position == index)
    }

    /// Choices reading parameters of type `ty` introduced so far.
    pub fn accessors(&self, ty: TypeTag) -> Vec<Choice> {
        self.introduced.iter()
            .filter(|p| p.ty == ty)
            .map(|p| Choice::Accessor(p.position))
            .collect()
    }

    /// Choices introducing a new parameter of type `ty`.
    pub fn fresh(&self, ty: TypeTag) -> Vec<Choice> {
        match &self.layout {
            Layout::Free => vec![Choice::NewParameter {
                ty,
                index: self.introduced.len(),
            }],
            Layout::Bound(schema) => schema.iter()
                .enumerate()
                .filter(|(index, col)| **col == ty && !self.contains(*index))
                .map(|(index, _)| Choice::NewParameter { ty, index })
                .collect(),
        }
    }

    pub fn introduce(&mut self, ty: TypeTag, index: usize) {
        debug_assert!(!self.contains(index), "parameter ?{index} introduced twice");

        self.introduced.push(Parameter::new(ty, index));
    }
}
