use log::trace;

use crate::{
    error::{Error, Result},
    expr::FunctionNode,
    program::{Function, FunctionId, Program},
    scope::{Layout, Parameters, Scope},
    search::{Choice, SearchCoordinator},
    value::TypeTag,
};

/// Grows expression trees by asking a coordinator to pick, at every hole,
/// among the grammar's choices for the hole's type.
pub struct Builder<'a, C: ?Sized> {
    program: &'a mut Program,
    scope: &'a mut Scope,
    coordinator: &'a mut C,
    helpers: bool,
}

impl<'a, C> Builder<'a, C>
where
    C: SearchCoordinator<Choice> + ?Sized,
{
    pub fn new(program: &'a mut Program, scope: &'a mut Scope, coordinator: &'a mut C) -> Self {
        Self {
            program,
            scope,
            coordinator,
            helpers: false,
        }
    }

    /// Also offer [`Choice::NewFunction`] at every hole with depth left.
    pub fn with_helpers(mut self, helpers: bool) -> Self {
        self.helpers = helpers;
        self
    }

    /// Builds a whole function body. The function is returned
    /// unregistered; its parameters are the ones the body introduced.
    pub fn build_function(
        &mut self,
        name: impl Into<String>,
        ret: TypeTag,
        layout: Layout,
        allow_new_parameters: bool,
        depth: usize,
    ) -> Result<Function> {
        let mut params = Parameters::new(layout);
        let body = self.build(&mut params, ret, allow_new_parameters, depth)?;

        Ok(Function::synthesized(name, ret, params.into_params(), body))
    }

    /// Builds a tree producing `ty`. At depth zero only nullary functions
    /// and already introduced parameters are offered.
    pub fn build(
        &mut self,
        params: &mut Parameters,
        ty: TypeTag,
        allow_new_parameters: bool,
        depth: usize,
    ) -> Result<FunctionNode> {
        let mut choices = self.scope.candidates(ty, depth > 0);
        choices.extend(params.accessors(ty));
        if allow_new_parameters && depth > 0 {
            choices.extend(params.fresh(ty));
        }
        if self.helpers && depth > 0 {
            choices.push(Choice::NewFunction);
        }

        if choices.is_empty() {
            return Err(Error::DeadEnd { ty: ty.name() });
        }

        let choice = self.coordinator.choose(&choices)?;
        if !choices.contains(&choice) {
            return Err(Error::UnexpectedChoice(choice.to_string()));
        }

        trace!("{ty} at depth {depth}: {choice}");

        match choice {
            Choice::Reuse(id) => self.reuse(id, params, allow_new_parameters, depth),
            Choice::Accessor(index) => Ok(FunctionNode::parameter(index)),
            Choice::NewParameter { ty, index } => {
                params.introduce(ty, index);
                Ok(FunctionNode::parameter(index))
            },
            Choice::NewFunction => self.helper(params, ty, allow_new_parameters, depth),
            Choice::Terminate => Err(Error::UnexpectedChoice(choice.to_string())),
        }
    }

    fn reuse(
        &mut self,
        id: FunctionId,
        params: &mut Parameters,
        allow_new_parameters: bool,
        depth: usize,
    ) -> Result<FunctionNode> {
        let function = self.program.get(id)?;
        let native = function.native().cloned();
        let children = function.param_types().into_iter()
            .map(|ty| self.build(params, ty, allow_new_parameters, depth.saturating_sub(1)))
            .collect::<Result<Vec<_>>>()?;

        Ok(match native {
            Some(native) => FunctionNode::primitive(id, native, children),
            None => FunctionNode::call(id, children),
        })
    }

    /// Synthesizes a helper with its own parameters, registers it, then
    /// builds its arguments in the enclosing function.
    fn helper(
        &mut self,
        params: &mut Parameters,
        ty: TypeTag,
        allow_new_parameters: bool,
        depth: usize,
    ) -> Result<FunctionNode> {
        let depth = depth.saturating_sub(1);
        let mut own = Parameters::new(Layout::Free);
        let body = self.build(&mut own, ty, true, depth)?;

        let id = self.program.next_id();
        let helper = Function::synthesized(format!("fn{}", id.index()), ty, own.into_params(), body);
        let arg_types = helper.param_types();
        self.program.register(helper);
        self.scope.add_function(id, self.program.get(id)?);

        let children = arg_types.into_iter()
            .map(|ty| self.build(params, ty, allow_new_parameters, depth))
            .collect::<Result<Vec<_>>>()?;

        Ok(FunctionNode::call(id, children))
    }
}
