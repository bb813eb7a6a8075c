use std::{any::Any, fmt};

use crate::{
    error::{Error, Result},
    expr::{FunctionNode, Native, NodeKind},
    value::{TypeTag, Value},
};

/// Stable handle of a function inside a [`Program`]. Ids survive cloning
/// the program, so they can be held by scopes, choices and models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(usize);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter {
    pub ty: TypeTag,
    pub position: usize,
}

impl Parameter {
    pub fn new(ty: TypeTag, position: usize) -> Self {
        Self { ty, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Wraps a host callable.
    Primitive,
    /// Written by the host out of other functions.
    Defined,
    /// Produced by the synthesizer.
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    ret: TypeTag,
    params: Vec<Parameter>,
    body: FunctionNode,
    origin: Origin,
}

impl Function {
    pub fn synthesized(
        name: impl Into<String>,
        ret: TypeTag,
        params: Vec<Parameter>,
        body: FunctionNode,
    ) -> Self {
        Self {
            name: name.into(),
            ret,
            params,
            body,
            origin: Origin::Synthesized,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> TypeTag {
        self.ret
    }

    /// The parameter multiset, in the order the parameters were declared.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Parameter types ordered by position.
    pub fn param_types(&self) -> Vec<TypeTag> {
        let mut params = self.params.clone();
        params.sort_by_key(|p| p.position);

        params.into_iter().map(|p| p.ty).collect()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_nullary(&self) -> bool {
        self.params.is_empty()
    }

    /// Smallest frame the body can be evaluated against.
    pub fn frame_len(&self) -> usize {
        self.params.iter()
            .map(|p| p.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether the positions are exactly `0..arity`. Only such functions
    /// can be called from a node, since a call frame is built from the
    /// node's children in order.
    pub fn is_dense(&self) -> bool {
        self.frame_len() == self.params.len()
    }

    pub fn body(&self) -> &FunctionNode {
        &self.body
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn native(&self) -> Option<&Native> {
        match (&self.origin, &self.body.kind) {
            (Origin::Primitive, NodeKind::Primitive(_, native)) => Some(native),
            _ => None,
        }
    }

    /// Contribution to a program's size. Primitives are free.
    pub fn cost(&self) -> usize {
        match self.origin {
            Origin::Primitive => 0,
            Origin::Defined | Origin::Synthesized => self.body.node_count(),
        }
    }

    pub fn call(&self, program: &Program, args: &[Value]) -> Result<Value> {
        if args.len() < self.frame_len() {
            return Err(Error::ArityMismatch {
                function: self.name.clone(),
                expected: self.frame_len(),
                found: args.len(),
            });
        }

        for param in &self.params {
            let found = args[param.position].type_tag();
            if found != param.ty {
                return Err(Error::TypeMismatch {
                    expected: param.ty.name(),
                    found: found.name(),
                });
            }
        }

        let res = self.body.eval(program, args)?;
        if res.type_tag() != self.ret {
            return Err(Error::TypeMismatch {
                expected: self.ret.name(),
                found: res.type_tag().name(),
            });
        }

        Ok(res)
    }

    pub fn repr(&self, program: &Program) -> String {
        match self.origin {
            Origin::Primitive => self.name.clone(),
            Origin::Defined | Origin::Synthesized => self.body.repr(program),
        }
    }
}

/// Typed closures that can be registered as primitives. Implemented for
/// `Fn` of up to four arguments whose arguments and result are `'static`.
pub trait IntoNative<Args> {
    fn signature() -> (TypeTag, Vec<TypeTag>);

    fn into_native(self, name: &str) -> Native;
}

macro_rules! impl_into_native {
    ($($arg:ident $val:ident),*) => {
        impl<F, R, $($arg,)*> IntoNative<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: Any,
            $($arg: Any + Clone,)*
        {
            fn signature() -> (TypeTag, Vec<TypeTag>) {
                (TypeTag::of::<R>(), vec![$(TypeTag::of::<$arg>()),*])
            }

            fn into_native(self, name: &str) -> Native {
                let name = name.to_string();
                let expected = 0usize $(+ { let _ = stringify!($val); 1 })*;

                Native::new(move |args: &[Value]| {
                    let [$($val),*] = args else {
                        return Err(Error::ArityMismatch {
                            function: name.clone(),
                            expected,
                            found: args.len(),
                        });
                    };
                    $(let $val = $val.read::<$arg>()?;)*

                    Ok(Value::new(self($($val),*)))
                })
            }
        }
    };
}

impl_into_native!();
impl_into_native!(A a);
impl_into_native!(A a, B b);
impl_into_native!(A a, B b, C c);
impl_into_native!(A a, B b, C c, D d);

/// An append-only arena of functions.
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: Vec<Function>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The id the next registered function will receive.
    pub fn next_id(&self) -> FunctionId {
        FunctionId(self.functions.len())
    }

    pub fn register(&mut self, function: Function) -> FunctionId {
        let id = self.next_id();
        self.functions.push(function);

        id
    }

    pub fn register_primitive<Args, F>(&mut self, name: impl Into<String>, f: F) -> FunctionId
    where
        F: IntoNative<Args>,
    {
        let name = name.into();
        let (ret, params) = F::signature();
        let native = f.into_native(&name);

        self.push_primitive(name, ret, &params, native)
    }

    /// Registers a callable that may fail. In well-formed trees `f` only
    /// ever receives operands of the types listed in `params`.
    pub fn register_native<F>(
        &mut self,
        name: impl Into<String>,
        ret: TypeTag,
        params: &[TypeTag],
        f: F,
    ) -> FunctionId
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.push_primitive(name.into(), ret, params, Native::new(f))
    }

    fn push_primitive(
        &mut self,
        name: String,
        ret: TypeTag,
        params: &[TypeTag],
        native: Native,
    ) -> FunctionId {
        let id = self.next_id();
        let params = params.iter()
            .enumerate()
            .map(|(position, ty)| Parameter::new(*ty, position))
            .collect::<Vec<_>>();
        let body = FunctionNode::primitive(
            id,
            native,
            (0..params.len()).map(FunctionNode::parameter).collect(),
        );

        self.register(Function {
            name,
            ret,
            params,
            body,
            origin: Origin::Primitive,
        })
    }

    /// Registers a host-written function after checking that `body` is
    /// well typed against `params` and returns `ret`.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        ret: TypeTag,
        params: Vec<Parameter>,
        body: FunctionNode,
    ) -> Result<FunctionId> {
        let name = name.into();
        let found = self.check_node(&body, &params)?;
        if found != ret {
            return Err(Error::TypeMismatch {
                expected: ret.name(),
                found: found.name(),
            });
        }

        Ok(self.register(Function {
            name,
            ret,
            params,
            body,
            origin: Origin::Defined,
        }))
    }

    /// Checks that every node's children match its target's parameters in
    /// count and type, and returns the type `node` produces.
    pub fn check_node(&self, node: &FunctionNode, params: &[Parameter]) -> Result<TypeTag> {
        let id = match &node.kind {
            NodeKind::Parameter(index) => {
                return params.iter()
                    .find(|p| p.position == *index)
                    .map(|p| p.ty)
                    .ok_or(Error::ParameterOutOfBounds {
                        index: *index,
                        len: params.len(),
                    });
            },
            NodeKind::Primitive(id, _) | NodeKind::Call(id) => *id,
        };
        let target = self.get(id)?;
        let expected = target.param_types();

        if expected.len() != node.children.len() {
            return Err(Error::ArityMismatch {
                function: target.name.clone(),
                expected: expected.len(),
                found: node.children.len(),
            });
        }

        for (ty, child) in expected.iter().zip(&node.children) {
            let found = self.check_node(child, params)?;
            if found != *ty {
                return Err(Error::TypeMismatch {
                    expected: ty.name(),
                    found: found.name(),
                });
            }
        }

        Ok(target.ret)
    }

    pub fn get(&self, id: FunctionId) -> Result<&Function> {
        self.functions.get(id.0).ok_or(Error::UnknownFunction(id.0))
    }

    pub fn call(&self, id: FunctionId, args: &[Value]) -> Result<Value> {
        self.get(id)?.call(self, args)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions.iter()
            .enumerate()
            .map(|(idx, f)| (FunctionId(idx), f))
    }

    /// Total size of every non-primitive body.
    pub fn node_count(&self) -> usize {
        self.functions.iter().map(Function::cost).sum()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, function) in self.iter() {
            let params = function.params.iter()
                .map(|p| format!("?{}: {}", p.position, p.ty))
                .collect::<Vec<_>>()
                .join(", ");

            match function.origin {
                Origin::Primitive => writeln!(
                    f,
                    "{}({params}) -> {}",
                    function.name,
                    function.ret,
                )?,
                Origin::Defined | Origin::Synthesized => writeln!(
                    f,
                    "{}({params}) -> {} = {}",
                    function.name,
                    function.ret,
                    function.repr(self),
                )?,
            }
        }

        Ok(())
    }
}
