use std::{fmt, rc::Rc};

use crate::{
    error::{Error, Result},
    program::{FunctionId, Program},
    value::Value,
};

/// A host callable. It receives the already evaluated operands.
#[derive(Clone)]
pub struct Native(Rc<dyn Fn(&[Value]) -> Result<Value>>);

impl Native {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Native(Rc::new(f))
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<native>")
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Reads a slot of the current frame.
    Parameter(usize),
    /// Runs a native callable on operands evaluated in the current frame.
    Primitive(FunctionId, Native),
    /// Evaluates the operands into a fresh frame and runs the callee's body
    /// against it.
    Call(FunctionId),
}

#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub kind: NodeKind,
    pub children: Vec<FunctionNode>,
}

impl FunctionNode {
    pub fn parameter(index: usize) -> Self {
        Self {
            kind: NodeKind::Parameter(index),
            children: Vec::new(),
        }
    }

    pub fn primitive(function: FunctionId, native: Native, children: Vec<FunctionNode>) -> Self {
        Self {
            kind: NodeKind::Primitive(function, native),
            children,
        }
    }

    pub fn call(function: FunctionId, children: Vec<FunctionNode>) -> Self {
        Self {
            kind: NodeKind::Call(function),
            children,
        }
    }

    pub fn eval(&self, program: &Program, frame: &[Value]) -> Result<Value> {
        match &self.kind {
            NodeKind::Parameter(index) => {
                frame.get(*index)
                    .cloned()
                    .ok_or(Error::ParameterOutOfBounds {
                        index: *index,
                        len: frame.len(),
                    })
            },
            NodeKind::Primitive(_, native) => {
                let operands = self.eval_children(program, frame)?;

                native.invoke(&operands)
            },
            NodeKind::Call(id) => {
                let callee_frame = self.eval_children(program, frame)?;

                program.get(*id)?.call(program, &callee_frame)
            },
        }
    }

    fn eval_children(&self, program: &Program, frame: &[Value]) -> Result<Vec<Value>> {
        self.children.iter()
            .map(|child| child.eval(program, frame))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FunctionNode::node_count).sum::<usize>()
    }

    /// Structural rendering for logs, e.g. `or(?0,not(?2))`.
    pub fn repr(&self, program: &Program) -> String {
        let mut out = String::new();
        self.write_repr(program, &mut out);
        out
    }

    fn write_repr(&self, program: &Program, out: &mut String) {
        let id = match &self.kind {
            NodeKind::Parameter(index) => {
                out.push_str(&format!("?{index}"));
                return;
            },
            NodeKind::Primitive(id, _) | NodeKind::Call(id) => *id,
        };

        match program.get(id) {
            Ok(f) => out.push_str(f.name()),
            Err(_) => out.push_str(&format!("#{}", id.index())),
        }

        if self.children.is_empty() {
            return;
        }

        out.push('(');
        for (idx, child) in self.children.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            child.write_repr(program, out);
        }
        out.push(')');
    }
}
