pub mod builder;
pub mod learner;
pub mod model;

use crate::{
    error::{Error, Result},
    value::{TypeTag, Value},
};

#[derive(Debug, Clone)]
pub struct Example {
    pub input: Vec<Value>,
    pub output: bool,
}

impl Example {
    pub fn new(input: impl IntoIterator<Item = Value>, output: bool) -> Self {
        Self {
            input: input.into_iter().collect(),
            output,
        }
    }
}

/// Labeled rows sharing one input schema. Read-only once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Vec<TypeTag>,
    examples: Vec<Example>,
}

impl Dataset {
    /// Checks every row against `schema`.
    pub fn new(schema: Vec<TypeTag>, examples: Vec<Example>) -> Result<Self> {
        for (row, example) in examples.iter().enumerate() {
            if example.input.len() != schema.len() {
                return Err(Error::RowShape {
                    row,
                    expected: schema.len(),
                    found: example.input.len(),
                });
            }

            for (value, ty) in example.input.iter().zip(&schema) {
                if value.type_tag() != *ty {
                    return Err(Error::TypeMismatch {
                        expected: ty.name(),
                        found: value.type_tag().name(),
                    });
                }
            }
        }

        Ok(Self { schema, examples })
    }

    /// Takes the schema from the first row.
    pub fn infer(examples: Vec<Example>) -> Result<Self> {
        let schema = examples.first()
            .map(|e| e.input.iter().map(Value::type_tag).collect())
            .unwrap_or_default();

        Self::new(schema, examples)
    }

    pub fn schema(&self) -> &[TypeTag] {
        &self.schema
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_must_match_the_schema() {
        let b = TypeTag::of::<bool>();

        assert!(matches!(
            Dataset::new(vec![b, b], vec![Example::new([true.into()], false)]),
            Err(Error::RowShape { row: 0, expected: 2, found: 1 }),
        ));
        assert!(matches!(
            Dataset::new(vec![b], vec![Example::new([1i32.into()], false)]),
            Err(Error::TypeMismatch { .. }),
        ));
    }

    #[test]
    fn infer_uses_the_first_row() {
        let data = Dataset::infer(vec![
            Example::new([true.into(), 3i32.into()], true),
            Example::new([false.into(), 4i32.into()], false),
        ])
        .unwrap();

        assert_eq!(data.schema(), &[TypeTag::of::<bool>(), TypeTag::of::<i32>()]);
        assert!(Dataset::infer(Vec::new()).unwrap().is_empty());
    }
}
