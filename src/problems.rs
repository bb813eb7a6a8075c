//! Small learning problems with their primitive sets, runnable from the
//! command line.

use crate::{
    error::Result,
    program::Program,
    synth::{learner::LearnerConfig, Dataset, Example},
    value::Value,
};

pub struct Problem {
    pub name: &'static str,
    pub description: &'static str,
    setup: fn() -> Result<(Program, Dataset)>,
    /// Integer problems need a longer binning search per node.
    max_split_attempts: Option<usize>,
}

impl Problem {
    /// A fresh program holding the problem's primitives, and its data.
    pub fn setup(&self) -> Result<(Program, Dataset)> {
        (self.setup)()
    }

    /// The default configuration adjusted for this problem.
    pub fn config(&self) -> LearnerConfig {
        let mut config = LearnerConfig::default();
        if let Some(attempts) = self.max_split_attempts {
            config.max_split_attempts = attempts;
        }

        config
    }
}

pub static PROBLEMS: &[Problem] = &[
    Problem {
        name: "and-or-not",
        description: "x2 && !x0 && !x1 over three booleans, with and/or/not",
        setup: and_or_not,
        max_split_attempts: None,
    },
    Problem {
        name: "xor3",
        description: "x0 ^ x1 ^ x2 with one row missing, with exor/exor3",
        setup: xor3,
        max_split_attempts: None,
    },
    Problem {
        name: "and-xor3",
        description: "x0 && (x1 ^ x2 ^ x3) with three rows missing, with exor/and",
        setup: and_xor3,
        max_split_attempts: None,
    },
    Problem {
        name: "between",
        description: "0 < x < 3 on -3..=6, with 0/succ/>/</&&",
        setup: between,
        max_split_attempts: Some(4096),
    },
    Problem {
        name: "square-less",
        description: "x * x < y, with 0/succ/square/>/</&&",
        setup: square_less,
        max_split_attempts: Some(4096),
    },
    Problem {
        name: "product-less",
        description: "x * y < y, with 0/succ/square/*/>/</&&",
        setup: product_less,
        max_split_attempts: Some(4096),
    },
];

pub fn find(name: &str) -> Option<&'static Problem> {
    PROBLEMS.iter().find(|p| p.name == name)
}

fn bools<const N: usize>(rows: &[([bool; N], bool)]) -> Result<Dataset> {
    Dataset::infer(rows.iter()
        .map(|(input, output)| Example::new(input.iter().map(|b| Value::from(*b)), *output))
        .collect())
}

fn ints<const N: usize>(rows: &[([i32; N], bool)]) -> Result<Dataset> {
    Dataset::infer(rows.iter()
        .map(|(input, output)| Example::new(input.iter().map(|x| Value::from(*x)), *output))
        .collect())
}

fn exor(x: bool, y: bool) -> bool {
    x != y
}

fn int_basics(program: &mut Program) {
    program.register_primitive("0", || 0i32);
    program.register_primitive("succ", |n: i32| n.wrapping_add(1));
}

fn int_comparisons(program: &mut Program) {
    program.register_primitive(">", |x: i32, y: i32| x > y);
    program.register_primitive("<", |x: i32, y: i32| x < y);
    program.register_primitive("&&", |x: i32, y: i32| x != 0 && y != 0);
}

fn and_or_not() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    program.register_primitive("and", |x: bool, y: bool| x && y);
    program.register_primitive("or", |x: bool, y: bool| x || y);
    program.register_primitive("not", |x: bool| !x);

    let data = bools(&[
        ([false, false, false], false),
        ([false, false, true], true),
        ([true, false, false], false),
        ([false, true, false], false),
    ])?;

    Ok((program, data))
}

fn xor3() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    program.register_primitive("exor", exor);
    program.register_primitive("exor3", |x: bool, y: bool, z: bool| exor(exor(x, y), z));

    let data = bools(&[
        ([false, false, false], false),
        ([false, false, true], true),
        ([false, true, false], true),
        ([false, true, true], false),
        ([true, false, false], true),
        ([true, true, false], false),
        ([true, true, true], true),
    ])?;

    Ok((program, data))
}

fn and_xor3() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    program.register_primitive("exor", exor);
    program.register_primitive("and", |x: bool, y: bool| x && y);

    let data = bools(&[
        ([false, false, false, false], false),
        ([false, false, false, true], false),
        ([false, false, true, false], false),
        ([false, true, false, false], false),
        ([false, true, false, true], false),
        ([false, true, true, false], false),
        ([false, true, true, true], false),
        ([true, false, false, false], false),
        ([true, false, false, true], true),
        ([true, false, true, true], false),
        ([true, true, false, false], true),
        ([true, true, false, true], false),
        ([true, true, true, true], true),
    ])?;

    Ok((program, data))
}

fn between() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    int_basics(&mut program);
    int_comparisons(&mut program);

    let rows = (-3..=6)
        .map(|x| ([x], 0 < x && x < 3))
        .collect::<Vec<_>>();
    let data = ints(rows.as_slice())?;

    Ok((program, data))
}

fn square_less() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    int_basics(&mut program);
    program.register_primitive("square", |n: i32| n.wrapping_mul(n));
    int_comparisons(&mut program);

    let data = ints(&[
        ([0, 0], false), ([0, 1], true), ([0, 2], true), ([1, 0], false),
        ([1, 2], true), ([2, 3], false), ([2, 4], false), ([2, 5], true),
        ([7, 49], false), ([7, 50], true),
    ])?;

    Ok((program, data))
}

fn product_less() -> Result<(Program, Dataset)> {
    let mut program = Program::new();
    int_basics(&mut program);
    program.register_primitive("square", |n: i32| n.wrapping_mul(n));
    program.register_primitive("*", |n: i32, m: i32| n.wrapping_mul(m));
    int_comparisons(&mut program);

    let data = ints(&[
        ([0, 0], false), ([0, 1], true), ([0, 2], true), ([1, 1], false),
        ([1, 2], false), ([1, 3], false), ([2, 1], false), ([2, 2], false),
        ([-1, 1], true), ([-10, 1], true),
    ])?;

    Ok((program, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problems_are_well_formed() {
        for problem in PROBLEMS {
            let (program, data) = problem.setup().unwrap();

            assert!(!program.is_empty(), "{}", problem.name);
            assert!(!data.is_empty(), "{}", problem.name);
            assert!(data.examples().iter().any(|e| e.output), "{}", problem.name);
            assert!(data.examples().iter().any(|e| !e.output), "{}", problem.name);
            assert_eq!(problem.config().validate(), Ok(()));
        }

        assert!(find("xor3").is_some());
        assert!(find("nope").is_none());
    }
}
