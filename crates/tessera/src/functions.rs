//! Function registry exposed to template bodies.
//!
//! A [`Functions`] registry is handed to the cache before loading and bound
//! into the root of every compiled template, so every sub-definition of a
//! composition can call the same functions.
//!
//! [`Functions::std`] provides the standard set:
//!
//! | Function | Result |
//! |----------|--------|
//! | `add(a, b)` | `a + b` |
//! | `mul(a, b)` | `a * b` |
//! | `mod(a, b)` | `a mod b`, in `[0, b)` for positive `b` |
//! | `signed(n)` | unsigned `n` as a signed integer |
//! | `count(n)` | `[0, 1, ..., n - 1]` |
//! | `interval(low, high, step)` | `[low, low + step, ...]` below `high` |
//! | `str(value)` / `str(value, pattern)` | display form, `none` as `""` |

use std::collections::BTreeMap;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::{Environment, Error, ErrorKind};

/// Named functions callable from template bodies.
#[derive(Debug, Clone, Default)]
pub struct Functions {
    entries: BTreeMap<String, Value>,
}

impl Functions {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the standard functions.
    pub fn std() -> Self {
        let mut functions = Self::new();
        functions
            .add("add", std_add)
            .add("mul", std_mul)
            .add("mod", std_mod)
            .add("signed", std_signed)
            .add("count", std_count)
            .add("interval", std_interval)
            .add("str", std_str);
        functions
    }

    /// Registers a function, replacing any previous one with the same name.
    ///
    /// Accepts anything minijinja accepts as a function: closures or fns whose
    /// arguments convert from template values.
    pub fn add<N, F, Rv, Args>(&mut self, name: N, f: F) -> &mut Self
    where
        N: Into<String>,
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.entries.insert(name.into(), Value::from_function(f));
        self
    }

    /// Merges another registry into this one. Entries of `other` win.
    pub fn extend(&mut self, other: Functions) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }

    /// Returns true if a function with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn bind(&self, env: &mut Environment<'static>) {
        for (name, function) in &self.entries {
            env.add_global(name.clone(), function.clone());
        }
    }
}

fn std_add(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

fn std_mul(a: i64, b: i64) -> i64 {
    a.wrapping_mul(b)
}

fn std_mod(a: i64, b: i64) -> Result<i64, Error> {
    a.checked_rem_euclid(b).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("mod({a}, {b}) is undefined"),
        )
    })
}

fn std_signed(n: u64) -> i64 {
    n as i64
}

fn std_count(n: i64) -> Vec<i64> {
    (0..n.max(0)).collect()
}

fn std_interval(low: i64, high: i64, step: i64) -> Result<Vec<i64>, Error> {
    if step <= 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("interval step must be positive, got {step}"),
        ));
    }
    let step = usize::try_from(step)
        .map_err(|_| Error::new(ErrorKind::InvalidOperation, "interval step too large"))?;
    Ok((low..high).step_by(step).collect())
}

fn std_str(value: Value, pattern: Option<String>) -> String {
    let shown = if value.is_none() || value.is_undefined() {
        String::new()
    } else {
        value.to_string()
    };
    match pattern {
        Some(pattern) => pattern.replace("{}", &shown),
        None => shown,
    }
}
