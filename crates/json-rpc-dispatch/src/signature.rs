//! Call signatures and parameter binding.
//!
//! Every registered method declares a [`Signature`] up front. Binding is a
//! pure function of that descriptor and the incoming `params`, so arity and
//! naming mistakes are rejected before the handler ever runs.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::arguments::Arguments;
use crate::error::RegistryError;
use crate::request::RequestParams;

/// Why a set of params could not be bound to a signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("expected at least {expected} positional argument(s), got {got}")]
    TooFewArguments { expected: usize, got: usize },

    #[error("expected at most {expected} positional argument(s), got {got}")]
    TooManyArguments { expected: usize, got: usize },

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("unexpected parameter '{0}'")]
    UnexpectedParameter(String),
}

/// Declared shape of a method's parameters.
///
/// Positional order is every required parameter in declaration order,
/// followed by every optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    required: Vec<String>,
    optional: Vec<String>,
    variadic_positional: bool,
    variadic_keyword: bool,
}

impl Signature {
    /// A method taking no parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// All parameters required, in the given order
    pub fn positional<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Accepts anything: every value lands in the variadic captures
    pub fn variadic() -> Self {
        Self::new().variadic_positional().variadic_keyword()
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.optional.push(name.into());
        self
    }

    /// Capture surplus positional values instead of rejecting them
    pub fn variadic_positional(mut self) -> Self {
        self.variadic_positional = true;
        self
    }

    /// Capture unmatched keys instead of rejecting them
    pub fn variadic_keyword(mut self) -> Self {
        self.variadic_keyword = true;
        self
    }

    /// Declared parameter names in positional order
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .map(String::as_str)
    }

    pub fn min_arity(&self) -> usize {
        self.required.len()
    }

    /// `None` when surplus positional values are captured
    pub fn max_arity(&self) -> Option<usize> {
        (!self.variadic_positional).then(|| self.required.len() + self.optional.len())
    }

    pub fn accepts_variadic_positional(&self) -> bool {
        self.variadic_positional
    }

    pub fn accepts_variadic_keyword(&self) -> bool {
        self.variadic_keyword
    }

    /// Registration-time sanity check
    pub(crate) fn check(&self, method: &str) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for name in self.parameters() {
            if !seen.insert(name) {
                return Err(RegistryError::DuplicateParameter {
                    method: method.to_string(),
                    parameter: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Bind request params to this signature
    pub fn bind(&self, params: Option<RequestParams>) -> Result<Arguments, BindError> {
        match params {
            None => self.bind_positional(Vec::new()),
            Some(RequestParams::Array(items)) => self.bind_positional(items),
            Some(RequestParams::Object(map)) => self.bind_named(map),
        }
    }

    fn bind_positional(&self, items: Vec<Value>) -> Result<Arguments, BindError> {
        let got = items.len();
        if got < self.min_arity() {
            return Err(BindError::TooFewArguments {
                expected: self.min_arity(),
                got,
            });
        }
        if let Some(max) = self.max_arity() {
            if got > max {
                return Err(BindError::TooManyArguments { expected: max, got });
            }
        }

        let mut items = items.into_iter();
        let named: Map<String, Value> = self
            .parameters()
            .zip(items.by_ref())
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let rest: Vec<Value> = items.collect();

        Ok(Arguments::from_parts(named, rest, Map::new()))
    }

    fn bind_named(&self, mut map: Map<String, Value>) -> Result<Arguments, BindError> {
        let mut named = Map::new();

        for name in &self.required {
            let value = map
                .remove(name)
                .ok_or_else(|| BindError::MissingParameter(name.clone()))?;
            named.insert(name.clone(), value);
        }
        for name in &self.optional {
            if let Some(value) = map.remove(name) {
                named.insert(name.clone(), value);
            }
        }

        if !map.is_empty() && !self.variadic_keyword {
            let mut unexpected: Vec<&String> = map.keys().collect();
            unexpected.sort();
            return Err(BindError::UnexpectedParameter(unexpected[0].clone()));
        }

        Ok(Arguments::from_parts(named, Vec::new(), map))
    }
}
