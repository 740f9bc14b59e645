use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::MethodError;

/// Parameters bound to a method's declared signature.
///
/// Declared parameters are addressed by name whether the client sent them
/// positionally or by keyword. Surplus positional values and unmatched keys
/// only appear here when the signature declared variadic capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    named: Map<String, Value>,
    rest: Vec<Value>,
    extra: Map<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        named: Map<String, Value>,
        rest: Vec<Value>,
        extra: Map<String, Value>,
    ) -> Self {
        Self { named, rest, extra }
    }

    /// Builder used mostly by tests and by handlers calling one another
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    /// Raw value of a declared parameter, if it was supplied
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Deserialize a declared parameter.
    ///
    /// A missing or ill-typed value is an `InvalidParams` failure, which is
    /// how a method rejects e.g. a string where it wanted a number.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, MethodError> {
        let value = self
            .named
            .get(name)
            .ok_or_else(|| MethodError::invalid_params(format!("missing parameter '{}'", name)))?;
        decode(name, value.clone())
    }

    /// Like [`get`](Self::get) for optional parameters; absent or `null`
    /// yields `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, MethodError> {
        match self.named.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode(name, value.clone()).map(Some),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, MethodError> {
        Ok(self.get_opt(name)?.unwrap_or(default))
    }

    /// Surplus positional values captured by a variadic signature
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Decode every captured positional value as `T`
    pub fn rest_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, MethodError> {
        self.rest
            .iter()
            .enumerate()
            .map(|(i, value)| decode(&format!("#{}", i), value.clone()))
            .collect()
    }

    /// Unmatched keys captured by a variadic-keyword signature
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Deserialize all named and extra values as one object, for methods
    /// that prefer a typed parameter struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, MethodError> {
        let mut object = self.named.clone();
        for (key, value) in &self.extra {
            object.entry(key.clone()).or_insert_with(|| value.clone());
        }
        serde_json::from_value(Value::Object(object))
            .map_err(|err| MethodError::invalid_params(err.to_string()))
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.rest.len() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: Value) -> Result<T, MethodError> {
    serde_json::from_value(value)
        .map_err(|err| MethodError::invalid_params(format!("parameter '{}': {}", name, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_typed_access() {
        let args = Arguments::new().with("a", json!(2)).with("name", json!("x"));

        assert_eq!(args.get::<i64>("a").unwrap(), 2);
        assert_eq!(args.get::<String>("name").unwrap(), "x");
        assert!(matches!(
            args.get::<i64>("missing"),
            Err(MethodError::InvalidParams(_))
        ));
        assert!(matches!(
            args.get::<i64>("name"),
            Err(MethodError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_optional_access() {
        let args = Arguments::new().with("n", Value::Null);
        assert_eq!(args.get_opt::<i64>("n").unwrap(), None);
        assert_eq!(args.get_opt::<i64>("absent").unwrap(), None);
        assert_eq!(args.get_or("absent", 10i64).unwrap(), 10);
    }

    #[test]
    fn test_parse_struct() {
        #[derive(Deserialize)]
        struct Point {
            x: f64,
            y: f64,
        }

        let mut extra = Map::new();
        extra.insert("y".into(), json!(4.0));
        let mut named = Map::new();
        named.insert("x".into(), json!(1.5));
        let args = Arguments::from_parts(named, vec![], extra);

        let point: Point = args.parse().unwrap();
        assert_eq!((point.x, point.y), (1.5, 4.0));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_rest_as() {
        let args = Arguments::from_parts(Map::new(), vec![json!(1), json!(2)], Map::new());
        assert_eq!(args.rest_as::<i32>().unwrap(), vec![1, 2]);

        let bad = Arguments::from_parts(Map::new(), vec![json!("x")], Map::new());
        assert!(bad.rest_as::<i32>().is_err());
    }
}
