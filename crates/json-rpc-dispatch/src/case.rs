//! camelCase → snake_case conversion for method names and param keys

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::request::RequestParams;

static WORD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// `getUserName` → `get_user_name`, `HTTPResponse` → `http_response`
pub fn to_snake_case(name: &str) -> String {
    let spaced = WORD_START.replace_all(name, "${1}_${2}");
    LOWER_UPPER
        .replace_all(&spaced, "${1}_${2}")
        .to_lowercase()
}

/// Convert the top-level keys of object params; positional params are
/// returned untouched.
///
/// Two keys that convert to the same name (`userId` and `user_id`) are
/// rejected with the colliding name rather than one silently replacing
/// the other.
pub fn convert_params(params: RequestParams) -> Result<RequestParams, String> {
    match params {
        RequestParams::Object(map) => {
            let mut converted = Map::with_capacity(map.len());
            for (key, value) in map {
                let key = to_snake_case(&key);
                if converted.contains_key(&key) {
                    return Err(key);
                }
                converted.insert(key, value);
            }
            Ok(RequestParams::Object(converted))
        }
        positional => Ok(positional),
    }
}
