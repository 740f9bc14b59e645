use serde::{Deserialize, Serialize};

/// Dispatcher behaviour switches.
///
/// Deserializable so binaries can read it from a config file; every field
/// has a default, so a partial table is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Answer notifications whose processing failed after the envelope was
    /// accepted. The error response carries `id: null`.
    pub notification_errors: bool,
    /// Convert the method name and object param keys from camelCase to
    /// snake_case before resolution.
    pub convert_camel_case: bool,
    /// Copy a handler's failure message into the `data` of internal errors
    pub expose_error_data: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            notification_errors: false,
            convert_camel_case: false,
            expose_error_data: true,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notification_errors(mut self, enable: bool) -> Self {
        self.notification_errors = enable;
        self
    }

    pub fn convert_camel_case(mut self, enable: bool) -> Self {
        self.convert_camel_case = enable;
        self
    }

    pub fn expose_error_data(mut self, enable: bool) -> Self {
        self.expose_error_data = enable;
        self
    }
}
