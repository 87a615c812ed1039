//! Conversions from external infrastructure errors into domain errors.

use armis_domain::ArmisError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ArmisError);

impl From<InfraError> for ArmisError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ArmisError> for InfraError {
    fn from(value: ArmisError) -> Self {
        InfraError(value)
    }
}

trait IntoArmisError {
    fn into_armis(self) -> ArmisError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ArmisError */
/* -------------------------------------------------------------------------- */

impl IntoArmisError for HttpError {
    fn into_armis(self) -> ArmisError {
        if self.is_builder() {
            return ArmisError::Validation(format!("invalid HTTP request: {self}"));
        }

        if self.is_timeout() {
            return ArmisError::Transport(format!("HTTP request timed out: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return ArmisError::Transport(format!("HTTP connection failure: {self}"));
        }

        // Only produced by `error_for_status`, which the executor never calls;
        // the body is gone by then.
        if let Some(status) = self.status() {
            return ArmisError::api(status.as_u16(), Vec::new());
        }

        if self.is_decode() {
            return ArmisError::Decode(self.to_string());
        }

        ArmisError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_armis())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ArmisError */
/* -------------------------------------------------------------------------- */

impl IntoArmisError for JsonError {
    fn into_armis(self) -> ArmisError {
        use serde_json::error::Category;

        match self.classify() {
            Category::Io => ArmisError::Transport(format!("failed to read JSON: {self}")),
            Category::Eof => ArmisError::Decode(format!("truncated JSON: {self}")),
            Category::Syntax => ArmisError::Decode(format!("malformed JSON: {self}")),
            Category::Data => ArmisError::Decode(format!("unexpected JSON shape: {self}")),
        }
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_armis())
    }
}

/* -------------------------------------------------------------------------- */
/* Configuration sources → ArmisError::Config */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(ArmisError::Config(format!("failed to read config file: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(ArmisError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(ArmisError::Config(format!("invalid base URL: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
