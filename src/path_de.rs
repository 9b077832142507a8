use serde::de::DeserializeOwned;

use crate::error::{SchemaError, SchemaResult};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> SchemaResult<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_decode_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> SchemaResult<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_decode_error)
}

/// Same as [`from_str_with_path`] for an already-parsed value (config `schemas` entries, fixtures).
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> SchemaResult<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_decode_error)
}

fn into_decode_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> SchemaError {
    let path = err.path().to_string();
    SchemaError::Decode { path, message: err.into_inner().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Outer { inner: Vec<Inner> }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Inner { count: u32 }

    #[test]
    fn decode_error_reports_json_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner":[{"count":1},{"count":"x"}]}"#).unwrap_err();
        match err {
            SchemaError::Decode { path, .. } => assert_eq!(path, "inner[1].count"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
