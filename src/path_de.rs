use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(Error::Decode(format!("at JSON path {path} → {}", err.into_inner())))
        }
    }
}
