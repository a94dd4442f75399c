//! JSON report generation

use crate::CoreResult;
use serde::Serialize;

pub fn generate<T: Serialize + ?Sized>(value: &T) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
