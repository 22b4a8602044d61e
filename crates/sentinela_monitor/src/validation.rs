//! Structured validation errors for `check_monitor`/`register_monitor`,
//! shaped after the `loc`/`type`/`msg` triples `monitor_routes.py` forwards
//! from `pydantic.ValidationError`, per the Design Note "Exception-for-
//! control-flow in request validation" in `spec.md` §9: a result variant
//! carrying a structured error list instead of a raised exception.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub loc: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub msg: String,
}

impl ValidationIssue {
    pub fn new(loc: impl Into<Vec<String>>, kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            kind: kind.into(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("monitor code didn't pass validation: {message}")]
pub struct MonitorValidationError {
    pub message: String,
    pub errors: Vec<ValidationIssue>,
}

impl MonitorValidationError {
    pub fn single(loc: &str, kind: &str, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            message: "Module didn't pass check".to_string(),
            errors: vec![ValidationIssue::new(vec![loc.to_string()], kind, msg)],
        }
    }
}
