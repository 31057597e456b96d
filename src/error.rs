use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown enum value {value}.")]
    UnknownEnumValue { value: String, path: String },

    #[error("Missing required value for {path}.")]
    MissingField { path: String },

    #[error("Entity kind {kind} is a singleton and was already emitted.")]
    DuplicateSingleton { kind: &'static str },

    #[error("Failed to serialize {file_name}: {source}")]
    Serialize {
        file_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub fn unknown_enum(value: impl Into<String>, path: impl Into<String>) -> Self {
        Self::UnknownEnumValue {
            value: value.into(),
            path: path.into(),
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnknownEnumValue { path, .. } | Self::MissingField { path } => Some(path),
            Self::DuplicateSingleton { .. } | Self::Serialize { .. } => None,
        }
    }

    pub fn diagnostic(&self) -> Value {
        json!({
            "type": "error",
            "message": self.to_string(),
            "path": self.path(),
        })
    }
}

pub fn diagnostic_for(err: &anyhow::Error) -> Value {
    if let Some(pipeline) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
    {
        return pipeline.diagnostic();
    }
    json!({
        "type": "error",
        "message": format!("{err:#}"),
        "path": Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn unknown_enum_diagnostic_carries_path() {
        let err = PipelineError::unknown_enum("0999: ODD", "property.property_type");
        let diag = err.diagnostic();
        assert_eq!(diag["type"], "error");
        assert_eq!(diag["path"], "property.property_type");
        assert_eq!(diag["message"], "Unknown enum value 0999: ODD.");
    }

    #[test]
    fn diagnostic_survives_anyhow_context() {
        let err = Err::<(), _>(PipelineError::missing("property.parcel_identifier"))
            .context("building parcel graph")
            .expect_err("should fail");
        let diag = diagnostic_for(&err);
        assert_eq!(diag["path"], "property.parcel_identifier");
    }

    #[test]
    fn io_failures_have_no_path() {
        let err = anyhow::anyhow!("disk full");
        let diag = diagnostic_for(&err);
        assert!(diag["path"].is_null());
        assert_eq!(diag["message"], "disk full");
    }

    #[test]
    fn diagnostic_renders_as_one_json_line() {
        let err = Err::<(), _>(anyhow::anyhow!("line one\nline two"))
            .context("Failed to write data/property.json")
            .expect_err("should fail");
        let line = diagnostic_for(&err).to_string();
        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).expect("json");
        assert_eq!(
            parsed["message"],
            "Failed to write data/property.json: line one\nline two"
        );
    }
}
