use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a data source outside the dashboard core.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UpstreamError {
    /// The collaborator answered with `success: false`.
    #[error("{0}")]
    Reported(String),
    /// The collaborator could not be reached or produced unreadable data.
    #[error("{0}")]
    Unavailable(String),
    /// Nothing was captured for this source.
    #[error("{0} was not captured")]
    NotCaptured(String),
}

impl UpstreamError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Reply of the command-execution service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The raw text to parse, or the collaborator's failure.
    pub fn text(&self) -> Result<&str, UpstreamError> {
        if self.success {
            Ok(self.output.as_deref().unwrap_or_default())
        } else {
            let message = self
                .error
                .clone()
                .unwrap_or_else(|| "command failed without a message".to_string());
            Err(UpstreamError::Reported(message))
        }
    }
}

/// Result of turning a source into records: data, nothing usable, or an upstream failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    NoData,
    Failed(UpstreamError),
}

impl<T> Outcome<Vec<T>> {
    /// `NoData` when no row survived parsing.
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Outcome::NoData
        } else {
            Outcome::Ready(rows)
        }
    }
}

impl<T> Outcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::NoData => Outcome::NoData,
            Outcome::Failed(error) => Outcome::Failed(error),
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_command_carries_message() {
        let output = CommandOutput::failed("permission denied");
        assert_eq!(
            output.text(),
            Err(UpstreamError::Reported("permission denied".into()))
        );
    }

    #[test]
    fn successful_command_without_output_is_empty_text() {
        let output = CommandOutput {
            success: true,
            output: None,
            error: None,
        };
        assert_eq!(output.text(), Ok(""));
    }

    #[test]
    fn command_output_deserializes_both_shapes() {
        let ok: CommandOutput =
            serde_json::from_str(r#"{"success": true, "output": "a\nb"}"#).unwrap();
        assert_eq!(ok.text(), Ok("a\nb"));
        let err: CommandOutput =
            serde_json::from_str(r#"{"success": false, "error": "boom"}"#).unwrap();
        assert!(err.text().is_err());
    }

    #[test]
    fn empty_rows_are_no_data() {
        let outcome: Outcome<Vec<u8>> = Outcome::from_rows(Vec::new());
        assert_eq!(outcome, Outcome::NoData);
        assert!(Outcome::from_rows(vec![1]).is_ready());
    }

    #[test]
    fn not_captured_mentions_source() {
        let error = UpstreamError::NotCaptured("ps aux".into());
        assert_eq!(error.to_string(), "ps aux was not captured");
    }
}
