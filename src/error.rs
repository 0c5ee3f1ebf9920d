use crate::types::JsValue;

/// Errors surfaced to the embedding host.
///
/// Language-level errors (`TypeError`, `RangeError`, ...) are ordinary
/// values travelling in [`Completion::Throw`](crate::Completion::Throw);
/// this type only describes how a whole evaluation ended.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The program finished with a thrown value nobody caught.
    #[error("Uncaught {message}")]
    Uncaught { message: String, value: JsValue },

    /// A `break` or `continue` escaped every enclosing statement.
    #[error("Illegal {0} statement")]
    UnexpectedCompletion(&'static str),
}

impl EngineError {
    /// The thrown value, if this error carries one.
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            EngineError::Uncaught { value, .. } => Some(value),
            EngineError::UnexpectedCompletion(_) => None,
        }
    }
}
