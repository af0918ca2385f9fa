pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Invalid diagram config: {message}")]
    Config { message: String },

    #[error("Unknown node: {id}")]
    UnknownNode { id: String },

    #[error("Node is not a collapsible container: {id}")]
    NotAContainer { id: String },

    #[error("Invalid data event: {message}")]
    InvalidEvent { message: String },
}

/// Failure reported by a pluggable layout function. Aborts the render pass it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("layout `{layout}` failed: {message}")]
pub struct LayoutError {
    pub layout: String,
    pub message: String,
}

impl LayoutError {
    pub fn new(layout: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            message: message.into(),
        }
    }
}
