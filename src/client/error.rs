/// Failure taxonomy for resource calls. Each variant maps to a distinct
/// recovery path: `Unauthenticated` returns the user to the login boundary,
/// `Unauthorized` renders the 403 screen with the session intact,
/// `Validation` keeps the form open with the server's message, `Network`
/// puts the owning view in its failed terminal state, and `Upload` fails
/// the photo alone while the surrounding form stays usable.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not enough permissions")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
