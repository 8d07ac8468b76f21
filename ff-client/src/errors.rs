pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Connectivity(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not found")]
    NotFound,
    #[error("Operation rejected ({status}): {message}")]
    Operation { status: u16, message: String },
}

impl BackendError {
    pub fn operation(status: u16, message: impl Into<String>) -> Self {
        BackendError::Operation {
            status,
            message: message.into(),
        }
    }

    /// Map an unsuccessful HTTP status onto the failure taxonomy.
    ///
    /// `auth_route` marks the login/signup/me endpoints, where a client error
    /// means the credentials (or the signup) were refused.
    pub fn from_status(status: u16, body: String, auth_route: bool) -> Self {
        match status {
            404 => BackendError::NotFound,
            401 | 403 => BackendError::Auth(body),
            400 | 409 | 422 if auth_route => BackendError::Auth(body),
            _ => BackendError::operation(status, body),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            BackendError::Connectivity(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::from_status(status.as_u16(), e.to_string(), false)
        } else {
            // Undecodable bodies and the like
            BackendError::operation(0, e.to_string())
        }
    }
}

pub type FormResult<T> = std::result::Result<T, FormError>;

#[derive(thiserror::Error, Debug)]
pub enum FormError {
    #[error("A recipe needs a title")]
    MissingTitle,
    #[error("{field} must be a whole number, got {input:?}")]
    NotANumber { field: &'static str, input: String },
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Unknown difficulty: {0} (expected Easy, Medium or Hard)")]
    UnknownDifficulty(String),
    #[error("The form is not open")]
    NotEditing,
    #[error("Could not read photo: {0}")]
    Photo(#[from] std::io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
