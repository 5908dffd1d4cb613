use thiserror::Error;

pub type PermissionResult<T> = Result<T, PermissionError>;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("invalid permission record: {0}")]
    InvalidRecord(String),
    #[error("permission not found: {0}")]
    NotFound(String),
    #[error("permission already exists: {0}")]
    AlreadyExists(String),
    #[error("conflicting update: {0}")]
    Conflict(String),
    #[error("rejected by the api server: {0}")]
    Rejected(String),
    #[error("not authorized against the cluster: {0}")]
    NotAuthorized(String),
    #[error("cluster unavailable: {0}")]
    ClusterUnavailable(String),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PermissionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PermissionError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, PermissionError::AlreadyExists(_))
    }
}

impl From<kube::Error> for PermissionError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match (response.code, response.reason.as_str()) {
                (404, _) => PermissionError::NotFound(response.message),
                (409, "AlreadyExists") => PermissionError::AlreadyExists(response.message),
                (409, _) => PermissionError::Conflict(response.message),
                (401 | 403, _) => PermissionError::NotAuthorized(response.message),
                (400 | 422, _) => PermissionError::Rejected(response.message),
                _ => PermissionError::ClusterUnavailable(format!(
                    "{} ({})",
                    response.message, response.code
                )),
            },
            kube::Error::Auth(err) => PermissionError::NotAuthorized(err.to_string()),
            kube::Error::SerdeError(err) => PermissionError::Serialization(err),
            other => PermissionError::ClusterUnavailable(other.to_string()),
        }
    }
}
