use crate::error::{PermissionError, PermissionResult};
use crate::mapper::permission_name;
use serde::{Deserialize, Serialize};

/// A user's access grant on a broker virtual host, as exchanged over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub user: String,
    pub vhost: String,
    #[serde(default)]
    pub access: Access,
}

/// Regular expressions evaluated by the broker's authorization model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub read: String,
    #[serde(default)]
    pub write: String,
    #[serde(default)]
    pub configure: String,
}

impl Access {
    pub fn new(read: &str, write: &str, configure: &str) -> Self {
        Self { read: read.to_string(), write: write.to_string(), configure: configure.to_string() }
    }
}

impl PermissionRecord {
    pub fn new(user: &str, vhost: &str, access: Access) -> Self {
        Self { user: user.to_string(), vhost: vhost.to_string(), access }
    }

    pub fn validate(&self) -> PermissionResult<()> {
        validate_identity(&self.user, &self.vhost)
    }
}

pub fn validate_identity(user: &str, vhost: &str) -> PermissionResult<()> {
    if user.trim().is_empty() {
        return Err(PermissionError::InvalidRecord("user must not be empty".to_string()));
    }
    if vhost.trim().is_empty() {
        return Err(PermissionError::InvalidRecord("vhost must not be empty".to_string()));
    }

    let name = permission_name(user, vhost);
    if !is_dns1123_subdomain(&name) {
        return Err(PermissionError::InvalidRecord(format!(
            "user {user:?} on vhost {vhost:?} gives resource name {name:?}, which is not a \
             valid DNS-1123 subdomain (lowercase letters, digits, '-' and '.')"
        )));
    }
    Ok(())
}

const MAX_NAME_LEN: usize = 253;

fn is_dns1123_subdomain(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN
        && name.split('.').all(|label| {
            let bytes = label.as_bytes();
            !bytes.is_empty()
                && bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
                && bytes[0] != b'-'
                && bytes[bytes.len() - 1] != b'-'
        })
}
