use std::fmt;

use config::ConfigError;
use serde::Deserialize;

/// A replication endpoint, compared by structural equality.
///
/// Used both for the upstream node the relay pulls from and for the local
/// address downstream replicas attach to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: String,
    pub port: u16,
}

impl Endpoint {
    /// Validation with context for error messages
    pub(crate) fn validate(
        &self,
        section: &str,
    ) -> std::result::Result<(), ConfigError> {
        if self.addr.is_empty() {
            return Err(ConfigError::Message(format!("{section}.addr must not be empty")));
        }

        // Port range 1..=65535; zero means "unset" and is rejected.
        if self.port == 0 {
            return Err(ConfigError::Message(format!("{section}.port must be in 1..=65535")));
        }

        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}
