//! Shared-secret access control.

use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::routing::Action;

/// Header carrying the shared secret.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Privilege level a request or connection was admitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Privileged,
    /// Admitted without a token under the anonymous-read policy.
    ReadOnly,
}

impl Access {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Access::ReadOnly)
    }

    /// Refuse mutating work for read-only sessions.
    pub fn require_write(&self) -> Result<(), Denial> {
        match self {
            Access::Privileged => Ok(()),
            Access::ReadOnly => Err(Denial::ReadOnly),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("Access token required")]
    MissingToken,

    #[error("Multiple access tokens")]
    AmbiguousToken,

    #[error("Invalid access token")]
    BadToken,

    #[error("Access denied")]
    ReadOnly,
}

impl Denial {
    pub fn status(&self) -> StatusCode {
        match self {
            Denial::MissingToken => StatusCode::UNAUTHORIZED,
            Denial::AmbiguousToken => StatusCode::BAD_REQUEST,
            Denial::BadToken | Denial::ReadOnly => StatusCode::FORBIDDEN,
        }
    }
}

/// Token check built from the listener configuration.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    token: Option<String>,
    read_anon: bool,
}

impl AccessGuard {
    /// An empty token disables the check; `start` refuses such a config,
    /// so this only happens for guards built directly.
    pub fn new(token: Option<String>, read_anon: bool) -> Self {
        if token.as_deref() == Some("") {
            warn!("empty access token configured, access control disabled");
        }
        Self {
            token: token.filter(|t| !t.is_empty()),
            read_anon,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.access_token.clone(), config.read_anon)
    }

    /// Decide access given whether the operation is eligible for anonymous reads.
    pub fn admit(&self, headers: &HeaderMap, anonymous_ok: bool) -> Result<Access, Denial> {
        let Some(expected) = &self.token else {
            return Ok(Access::Privileged);
        };
        let mut values = headers.get_all(ACCESS_TOKEN_HEADER).iter();
        let Some(presented) = values.next() else {
            if self.read_anon && anonymous_ok {
                return Ok(Access::ReadOnly);
            }
            return Err(Denial::MissingToken);
        };
        if values.next().is_some() {
            return Err(Denial::AmbiguousToken);
        }
        // Plain byte comparison; not constant-time.
        if presented.as_bytes() == expected.as_bytes() {
            Ok(Access::Privileged)
        } else {
            debug!("rejected request with mismatched access token");
            Err(Denial::BadToken)
        }
    }

    pub fn check_request(&self, headers: &HeaderMap, action: &Action) -> Result<Access, Denial> {
        self.admit(headers, action.allows_anonymous())
    }

    /// A WebSocket may be opened read-only; mutations are refused per message.
    pub fn check_upgrade(&self, headers: &HeaderMap) -> Result<Access, Denial> {
        self.admit(headers, true)
    }
}
