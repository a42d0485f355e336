//! Directory bind handling
//!
//! Turns a bind request (DN, credentials, optional method) into one of the
//! three outcomes the protocol endpoint reports back.

use adlite_core::utils::principal_from_bind_dn;
use adlite_core::Error;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::provider::AuthProvider;

/// LDAP result code for a successful bind
pub const LDAP_SUCCESS: u32 = 0;
/// LDAP result code for a server-side failure
pub const LDAP_OPERATIONS_ERROR: u32 = 1;
/// LDAP result code for a rejected bind
pub const LDAP_INVALID_CREDENTIALS: u32 = 49;

/// Simple bind as extracted from the wire
#[derive(Clone)]
pub struct BindRequest {
    pub dn: String,
    pub credentials: Vec<u8>,
    /// Authentication method name; the provider default when absent
    pub method: Option<String>,
}

impl BindRequest {
    pub fn new(dn: impl Into<String>, credentials: impl Into<Vec<u8>>) -> Self {
        Self {
            dn: dn.into(),
            credentials: credentials.into(),
            method: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

impl fmt::Debug for BindRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindRequest")
            .field("dn", &self.dn)
            .field("credentials", &"<redacted>")
            .field("method", &self.method)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindResult {
    Success,
    InvalidCredentials,
    OperationsError(String),
}

impl BindResult {
    pub fn result_code(&self) -> u32 {
        match self {
            BindResult::Success => LDAP_SUCCESS,
            BindResult::InvalidCredentials => LDAP_INVALID_CREDENTIALS,
            BindResult::OperationsError(_) => LDAP_OPERATIONS_ERROR,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BindResult::Success)
    }

    fn label(&self) -> &'static str {
        match self {
            BindResult::Success => "success",
            BindResult::InvalidCredentials => "invalid_credentials",
            BindResult::OperationsError(_) => "operations_error",
        }
    }
}

impl From<Error> for BindResult {
    fn from(err: Error) -> Self {
        if err.is_credential_failure() {
            BindResult::InvalidCredentials
        } else {
            BindResult::OperationsError(format!("{}: {}", err.code(), err))
        }
    }
}

pub struct BindHandler {
    provider: Arc<AuthProvider>,
    base_dn: String,
}

impl BindHandler {
    pub fn new(provider: Arc<AuthProvider>, base_dn: impl Into<String>) -> Self {
        Self {
            provider,
            base_dn: base_dn.into(),
        }
    }

    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    pub async fn bind(&self, request: &BindRequest) -> BindResult {
        let result = self.try_bind(request).await;

        counter!("adlite_bind_total", "result" => result.label()).increment(1);
        match &result {
            BindResult::Success => info!(dn = %request.dn, "Bind succeeded"),
            BindResult::InvalidCredentials => debug!(dn = %request.dn, "Bind rejected"),
            BindResult::OperationsError(msg) => warn!(dn = %request.dn, "Bind failed: {}", msg),
        }
        result
    }

    async fn try_bind(&self, request: &BindRequest) -> BindResult {
        // Unauthenticated and anonymous binds are not accepted
        if request.credentials.is_empty() {
            return BindResult::InvalidCredentials;
        }

        let principal = match principal_from_bind_dn(&request.dn, &self.base_dn) {
            Ok(principal) => principal,
            Err(e) => return e.into(),
        };

        match self
            .provider
            .authenticate(&principal, &request.credentials, request.method.as_deref())
            .await
        {
            Ok(true) => BindResult::Success,
            Ok(false) => BindResult::InvalidCredentials,
            Err(e) => e.into(),
        }
    }
}
