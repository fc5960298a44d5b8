//! Ownership of the single live session
//!
//! At most one session exists at a time. Replacing it always closes the old
//! one first, so no sockets from a previous credential are left open.
//! Responses are owned by callers and are dropped before they issue the next
//! request, which releases their connection.

use tracing::{debug, info};
use transport::{ApiRequest, ApiResponse, HttpSession, HttpSettings, Session, TransportError};
use twitter_auth::{Credential, OAuth1Signer};

use crate::error::{Error, Result};
use crate::metrics;

/// Opens an authenticated session for a credential.
pub trait Connect: Send + Sync {
    fn connect(&self, credential: &Credential) -> std::result::Result<Box<dyn Session>, TransportError>;
}

/// Builds reqwest sessions signed with OAuth 1.0a.
pub struct HttpConnector {
    settings: HttpSettings,
}

impl HttpConnector {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl Connect for HttpConnector {
    fn connect(&self, credential: &Credential) -> std::result::Result<Box<dyn Session>, TransportError> {
        let signer = OAuth1Signer::new(credential.clone());
        let session = HttpSession::new(&self.settings, Box::new(signer))?;
        Ok(Box::new(session))
    }
}

pub struct SessionManager {
    connector: Box<dyn Connect>,
    session: Option<Box<dyn Session>>,
    active: Option<usize>,
}

impl SessionManager {
    pub fn new(connector: Box<dyn Connect>) -> Self {
        Self {
            connector,
            session: None,
            active: None,
        }
    }

    /// Index of the credential the session belongs to.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Make `index` the active credential, reconnecting only if it changed
    /// or there is no live session.
    pub fn activate(&mut self, index: usize, credential: &Credential) -> Result<()> {
        if self.active == Some(index) && self.session.is_some() {
            return Ok(());
        }
        if let Some(previous) = self.active.filter(|&p| p != index) {
            info!(from = previous, to = index, "switching credential");
        }
        self.active = Some(index);
        metrics::set_active_credential(index);
        self.reconnect(credential)
    }

    /// Close the current session and open a new one for `credential`.
    pub fn reconnect(&mut self, credential: &Credential) -> Result<()> {
        if !credential.is_complete() {
            return Err(Error::MissingCredentials(format!(
                "credential {} is missing {}",
                self.active.map(|i| i.to_string()).unwrap_or_default(),
                credential.missing_parts().join(", ")
            )));
        }
        self.close();
        debug!(credential = ?self.active, "creating http session");
        self.session = Some(self.connector.connect(credential)?);
        Ok(())
    }

    pub async fn execute(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| TransportError::Connect("no active session".into()))?;
        Ok(session.execute(request).await?)
    }

    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!(credential = ?self.active, "closing existing http session");
            session.close();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}
