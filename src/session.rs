use crate::models::backup_request::BackupRequest;
use crate::models::error::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cloneable handle to a session's stop flag, polled by the pipeline between
/// files.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The signed-in operator and the ticket the backup is filed under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub user_name: Option<String>,
}

/// Context created once at process start and passed explicitly to the
/// front end and the orchestrator.
#[derive(Clone)]
pub struct BackupSession {
    /// Operator running the backups
    user: Arc<Mutex<SessionUser>>,

    /// Ticket the current backup is filed under
    ticket_number: Arc<Mutex<Option<String>>>,

    /// Flag to signal backup should stop
    stop_signal: StopSignal,
}

impl BackupSession {
    /// Create a new session
    pub fn new() -> Self {
        Self {
            user: Arc::new(Mutex::new(SessionUser::default())),
            ticket_number: Arc::new(Mutex::new(None)),
            stop_signal: StopSignal::new(),
        }
    }

    pub fn set_user(&self, user_id: i64, user_name: Option<String>) {
        *self.user.lock().unwrap() = SessionUser { user_id, user_name };
    }

    pub fn get_user(&self) -> SessionUser {
        self.user.lock().unwrap().clone()
    }

    pub fn set_ticket_number(&self, ticket_number: Option<String>) {
        *self.ticket_number.lock().unwrap() = ticket_number;
    }

    pub fn get_ticket_number(&self) -> Option<String> {
        self.ticket_number.lock().unwrap().clone()
    }

    /// Get the stop signal handle for the pipeline
    pub fn get_stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    /// Signal that backup should stop
    pub fn request_stop(&self) {
        self.stop_signal.request_stop();
    }

    /// Reset the stop signal
    pub fn reset_stop_signal(&self) {
        self.stop_signal.reset();
    }

    /// Check if stop was requested
    pub fn is_stop_requested(&self) -> bool {
        self.stop_signal.is_stop_requested()
    }

    /// Build a request for the current user and ticket
    pub fn request(
        &self,
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
    ) -> Result<BackupRequest> {
        BackupRequest::new(
            source_path,
            destination_path,
            self.get_ticket_number(),
            self.get_user().user_id,
        )
    }

    /// Forget the user, ticket and any pending stop request
    pub fn end_session(&self) {
        *self.user.lock().unwrap() = SessionUser::default();
        *self.ticket_number.lock().unwrap() = None;
        self.reset_stop_signal();
    }
}

impl Default for BackupSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_session_user_and_ticket() {
        let session = BackupSession::new();
        session.set_user(42, Some("operator".to_string()));
        session.set_ticket_number(Some("INC-7".to_string()));

        let request = session.request("/data", "/backup").unwrap();
        assert_eq!(request.user_id(), 42);
        assert_eq!(request.ticket_number(), Some("INC-7"));
    }

    #[test]
    fn test_stop_signal_is_shared_with_clones() {
        let session = BackupSession::new();
        let signal = session.get_stop_signal();
        assert!(!signal.is_stop_requested());

        session.request_stop();
        assert!(signal.is_stop_requested());
        assert!(session.clone().is_stop_requested());

        session.reset_stop_signal();
        assert!(!signal.is_stop_requested());
    }

    #[test]
    fn test_end_session_clears_state() {
        let session = BackupSession::new();
        session.set_user(3, None);
        session.set_ticket_number(Some("T".to_string()));
        session.request_stop();

        session.end_session();

        assert_eq!(session.get_user(), SessionUser::default());
        assert_eq!(session.get_ticket_number(), None);
        assert!(!session.is_stop_requested());
    }
}
