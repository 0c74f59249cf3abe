//! Transient state of one GET request.

use tokio::time::Instant;
use tracing::trace;

/// Where a request is in its lifecycle. Ordered: transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttemptStatus {
    Resolving,
    Connecting,
    Connected,
    Requesting,
    ReceivingBody,
    BodyComplete,
    /// Terminal; the attempt is never reused
    Error,
}

/// Exclusively owned by the `get` call that created it
#[derive(Debug)]
pub struct ConnectionAttempt {
    status: AttemptStatus,
    response_code: Option<u16>,
    body: Vec<u8>,
    /// Ticks spent without progress in the current status
    idle_ticks: u64,
    deadline: Option<Instant>,
}

impl ConnectionAttempt {
    pub(crate) fn new(deadline: Option<Instant>) -> Self {
        Self {
            status: AttemptStatus::Resolving,
            response_code: None,
            body: Vec::new(),
            idle_ticks: 0,
            deadline,
        }
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub(crate) fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Move forward; backwards moves and moves out of `Error` are ignored
    pub(crate) fn advance(&mut self, next: AttemptStatus) {
        if self.status == AttemptStatus::Error || next <= self.status {
            return;
        }
        trace!(from = ?self.status, to = ?next, "Attempt transition");
        self.status = next;
        self.idle_ticks = 0;
    }

    pub(crate) fn record_response_code(&mut self, code: u16) {
        self.response_code = Some(code);
    }

    pub(crate) fn tick(&mut self) {
        self.idle_ticks += 1;
    }

    pub(crate) fn append(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
        self.idle_ticks = 0;
    }

    /// Enter the terminal error state, dropping any partial body
    pub(crate) fn fail(&mut self) {
        self.status = AttemptStatus::Error;
        self.body = Vec::new();
    }

    /// Take the body of a completed attempt
    pub(crate) fn into_body(self) -> Vec<u8> {
        if self.status == AttemptStatus::BodyComplete {
            self.body
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        let mut attempt = ConnectionAttempt::new(None);
        attempt.advance(AttemptStatus::Connected);
        attempt.advance(AttemptStatus::Connecting);
        assert_eq!(attempt.status(), AttemptStatus::Connected);

        attempt.advance(AttemptStatus::Requesting);
        assert_eq!(attempt.status(), AttemptStatus::Requesting);
    }

    #[test]
    fn test_error_is_terminal_and_drops_body() {
        let mut attempt = ConnectionAttempt::new(None);
        attempt.advance(AttemptStatus::ReceivingBody);
        attempt.append(b"partial");
        assert_eq!(attempt.body_len(), 7);

        attempt.fail();
        attempt.advance(AttemptStatus::BodyComplete);
        assert_eq!(attempt.status(), AttemptStatus::Error);
        assert_eq!(attempt.body_len(), 0);
        assert!(attempt.into_body().is_empty());
    }

    #[test]
    fn test_progress_resets_idle_ticks() {
        let mut attempt = ConnectionAttempt::new(None);
        attempt.tick();
        attempt.tick();
        assert_eq!(attempt.idle_ticks(), 2);

        attempt.append(b"x");
        assert_eq!(attempt.idle_ticks(), 0);

        attempt.tick();
        attempt.advance(AttemptStatus::Connected);
        assert_eq!(attempt.idle_ticks(), 0);
    }

    #[test]
    fn test_incomplete_attempt_yields_no_body() {
        let mut attempt = ConnectionAttempt::new(None);
        attempt.advance(AttemptStatus::ReceivingBody);
        attempt.append(b"data");
        assert!(attempt.into_body().is_empty());
    }
}
