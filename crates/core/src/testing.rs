//! Collaborator fakes for tests in this and downstream crates.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use keyward_common::AppError;

use crate::services::{MailError, MailSender, TaskFailureReporter};

/// One captured mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    /// Recipient.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Mail sender that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingMailSender {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailSender {
    /// Messages sent so far.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                html_body: html_body.to_string(),
            });
        Ok(())
    }
}

/// Mail sender whose transport always fails.
#[derive(Debug, Default)]
pub struct FailingMailSender {
    attempts: Mutex<usize>,
}

impl FailingMailSender {
    /// Number of send attempts.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MailSender for FailingMailSender {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> Result<(), MailError> {
        *self.attempts.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Err(MailError::Transport("connection refused".to_string()))
    }
}

/// Failure reporter that keeps `(task, message)` pairs.
#[derive(Debug, Default)]
pub struct RecordingFailureReporter {
    failures: Mutex<Vec<(String, String)>>,
}

impl RecordingFailureReporter {
    /// Failures reported so far.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TaskFailureReporter for RecordingFailureReporter {
    fn report(&self, task: &str, error: &AppError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((task.to_string(), error.to_string()));
    }
}
