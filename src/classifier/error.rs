use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierErrorKind {
    InvalidConfig,
    Authentication,
    Timeout,
    BackendTransient,
    BackendPermanent,
    ProtocolViolation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierError {
    pub kind: ClassifierErrorKind,
    pub message: String,
    pub provider_http_status: Option<u16>,
}

impl ClassifierError {
    pub fn new(kind: ClassifierErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_http_status: None,
        }
    }

    pub fn with_provider_http_status(mut self, status: u16) -> Self {
        self.provider_http_status = Some(status);
        self
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider_http_status {
            Some(status) => write!(f, "{} (http_status={})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ClassifierError {}

pub fn invalid_config(message: impl Into<String>) -> ClassifierError {
    ClassifierError::new(ClassifierErrorKind::InvalidConfig, message)
}

pub fn authentication_error(message: impl Into<String>) -> ClassifierError {
    ClassifierError::new(ClassifierErrorKind::Authentication, message)
}

pub fn protocol_violation(message: impl Into<String>) -> ClassifierError {
    ClassifierError::new(ClassifierErrorKind::ProtocolViolation, message)
}

pub fn internal_error(message: impl Into<String>) -> ClassifierError {
    ClassifierError::new(ClassifierErrorKind::Internal, message)
}
