//! Notification System Error Types

use thiserror::Error;

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notification system
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    /// Subscriber already exists
    #[error("Subscriber '{0}' already exists")]
    SubscriberAlreadyExists(String),
    
    /// Subscriber not found
    #[error("Subscriber '{0}' not found")]
    SubscriberNotFound(String),
    
    /// Event delivery failed
    #[error("Failed to deliver event to '{subscriber_id}': {error}")]
    DeliveryFailed {
        subscriber_id: String,
        error: String,
    },
    
    /// Rate limit exceeded
    #[error("Rate limit ({limit}/sec) exceeded for subscriber '{subscriber_id}'")]
    RateLimitExceeded {
        subscriber_id: String,
        limit: u32,
    },
    
    /// System shutdown in progress
    #[error("Notification system is shutting down")]
    SystemShutdown,
    
    /// Timeout occurred
    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },
    
    /// Generic error
    #[error("Notification error: {0}")]
    Generic(String),
}

impl NotificationError {
    /// Create a subscriber already exists error
    pub fn subscriber_already_exists<S: Into<String>>(id: S) -> Self {
        Self::SubscriberAlreadyExists(id.into())
    }
    
    /// Create a subscriber not found error
    pub fn subscriber_not_found<S: Into<String>>(id: S) -> Self {
        Self::SubscriberNotFound(id.into())
    }
    
    /// Create a delivery failed error
    pub fn delivery_failed<S: Into<String>, E: Into<String>>(subscriber_id: S, error: E) -> Self {
        Self::DeliveryFailed {
            subscriber_id: subscriber_id.into(),
            error: error.into(),
        }
    }
    
    /// Create a rate limit exceeded error
    pub fn rate_limit_exceeded<S: Into<String>>(subscriber_id: S, limit: u32) -> Self {
        Self::RateLimitExceeded {
            subscriber_id: subscriber_id.into(),
            limit,
        }
    }
    
    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }
    
    /// Create a generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}
