//! Error tracing extensions
//!
//! Provides utilities for enriching error handling with tracing context.

use crate::types::SeatError;
use std::error::Error as StdError;

/// Extension trait for adding tracing context to errors
pub trait ErrorTraceExt {
    /// Log error with full context including error code, retryable status, and error chain
    fn trace_error(&self) -> &Self;
}

impl ErrorTraceExt for SeatError {
    fn trace_error(&self) -> &Self {
        let error_code = self.error_code();

        let mut error_chain = Vec::new();
        let mut current_source = self.source();
        while let Some(source) = current_source {
            error_chain.push(source.to_string());
            current_source = source.source();
        }

        tracing::error!(
            error = %self,
            error_code = error_code.name(),
            is_retryable = self.is_retryable(),
            is_client_error = self.is_client_error(),
            error_chain = ?error_chain,
            "Error occurred with full context"
        );

        self
    }
}

/// Extension trait for Result types
pub trait ResultTraceExt<T, E>: Sized {
    /// Convert error to SeatError and log with context
    fn trace_context(self) -> Result<T, SeatError>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultTraceExt<T, E> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
    SeatError: From<E>,
{
    fn trace_context(self) -> Result<T, SeatError> {
        self.map_err(|e| {
            let seat_error = SeatError::from(e);
            seat_error.trace_error();
            seat_error
        })
    }
}
