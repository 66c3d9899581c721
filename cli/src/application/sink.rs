//! Helpers shared by every record stream: failure records and terminal markers.

use deckhand_common::{BuildRecord, PipelineRecord, ProvisionRecord, StreamEnd};

use crate::application::ports::LogSink;

/// Record types that can carry a `sys-failure` message.
pub trait FailureRecord {
    fn failure_record(message: String) -> Self;
}

impl FailureRecord for ProvisionRecord {
    fn failure_record(message: String) -> Self {
        Self::failure(message)
    }
}

impl FailureRecord for PipelineRecord {
    fn failure_record(message: String) -> Self {
        Self::failure(message)
    }
}

impl FailureRecord for BuildRecord {
    fn failure_record(message: String) -> Self {
        Self::failure(message)
    }
}

/// Message carried by failure records: the error and its context chain.
#[must_use]
pub fn failure_message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

/// Terminal marker for the outcome of an operation.
#[must_use]
pub fn end_marker<T>(result: &anyhow::Result<T>) -> StreamEnd {
    match result {
        Ok(_) => StreamEnd::Success,
        Err(e) => StreamEnd::Failure {
            message: failure_message(e),
        },
    }
}

/// Close a stream that failed before doing any work and hand the error back.
pub fn reject<R: FailureRecord>(sink: &impl LogSink<R>, err: anyhow::Error) -> anyhow::Error {
    let message = failure_message(&err);
    sink.emit(R::failure_record(message.clone()));
    sink.end(StreamEnd::Failure { message });
    err
}
