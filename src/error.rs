// Copyright 2024 TiKV Project Authors. Licensed under Apache-2.0.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Instrumentation misuse detected at runtime.
///
/// These never describe failures of the traced work. A failing unit of work
/// is ordinary data, reported through the `succeeded` flag of its end record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A span was ended again after it had already closed.
    #[error("section '{name}' has already ended")]
    EndedTwice { name: String },

    /// Strict mode saw a section name registered twice on one tracer.
    #[error("section name '{name}' is already in use")]
    DuplicateName { name: String },

    /// A carrier held remote linkage with a half missing or malformed.
    /// Remote info is all-or-nothing: both halves present, ids non-zero,
    /// scopes non-empty.
    #[error("incomplete remote info in context: {missing} is missing")]
    IncompleteRemoteInfo { missing: &'static str },
}

/// What a tracer does when it detects an [`Error`].
///
/// Chosen once at construction. `Panic` is the default: broken
/// instrumentation is a bug in the embedding program and should surface in
/// development. `Log` suits production binaries where tracing is
/// best-effort. Strict mode on [`Config`] overrides the policy and always
/// panics.
///
/// [`Config`]: crate::Config
#[derive(Clone, Default)]
pub enum ErrorPolicy {
    #[default]
    Panic,
    Log,
    Custom(Arc<dyn Fn(&Error) + Send + Sync>),
}

impl ErrorPolicy {
    pub(crate) fn handle(&self, err: Error) {
        match self {
            ErrorPolicy::Panic => panic!("{}", err),
            ErrorPolicy::Log => log::error!("{}", err),
            ErrorPolicy::Custom(f) => f(&err),
        }
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Panic => f.write_str("Panic"),
            ErrorPolicy::Log => f.write_str("Log"),
            ErrorPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
