//! Run-time error types.
//!
//! ```text
//! Error
//! ├── Build(BuildError)   - synthesis failed; nothing was cached
//! └── Fault(Fault)        - executing a method failed
//!     ├── Thrown              - a script exception nobody caught
//!     └── host faults         - limits, malformed bytecode, bad dispatch
//! ```
//!
//! Only [`Fault::Thrown`] is visible to catch clauses. Every other fault
//! aborts the whole call chain back to the host, running the finally bodies
//! it crosses.

use std::sync::Arc;

use thiserror::Error;
use typeforge_core::{BuildError, KnownException};

use crate::value::ScriptException;

/// Errors raised while executing methods.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    /// A script exception escaped every protected region.
    #[error("uncaught exception {0}")]
    Thrown(Arc<ScriptException>),

    #[error("call depth exceeded the limit of {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("operand stack of '{method}' exceeded the limit of {limit}")]
    StackOverflow { method: String, limit: usize },

    #[error("'{class}' has no method '{member}'")]
    MissingMethod { class: String, member: String },

    #[error("abstract method '{class}.{method}' was called")]
    AbstractCall { class: String, method: String },

    #[error("invalid bytecode in '{method}' at offset {offset}: {detail}")]
    InvalidBytecode {
        method: String,
        offset: usize,
        detail: String,
    },

    #[error("operand stack underflow in '{method}'")]
    StackUnderflow { method: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },
}

impl Fault {
    /// Throw a new script exception of a built-in kind.
    pub fn throw<K: KnownException>(message: impl Into<String>) -> Self {
        Fault::Thrown(Arc::new(ScriptException::of::<K>(message)))
    }

    pub(crate) fn missing_method(class: &str, member: impl Into<String>) -> Self {
        Fault::MissingMethod {
            class: class.to_string(),
            member: member.into(),
        }
    }

    /// The script exception carried by [`Fault::Thrown`].
    pub fn exception(&self) -> Option<&ScriptException> {
        match self {
            Fault::Thrown(e) => Some(e),
            _ => None,
        }
    }
}

/// Any error the host API can return.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl Error {
    pub fn as_build(&self) -> Option<&BuildError> {
        match self {
            Error::Build(e) => Some(e),
            Error::Fault(_) => None,
        }
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Error::Fault(f) => Some(f),
            Error::Build(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
