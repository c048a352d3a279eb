//! Error kinds for the fisheries population-dynamics core.
//!
//! Diagnostics (`kTrace`..`kImportant`) are non-fatal and are expected to be
//! routed through `tracing`, not through `FscError`; this crate models the
//! kinds that can actually abort a build/run or be recovered as an infinite
//! objective: `kWarning`, `kVerify`, `kError`, `kFatal`, `kCodeError`.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

pub type FscResult<T> = Result<T, FscError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Surfaced in a summary but does not abort, except in test mode where
    /// warnings are promoted to errors.
    Warning,
    /// Post-`Build` consistency check; fatal unless explicitly downgraded.
    Verify,
    /// Domain or configuration error; recovered locally by the objective
    /// evaluator as `+inf`, or accumulated into a batch that aborts the run.
    Error,
    /// Unrecoverable; flushes the error batch and aborts the process.
    Fatal,
    /// Internal invariant violation. Same disposition as `Fatal`, flagged
    /// as a bug rather than a user-facing configuration problem.
    CodeError,
    Multiple,
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<Cow<'static, str>>> From<T> for ErrString {
    fn from(v: T) -> Self {
        Self(v.into())
    }
}

#[derive(Debug)]
pub enum FscError {
    Warning {
        message: ErrString,
    },
    /// Raised during `Build`'s post-construction consistency pass.
    Verify {
        message: ErrString,
    },
    Error {
        message: ErrString,
    },
    Fatal {
        message: ErrString,
    },
    CodeError {
        message: ErrString,
    },
    Multiple(MultiDisplay),
    Context {
        context: ErrorContext,
        source: Box<FscError>,
    },
}

impl FscError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Warning { .. } => ErrorKind::Warning,
            Self::Verify { .. } => ErrorKind::Verify,
            Self::Error { .. } => ErrorKind::Error,
            Self::Fatal { .. } => ErrorKind::Fatal,
            Self::CodeError { .. } => ErrorKind::CodeError,
            Self::Multiple(_) => ErrorKind::Multiple,
            Self::Context { .. } => ErrorKind::Context,
        }
    }

    /// True for kinds the objective evaluator recovers locally as `+inf`
    /// rather than propagating out of `Build`.
    pub fn is_recoverable_as_infinite_objective(&self) -> bool {
        matches!(self.kind(), ErrorKind::Error)
    }

    /// True for kinds that abort the process once the error batch is
    /// flushed (`kFatal`, `kCodeError`, and an unrecovered `kVerify`).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Fatal | ErrorKind::CodeError | ErrorKind::Verify
        )
    }

    pub fn with_context(self, msg: impl Into<String>) -> Self {
        FscError::Context {
            context: ErrorContext::new(msg),
            source: Box::new(self),
        }
    }
}

impl Display for FscError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning { message } => write!(f, "warning: {}", message),
            Self::Verify { message } => write!(f, "verify failure: {}", message),
            Self::Error { message } => write!(f, "error: {}", message),
            Self::Fatal { message } => write!(f, "fatal: {}", message),
            Self::CodeError { message } => write!(f, "internal invariant violated: {}", message),
            Self::Multiple(m) => write!(f, "{} errors:\n{}", m.0.len(), m),
            Self::Context { context, source } => write!(f, "{}\ncaused by: {}", context, source),
        }
    }
}

impl std::error::Error for FscError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ErrorContext {
    message: String,
}

impl ErrorContext {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl Display for ErrorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorContext {}

/// A batch of errors accumulated together and flushed as one numbered
/// summary.
#[derive(Debug, Default)]
pub struct ErrorBatch(Vec<FscError>);

impl ErrorBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FscError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_fatal(&self) -> bool {
        self.0.iter().any(FscError::is_fatal)
    }

    /// Renders the batch as a numbered summary suitable for a fatal exit.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}: {}", i + 1, e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_result(self) -> FscResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(FscError::Multiple(self.0.into()))
        }
    }
}

#[derive(Debug)]
pub struct MultiDisplay(Vec<FscError>);

impl Display for MultiDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {} (kind: {:?})", i, e, e.kind())?;
        }
        Ok(())
    }
}

impl From<Vec<FscError>> for MultiDisplay {
    fn from(v: Vec<FscError>) -> Self {
        Self(v)
    }
}

pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> FscResult<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> FscResult<T>;
}

impl<T, E: Into<FscError>> ResultExt<T> for Result<T, E> {
    fn context(self, msg: impl Into<String>) -> FscResult<T> {
        self.map_err(|e| e.into().with_context(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> FscResult<T> {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[doc(hidden)]
pub mod __private {
    #[inline]
    #[cold]
    #[must_use]
    pub fn must_use<E>(e: E) -> E {
        e
    }
}

#[macro_export]
macro_rules! fsc_err {
    (Warning: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::FscError::Warning { message: format!($fmt, $($arg),*).into() })
    };
    (Verify: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::FscError::Verify { message: format!($fmt, $($arg),*).into() })
    };
    (Error: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::FscError::Error { message: format!($fmt, $($arg),*).into() })
    };
    (Fatal: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::FscError::Fatal { message: format!($fmt, $($arg),*).into() })
    };
    (CodeError: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use($crate::FscError::CodeError { message: format!($fmt, $($arg),*).into() })
    };
}

#[macro_export]
macro_rules! fsc_bail {
    ($($tt:tt)+) => { return Err($crate::fsc_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::fsc_bail!($($tt)+); }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_dispositions() {
        let e = fsc_err!(Error: "domain error at age {}", 5);
        assert_eq!(e.kind(), ErrorKind::Error);
        assert!(e.is_recoverable_as_infinite_objective());
        assert!(!e.is_fatal());

        let f = fsc_err!(Fatal: "unrecoverable");
        assert!(f.is_fatal());
        assert!(!f.is_recoverable_as_infinite_objective());

        let c = fsc_err!(CodeError: "invariant violated");
        assert!(c.is_fatal());
    }

    #[test]
    fn batch_flushes_numbered_summary() {
        let mut batch = ErrorBatch::new();
        batch.push(fsc_err!(Error: "first"));
        batch.push(fsc_err!(Fatal: "second"));
        assert!(batch.has_fatal());
        let summary = batch.summary();
        assert!(summary.contains("1: error: first"));
        assert!(summary.contains("2: fatal: second"));
    }

    #[test]
    fn context_wraps_source() {
        let e = fsc_err!(Verify: "grid mismatch").with_context("building partition");
        let rendered = e.to_string();
        assert!(rendered.contains("building partition"));
        assert!(rendered.contains("grid mismatch"));
    }
}
