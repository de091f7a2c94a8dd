use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

pub type Result<T, E = RelmetaError> = std::result::Result<T, E>;

/// Return early with a "not implemented" error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::RelmetaError::new(format!("Not yet implemented: {msg}")));
    }};
}

#[derive(Debug)]
pub struct RelmetaError {
    inner: Box<RelmetaErrorInner>,
}

#[derive(Debug)]
struct RelmetaErrorInner {
    msg: Cow<'static, str>,
    source: Option<Box<dyn Error + Send + Sync>>,
    backtrace: Backtrace,
}

impl RelmetaError {
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        RelmetaError {
            inner: Box::new(RelmetaErrorInner {
                msg: msg.into(),
                source: None,
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(
        msg: impl Into<Cow<'static, str>>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        RelmetaError {
            inner: Box::new(RelmetaErrorInner {
                msg: msg.into(),
                source: Some(source),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_ref()
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Display for RelmetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }

        Ok(())
    }
}

impl Error for RelmetaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for RelmetaError {
    fn from(value: fmt::Error) -> Self {
        RelmetaError::with_source("Format error", Box::new(value))
    }
}

impl From<std::io::Error> for RelmetaError {
    fn from(value: std::io::Error) -> Self {
        RelmetaError::with_source("IO error", Box::new(value))
    }
}

/// Attach a message to errors coming from other libraries.
pub trait ResultExt<T, E> {
    fn context(self, msg: &'static str) -> Result<T>;

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(RelmetaError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(RelmetaError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(RelmetaError::new(format!("Missing required value: {msg}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_implemented_fn() -> Result<()> {
        not_implemented!("histograms for {}", "binary columns")
    }

    #[test]
    fn not_implemented_message() {
        let err = not_implemented_fn().unwrap_err();
        assert_eq!(
            "Not yet implemented: histograms for binary columns",
            err.get_msg()
        );
    }

    #[test]
    fn required_on_none() {
        let err = None::<usize>.required("row count").unwrap_err();
        assert_eq!("Missing required value: row count", err.get_msg());
    }

    #[test]
    fn context_keeps_source() {
        let res: std::result::Result<(), fmt::Error> = Err(fmt::Error);
        let err = res.context("failed to write").unwrap_err();
        assert_eq!("failed to write", err.get_msg());
        assert!(err.source().is_some());
    }
}
