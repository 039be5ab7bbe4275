//! `Error` and `Result` types arising out of filter construction, rendering,
//! and the write acknowledgement protocol.
//!
//! Errors form a homogeneous chain: foreign failures (e.g. from the BSON
//! serializer) are absorbed into an [`Error`] at the boundary via `From`,
//! and higher layers prepend context with [`ResultExt::chain`] or
//! [`ResultExt::chain_with`]. The root of a chain owns the backtrace; a
//! wrapping error inherits the root's kind and adds only its message.

use std::fmt;
use std::error;
use std::result;
use std::borrow::Cow;
use backtrace::Backtrace;
use serde::{ Serialize, Deserialize };

/// Type alias for a `Result` containing a Mango `Error`.
pub type Result<T> = result::Result<T, Error>;

/// A structured, "machine-readable" error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A filter was constructed from structurally invalid parts, e.g. an
    /// empty member chain or an `$and` array containing a non-document.
    InvalidFilter,
    /// A field's encoder could not handle the operand it was given: an array
    /// operator or element match was applied to a field whose encoder is not
    /// array-capable, or the operand's type did not match the declared one.
    SerializerMismatch,
    /// The streaming document writer was driven through an unbalanced or
    /// out-of-order sequence of calls.
    InvalidWriterState,
    /// There was an error converting a strongly-typed value to BSON.
    BsonEncoding,
    /// There was an error converting BSON to a strongly-typed value.
    BsonDecoding,
    /// The reply to an acknowledgement probe was malformed: zero or multiple
    /// documents, or the query failure flag was set.
    CommandError,
    /// The server reported that it is not the primary or is currently
    /// recovering, so it can't accept writes. Retry against another node.
    NotPrimaryOrRecovering,
    /// The server reported a logical write error for an acknowledged write.
    WriteConcernError,
}

impl ErrorKind {
    /// Returns a human-readable error description for this kind.
    pub fn as_str(self) -> &'static str {
        use self::ErrorKind::*;

        match self {
            InvalidFilter          => "invalid filter",
            SerializerMismatch     => "serializer mismatch",
            InvalidWriterState     => "unbalanced document writer",
            BsonEncoding           => "BSON encoding error",
            BsonDecoding           => "BSON decoding error",
            CommandError           => "malformed command reply",
            NotPrimaryOrRecovering => "not primary or recovering",
            WriteConcernError      => "write concern error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The central error type for Mango.
#[derive(Debug)]
pub struct Error {
    /// The structured, "machine-readable" kind of this error.
    kind: ErrorKind,
    /// The human-readable description of this link of the chain.
    message: Cow<'static, str>,
    /// The wrapped lower-level error, if this is not the root.
    cause: Option<Box<Error>>,
    /// The backtrace; captured at the root of the chain only.
    backtrace: Option<Backtrace>,
}

impl Error {
    /// Creates a root error of the given kind, capturing a backtrace at the
    /// point of creation.
    ///
    /// ```
    /// # use mango::error::{ Error, ErrorKind };
    /// #
    /// let error = Error::new(ErrorKind::InvalidFilter, "sample error message");
    /// assert_eq!(error.kind(), ErrorKind::InvalidFilter);
    /// assert!(error.cause().is_none());
    /// assert!(error.backtrace().is_some());
    /// ```
    pub fn new<M>(kind: ErrorKind, message: M) -> Self
        where M: Into<Cow<'static, str>>
    {
        Error {
            kind,
            message: message.into(),
            cause: None,
            backtrace: Some(Backtrace::new()),
        }
    }

    /// Wraps `cause` under a higher-level message. The kind carries over
    /// from the cause; the backtrace stays where it was captured, at the
    /// root of the chain.
    pub fn context<M>(message: M, cause: Error) -> Self
        where M: Into<Cow<'static, str>>
    {
        Error {
            kind: cause.kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
            backtrace: None,
        }
    }

    /// The kind of this error (and, by construction, of its whole chain).
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// This link's message, without the kind or the rest of the chain.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error this one wraps, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// The backtrace captured at the root of the chain, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        let mut error = self;

        while let Some(cause) = error.cause.as_deref() {
            error = cause;
        }

        error.backtrace.as_ref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        let mut cause = self.cause.as_deref();
        while let Some(error) = cause {
            write!(f, ": {}", error.message)?;
            cause = error.cause.as_deref();
        }

        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

impl From<bson::ser::Error> for Error {
    fn from(cause: bson::ser::Error) -> Self {
        Error::new(ErrorKind::BsonEncoding, cause.to_string())
    }
}

impl From<bson::de::Error> for Error {
    fn from(cause: bson::de::Error) -> Self {
        Error::new(ErrorKind::BsonDecoding, cause.to_string())
    }
}

/// Attaches higher-level context to failures on their way up the stack.
pub trait ResultExt<T>: Sized {
    /// On failure, wraps the error under a fixed message.
    fn chain(self, message: &'static str) -> Result<T>;

    /// On failure, wraps the error under a lazily formatted message.
    fn chain_with<F: FnOnce() -> String>(self, message: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for result::Result<T, E> {
    fn chain(self, message: &'static str) -> Result<T> {
        self.map_err(|cause| Error::context(message, cause.into()))
    }

    fn chain_with<F: FnOnce() -> String>(self, message: F) -> Result<T> {
        self.map_err(|cause| Error::context(message(), cause.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ Error, ErrorKind, Result, ResultExt };

    #[test]
    fn chains_keep_the_root_kind_and_backtrace() {
        let root: Result<()> = Err(Error::new(
            ErrorKind::SerializerMismatch,
            "operand is not an i64",
        ));
        let chained = match root.chain_with(|| String::from("can't encode operand")) {
            Err(error) => error,
            Ok(()) => panic!("chaining an Err must stay an Err"),
        };

        assert_eq!(chained.kind(), ErrorKind::SerializerMismatch);
        assert_eq!(chained.message(), "can't encode operand");
        assert!(chained.backtrace().is_some());

        let cause = match chained.cause() {
            Some(cause) => cause,
            None => panic!("chained error must keep its cause"),
        };
        assert_eq!(cause.message(), "operand is not an i64");

        assert_eq!(chained.to_string(),
                   "serializer mismatch: can't encode operand: operand is not an i64");
    }

    #[test]
    fn foreign_errors_are_absorbed_with_their_kind() {
        let bad = bson::to_bson(&u64::MAX).map_err(Error::from);

        match bad {
            Err(error) => assert_eq!(error.kind(), ErrorKind::BsonEncoding),
            Ok(value) => {
                // the bson crate accepts what fits into an i64 only
                panic!("expected an encoding error, got {}", value);
            }
        }
    }
}
