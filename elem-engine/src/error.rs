use std::fmt::{self, Debug, Formatter};
use thiserror::Error;

//-------------------------------------------------------------------------------------------------
// ErrorKind
//-------------------------------------------------------------------------------------------------

/**
The category of an [`EError`](struct.EError.html).

Every failure the value layer reports belongs to exactly one of these categories. The
evaluator is expected to catch errors at its statement or call boundary; the value layer
itself never recovers from one silently.
*/

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Error)]
pub enum ErrorKind {
	///An out-of-range index, a malformed slice bound, or running off the end of a list.
	#[error("index error")]
	Index,

	///An operand of the wrong kind, e.g. set algebra against a number, or a table key which is
	///neither a number nor a string.
	#[error("type mismatch")]
	TypeMismatch,

	///A caller-supplied callback broke its contract, e.g. a sort comparator which isn't strict.
	#[error("contract violation")]
	Contract,

	///Inconsistent input for a builder, e.g. a key with no paired value.
	#[error("consistency error")]
	Consistency
}

//-------------------------------------------------------------------------------------------------
// EError, EResult
//-------------------------------------------------------------------------------------------------

/**
The error type returned by every fallible operation in this crate.

Usually constructed with the [`bail!`](macro.bail.html) and [`ensure!`](macro.ensure.html)
macros.
*/

#[derive(Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EError {
	kind: ErrorKind,
	message: String
}

///The result type returned by every fallible operation in this crate.
pub type EResult<T> = Result<T, EError>;

impl EError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> EError {
		EError {
			kind,
			message: message.into()
		}
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn is_index(&self) -> bool {
		self.kind == ErrorKind::Index
	}

	pub fn is_type_mismatch(&self) -> bool {
		self.kind == ErrorKind::TypeMismatch
	}

	pub fn is_contract(&self) -> bool {
		self.kind == ErrorKind::Contract
	}

	pub fn is_consistency(&self) -> bool {
		self.kind == ErrorKind::Consistency
	}
}

impl Debug for EError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "EError({:?}, {:?})", self.kind, self.message)
	}
}

/**
Constructs an [`EError`](struct.EError.html) from an [`ErrorKind`](enum.ErrorKind.html) variant
name and a format string.

	let err = error!(Index, "index {} is out of bounds", 10);
*/

#[macro_export]
macro_rules! error {
	($kind:ident, $($arg:tt)+) => (
		$crate::EError::new($crate::ErrorKind::$kind, format!($($arg)+))
	);
}

/**
Returns early with an [`EError`](struct.EError.html).

	bail!(TypeMismatch, "expected a list or a set, received {}", val.a_type_name())
*/

#[macro_export]
macro_rules! bail {
	($kind:ident, $($arg:tt)+) => (
		return Err($crate::error!($kind, $($arg)+))
	);
}

/**
Returns early with an [`EError`](struct.EError.html) if a condition is false.

	ensure!(len % 2 == 0, Consistency, "dangling key: {} elements is an odd count", len);
*/

#[macro_export]
macro_rules! ensure {
	($cond:expr, $kind:ident, $($arg:tt)+) => (
		if !$cond {
			$crate::bail!($kind, $($arg)+)
		}
	);
}
