//! Unified error interface for the weft crates.
//!
//! Every error enum in the workspace implements [`ErrorCode`]: a stable,
//! machine-readable code plus a recoverability hint. Layers above this
//! substrate (routing, transceivers) log and dispatch on codes rather than
//! on concrete error types, so codes are an API contract and must not
//! change once published.
//!
//! # Example
//!
//! ```
//! use weft_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum DispatchError {
//!     OwnerTerminated,
//!     StackExhausted,
//! }
//!
//! impl ErrorCode for DispatchError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::OwnerTerminated => "DISPATCH_OWNER_TERMINATED",
//!             Self::StackExhausted => "DISPATCH_STACK_EXHAUSTED",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::StackExhausted)
//!     }
//! }
//!
//! assert_eq!(DispatchError::OwnerTerminated.code(), "DISPATCH_OWNER_TERMINATED");
//! assert!(!DispatchError::OwnerTerminated.is_recoverable());
//! ```

/// Stable machine-readable error code interface.
///
/// # Code Format
///
/// - `UPPER_SNAKE_CASE`, prefixed with the owning domain (`FIBER_`,
///   `CHANNEL_`)
/// - Stable once defined (changing a code is a breaking change)
///
/// # Recoverability
///
/// An error is recoverable when retrying the operation can plausibly
/// succeed (resource pressure, transient state). Errors that will not
/// change on retry (invalid usage, terminated owners, bugs) are not.
pub trait ErrorCode {
    /// Returns the machine-readable code for this error value.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error's code follows the weft conventions.
///
/// Checks that the code is non-empty, `UPPER_SNAKE_CASE`, and carries the
/// expected domain prefix. Intended for use in each error enum's unit
/// tests.
///
/// # Panics
///
/// Panics with a descriptive message when a check fails.
///
/// # Example
///
/// ```
/// use weft_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct Full;
///
/// impl ErrorCode for Full {
///     fn code(&self) -> &'static str { "QUEUE_FULL" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Full, "QUEUE_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] over every variant of an error enum.
///
/// # Example
///
/// ```
/// use weft_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum SlotError { Empty, Poisoned }
///
/// impl ErrorCode for SlotError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::Empty => "SLOT_EMPTY",
///             Self::Poisoned => "SLOT_POISONED",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[SlotError::Empty, SlotError::Poisoned], "SLOT_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
