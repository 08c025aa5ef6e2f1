//! # shellmind-error
//!
//! Unified error handling for shellmind.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., StorageFailed, CommandTimeout)
//! - **ErrorStatus**: Decide how to handle it (Permanent or Temporary)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use shellmind_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::StorageFailed, "rename over state file failed")
//!         .with_operation("store::save")
//!         .with_context("path", "bot_memory.json"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible library functions return `Result<T, shellmind_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using shellmind Error
pub type Result<T> = std::result::Result<T, Error>;
