#![allow(unreachable_pub)]

mod cookies;
mod error;
mod item;

pub use cookies::{CookieJar, InitialCookie};
pub use error::{ErrorKind, ItemError, Stage};
pub use item::{RequestOutcome, WorkItem};

/// The gety `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
