pub mod error;

pub use error::{CodexError, Result};
