//! Debug adapter translating the BlitzMax debugger's line protocol into the
//! Debug Adapter Protocol.

pub mod config;
pub mod dap;
pub mod debugger;
pub mod error;
pub mod parser;

pub use error::{Error, Result};
