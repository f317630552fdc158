//! Entry points behind each CLI subcommand.

mod chat;
mod search;
mod serve;

pub use chat::{ChatArgs, chat};
pub use search::{SearchArgs, search};
pub use serve::{DEFAULT_HOST, DEFAULT_PORT, serve};
