pub mod error;
pub mod generate;
pub mod job;
pub mod model;
pub mod poll;
pub mod retry;
pub mod source;
pub mod state;
pub mod thread;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use error::*;
pub use model::{Tweet, TweetReference, User};
