//! gifbot library crate.
//!
//! A Telegram bot that converts user videos into GIF animations. Conversions
//! run through a bounded scheduler: a fixed number run at once, the rest wait
//! in FIFO order and see their queue position refreshed periodically.

pub mod bot;
pub mod config;
pub mod error;
pub mod locale;
pub mod logging;
pub mod panic_hook;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod telegram;
pub mod utils;

pub use error::{Error, Result};
