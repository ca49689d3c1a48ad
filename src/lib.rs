//! A programmable job scheduler: a cron-expression parser, fixed-interval
//! and one-shot schedule variants, and a dynamic activation loop that fires
//! registered jobs while supporting concurrent add/remove/snapshot.
//!
//! The three pieces, leaves-first:
//!
//! - [`schedule::cron`] — parses a textual spec (`@hourly`, `@every 2s`, or
//!   a six-field cron expression) into a [`schedule::Schedule`].
//! - [`schedule`] — the `Schedule` capability and its three variants
//!   ([`schedule::CronSchedule`], [`schedule::ConstantDelay`],
//!   [`schedule::OnceSchedule`]).
//! - [`engine`] — [`engine::Engine`], which owns a set of entries and runs
//!   the activation loop.
//!
//! See `SPEC_FULL.md` for the full design.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jobsched::{Engine, FuncJob};
//!
//! # async fn example() {
//! let engine = Engine::new();
//! engine
//!     .add_func("@every 5s", |id| println!("entry {id} fired"))
//!     .await
//!     .unwrap();
//! engine.start();
//! # }
//! ```

pub mod engine;
mod entry;
pub mod error;
pub mod job;
pub mod schedule;
mod time_util;

pub use engine::Engine;
pub use entry::EntrySnapshot;
pub use error::{DurationParseError, ParseError};
pub use job::{FuncJob, Job};
pub use schedule::constant_delay::every;
pub use schedule::cron::{parse, ParsedSchedule};
pub use schedule::{ConstantDelay, CronSchedule, OnceSchedule, Schedule};
