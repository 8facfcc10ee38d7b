//! Two people, a handful of chores, and a monthly tally of who missed them. Both devices share
//! one JSON document per month kept in a GitHub repository, which this crate mirrors locally and
//! keeps in sync through the repository contents API.
//!

pub mod cli;
pub mod settings;
pub mod sync;
pub mod tally;
pub mod utils;
