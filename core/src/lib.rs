//! Mines OpenMP-related pull requests from LLVM, turns them into keyword →
//! `file::function` training pairs, and recommends the files and functions a
//! new feature is likely to touch.

pub mod ast;
pub mod config;
pub mod dataset;
pub mod diff;
pub mod error;
pub mod failure_log;
pub mod keywords;
pub mod mine;
pub mod process;
pub mod recommend;
pub mod rules;
pub mod sources;

#[cfg(feature = "cli")]
pub mod cli;
