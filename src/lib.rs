//! agentsh-install library.
//!
//! The binary is a thin clap front end over these modules; integration
//! tests drive them directly with a scripted process runner and a
//! temporary host root.

pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod locate;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod prompt;
pub mod register;
pub mod runtime;
pub mod strategy;
pub mod timing;
pub mod verify;
