//! # Interface Layer
//!
//! Slash-command handlers invoked by the command router.

pub mod commands;
