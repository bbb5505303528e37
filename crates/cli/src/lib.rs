//! baseline-sync CLI
//!
//! Argument parsing, configuration overrides and output rendering for the
//! `baseline-sync` binary.

pub mod commands;
pub mod output;
