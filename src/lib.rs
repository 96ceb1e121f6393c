//! bocode - a terminal assistant core
//!
//! Durable conversation history and prompt templates, plus git analysis:
//! commit classification, conflict triage, retrospectives and commit
//! graphs. The model client itself lives outside this crate.

pub mod config;
pub mod git;
pub mod storage;
pub mod templates;
