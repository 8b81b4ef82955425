//! Researcher - a tool-using research agent
//!
//! A supervisor model answers a query by alternating with tool execution (web
//! search, arXiv search, internal document search) until it replies without
//! requesting any tools.

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod session;
pub mod tools;

pub use error::{ResearchError, Result};
