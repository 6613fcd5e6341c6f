//! Cross-component tests for ingestion, tool calling and sessions.

pub(crate) mod support;

mod scenarios;
