//! Inbound adapters.
//!
//! An adapter owns one transport: it accepts queries, drives the
//! dispatcher, and drains the streamed units back to the caller. One
//! adapter is implemented: the CLI (one-shot and interactive loop).

pub mod cli;
