//! # Google Sheets Tools
//!
//! A **UI-agnostic tool core** for reading and writing Google Sheets. The same core
//! serves the `gsheets` CLI, a protocol transport that advertises [`tools`], or a
//! test harness holding an in-memory backend.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (main.rs, args.rs)                               │
//! │  - Parses arguments, loads config, mints the backend        │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Validates raw tool arguments (validate.rs)               │
//! │  - Builds a backoff-wrapped caller per request (retry.rs)   │
//! │  - Normalizes outcomes into envelopes (response.rs)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs, plan.rs)                     │
//! │  - Plans mutations up front, then executes them in order    │
//! │  - Queries rows and spreadsheet listings                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Backend Layer (backend/)                                   │
//! │  - Abstract SheetsBackend trait                             │
//! │  - HttpBackend (production), InMemoryBackend (testing)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Ambient State in Core
//!
//! From `api.rs` inward, code never reads credentials, environment variables or
//! process-wide clients. The backend is handed in already authenticated, and time
//! is reached only through a [`retry::Clock`], so tests run with no network and no
//! real sleeping.
//!
//! ## Failure Model
//!
//! Every tool returns a [`response::ResponseEnvelope`]. Failures name a
//! [`error::FailureKind`]. A mutation that fails part way is reported as aborted,
//! with the count of operations already applied; nothing is rolled back.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all tools
//! - [`a1`]: A1 cell reference codec
//! - [`validate`]: Raw argument validation into typed requests
//! - [`retry`]: Exponential backoff around remote calls
//! - [`plan`]: Ordered mutation plans
//! - [`commands`]: Create, update, get and list
//! - [`backend`]: Remote service abstraction and implementations
//! - [`response`]: Uniform response envelope
//! - [`tools`]: Tool names and input schemas
//! - [`config`]: Configuration management
//! - [`model`]: Core data types
//! - [`error`]: Error types

pub mod a1;
pub mod api;
pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod plan;
pub mod response;
pub mod retry;
pub mod tools;
pub mod validate;
