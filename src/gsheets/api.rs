//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for every tool, whether the caller is the CLI, a protocol
//! transport or a test.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Validates** raw tool arguments into typed requests before any remote call
//! - **Builds a caller** per request, carrying the retry policy and deadline
//! - **Dispatches** to the appropriate command function
//! - **Normalizes** outcomes into a [`ResponseEnvelope`]
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **I/O operations**: No stdout, stderr, or credential handling
//! - **Locking**: Two concurrent updates to the same spreadsheet interleave at
//!   operation granularity and the last write wins
//!
//! ## Generic Over SheetsBackend
//!
//! `SheetsApi<B: SheetsBackend, C: Clock>` is generic over the remote service and
//! the clock backoff waits on:
//! - Production: `SheetsApi<HttpBackend>`
//! - Testing: `SheetsApi<InMemoryBackend, ManualClock>`

use crate::backend::{SheetsBackend, ShareRole};
use crate::commands;
use crate::config::SheetsConfig;
use crate::error::{Result, SheetsError};
use crate::model::{GetRequest, ListRequest, SheetRequest, UpdateRequest};
use crate::response::{normalize, ResponseEnvelope};
use crate::retry::{Backoff, Clock, RetryPolicy, SystemClock};
use crate::tools::Tool;
use crate::validate;
use serde_json::Value;
use std::time::Duration;

pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};

/// Runtime knobs the facade hands to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
    pub default_page_size: u32,
    pub share_role: ShareRole,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self::from(&SheetsConfig::default())
    }
}

impl From<&SheetsConfig> for ApiSettings {
    fn from(config: &SheetsConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            timeout: config.request_timeout(),
            default_page_size: config.default_page_size,
            share_role: config.share_role(),
        }
    }
}

/// The main API facade for spreadsheet tools.
pub struct SheetsApi<B: SheetsBackend, C: Clock = SystemClock> {
    backend: B,
    clock: C,
    settings: ApiSettings,
}

impl<B: SheetsBackend> SheetsApi<B, SystemClock> {
    pub fn new(backend: B, settings: ApiSettings) -> Self {
        Self::with_clock(backend, SystemClock, settings)
    }
}

impl<B: SheetsBackend, C: Clock> SheetsApi<B, C> {
    pub fn with_clock(backend: B, clock: C, settings: ApiSettings) -> Self {
        Self {
            backend,
            clock,
            settings,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn create(&mut self, request: &SheetRequest) -> Result<CmdResult> {
        let mut caller = Backoff::with_clock(self.settings.retry, &self.clock)
            .with_timeout(self.settings.timeout);
        commands::create::run(
            &mut self.backend,
            &mut caller,
            request,
            self.settings.share_role,
        )
    }

    pub fn update(&mut self, request: &UpdateRequest) -> Result<CmdResult> {
        let mut caller = Backoff::with_clock(self.settings.retry, &self.clock)
            .with_timeout(self.settings.timeout);
        commands::update::run(&mut self.backend, &mut caller, request)
    }

    pub fn get(&self, request: &GetRequest) -> Result<CmdResult> {
        let mut caller = Backoff::with_clock(self.settings.retry, &self.clock)
            .with_timeout(self.settings.timeout);
        commands::get::run(&self.backend, &mut caller, request)
    }

    pub fn list(&self, request: &ListRequest) -> Result<CmdResult> {
        let mut caller = Backoff::with_clock(self.settings.retry, &self.clock)
            .with_timeout(self.settings.timeout);
        commands::list::run(&self.backend, &mut caller, request)
    }

    /// Validate raw arguments for the named tool and run it.
    pub fn invoke(&mut self, tool: &str, args: &Value) -> Result<CmdResult> {
        let tool: Tool = tool
            .parse()
            .map_err(|reason: String| SheetsError::invalid("tool", reason))?;
        tracing::info!(tool = %tool, "invoking tool");

        match tool {
            Tool::CreateGoogleSheet => {
                let request = validate::validate_create(args)?;
                self.create(&request)
            }
            Tool::UpdateGoogleSheet => {
                let request = validate::validate_update(args)?;
                self.update(&request)
            }
            Tool::GetGoogleSheet => {
                let request = validate::validate_get(args)?;
                self.get(&request)
            }
            Tool::ListGoogleSheets => {
                let request = validate::validate_list(args, self.settings.default_page_size)?;
                self.list(&request)
            }
        }
    }

    /// Run the named tool and fold the outcome into a response envelope.
    pub fn call_tool(&mut self, tool: &str, args: &Value) -> ResponseEnvelope {
        let outcome = self.invoke(tool, args);
        if let Err(err) = &outcome {
            tracing::warn!(tool, kind = %err.kind(), error = %err, "tool failed");
        }
        normalize(outcome)
    }

    pub fn create_google_sheet(&mut self, args: &Value) -> ResponseEnvelope {
        self.call_tool(Tool::CreateGoogleSheet.name(), args)
    }

    pub fn update_google_sheet(&mut self, args: &Value) -> ResponseEnvelope {
        self.call_tool(Tool::UpdateGoogleSheet.name(), args)
    }

    pub fn get_google_sheet(&mut self, args: &Value) -> ResponseEnvelope {
        self.call_tool(Tool::GetGoogleSheet.name(), args)
    }

    pub fn list_google_sheets(&mut self, args: &Value) -> ResponseEnvelope {
        self.call_tool(Tool::ListGoogleSheets.name(), args)
    }
}
