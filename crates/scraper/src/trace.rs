// ABOUTME: Execution trace accumulated during one pipeline run and attached to the result as `debug`.
// ABOUTME: Purely observational: records method, attempted steps, deduplicated tools and recoverable-failure notes.

use crate::result::{DebugInfo, TraceEntry};

pub const METHOD_CACHE_HIT: &str = "cache-hit";
pub const METHOD_HTML: &str = "html-http";
pub const METHOD_PDF: &str = "pdf-basic";

pub const STEP_HTML_FETCH: &str = "html:http-fetch";
pub const STEP_AMP_FALLBACK: &str = "html:amp-fallback";
pub const STEP_PDF_FETCH: &str = "pdf:http-fetch";
pub const STEP_PDF_TEXT: &str = "pdf:text-extraction";
pub const STEP_PDF_PROXY: &str = "pdf:fallback-jina";

pub const TOOL_HTTP: &str = "reqwest:http";
pub const TOOL_AMP: &str = "amp-fallback";
pub const TOOL_PDF_LIBRARY: &str = "pdf:lopdf";
pub const TOOL_PDF_STREAMS: &str = "pdf:regex-extract";
pub const TOOL_PROXY: &str = "jina.ai-proxy";
pub const TOOL_CACHE: &str = "store:cache";
pub const TOOL_PERSIST: &str = "store:persist";

#[derive(Debug, Clone)]
pub struct Trace {
    method: String,
    attempts: Vec<TraceEntry>,
    tools_used: Vec<String>,
    notes: Vec<String>,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace {
    pub fn new() -> Self {
        Self {
            method: "unknown".to_string(),
            attempts: Vec::new(),
            tools_used: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn attempt(&mut self, step: &str, detail: Option<&str>) {
        self.attempts.push(TraceEntry {
            step: step.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    /// Records a tool once; repeated uses keep the first position.
    pub fn use_tool(&mut self, tool: &str) {
        if !self.tools_used.iter().any(|t| t == tool) {
            self.tools_used.push(tool.to_string());
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !note.is_empty() {
            self.notes.push(note);
        }
    }

    pub fn used(&self, tool: &str) -> bool {
        self.tools_used.iter().any(|t| t == tool)
    }

    /// Snapshot of the trace so far.
    pub fn finalize(&self) -> DebugInfo {
        DebugInfo {
            method: self.method.clone(),
            attempts: self.attempts.clone(),
            tools_used: self.tools_used.clone(),
            notes: self.notes.clone(),
        }
    }
}
