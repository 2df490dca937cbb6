//! Device prompt and pagination detection.
//!
//! IOS gives no message framing: a command is finished when the shell prints
//! its prompt again (`Router#`, `Router(config-if)#`, `Switch>`). Long output
//! pauses on a `--More--` marker until a key is pressed.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ToolsError, ToolsResult};

/// Default pagination marker emitted by IOS.
pub const DEFAULT_MORE_MARKER: &str = "--More--";

/// Hostname, optional mode suffix, then `#` or `>`, at the very end of the
/// buffer. Whatever precedes the hostname is not inspected.
const DEFAULT_PROMPT_PATTERN: &str = r"[\w-]+(?:\([\w-]+\))?[#>][ \t]*\z";

static DEFAULT_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PROMPT_PATTERN).unwrap());

/// Recognizes when device output has finished.
///
/// Implementations must be pure: no side effects, no panics on any input.
/// Callers decode lossily before matching, so undecodable bytes show up as
/// U+FFFD and simply do not match.
pub trait PromptMatcher: Send + Sync {
    /// True iff the trailing portion of `buffer` is a device prompt.
    fn looks_finished(&self, buffer: &str) -> bool;

    /// True iff `buffer` contains the pagination marker.
    fn has_more_marker(&self, buffer: &str) -> bool;
}

/// Regex-based prompt matcher (the default strategy).
#[derive(Debug, Clone)]
pub struct RegexPromptMatcher {
    prompt: Regex,
    more_marker: String,
}

impl RegexPromptMatcher {
    pub fn new() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.clone(),
            more_marker: DEFAULT_MORE_MARKER.to_string(),
        }
    }

    /// Matcher with a custom prompt regex. The pattern should anchor at the
    /// end of input (`\z`), since it is tested against the whole buffer.
    pub fn with_prompt_pattern(pattern: &str) -> ToolsResult<Self> {
        let prompt = Regex::new(pattern).map_err(|e| ToolsError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            prompt,
            more_marker: DEFAULT_MORE_MARKER.to_string(),
        })
    }

    /// Replace the pagination marker (e.g. `<--- More --->` on ASA).
    pub fn with_more_marker(mut self, marker: impl Into<String>) -> ToolsResult<Self> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(ToolsError::EmptyMoreMarker);
        }
        self.more_marker = marker;
        Ok(self)
    }

    pub fn more_marker(&self) -> &str {
        &self.more_marker
    }
}

impl Default for RegexPromptMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptMatcher for RegexPromptMatcher {
    fn looks_finished(&self, buffer: &str) -> bool {
        self.prompt.is_match(buffer)
    }

    fn has_more_marker(&self, buffer: &str) -> bool {
        buffer.contains(self.more_marker.as_str())
    }
}
