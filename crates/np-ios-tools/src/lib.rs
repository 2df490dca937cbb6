//! Cisco IOS text tooling for NetPilot.
//!
//! Stateless pieces the execution engine and the operator surface share:
//! - `PromptMatcher` decides whether device output ends in a command prompt
//!   and whether it contains a pagination marker
//! - `DangerClassifier` flags sensitive command lines by keyword
//! - `Sanitizer` turns raw generator text into an ordered `CommandBatch`

pub mod danger;
pub mod error;
pub mod prompt;
pub mod sanitize;

pub use danger::{DEFAULT_DANGER_KEYWORDS, DangerClassifier};
pub use error::{ToolsError, ToolsResult};
pub use prompt::{DEFAULT_MORE_MARKER, PromptMatcher, RegexPromptMatcher};
pub use sanitize::Sanitizer;
