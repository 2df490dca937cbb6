use serde::{Deserialize, Serialize};

/// Token the command generator places on (or before) lines that must never
/// reach the device.
pub const DANGER_SENTINEL: &str = "#DANGER";

/// What happens to a command line when its batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Sent to the device.
    #[default]
    Execute,
    /// Carries (or follows) the danger sentinel. Never transmitted.
    Blocked,
    /// A `#` comment line. Never transmitted.
    Comment,
}

/// A single line of device-directed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Trimmed command text exactly as it will be sent.
    pub text: String,
    /// Matched a danger keyword or the sentinel. Used for operator warnings.
    pub is_dangerous: bool,
    /// Whether the engine transmits this line.
    #[serde(default)]
    pub disposition: Disposition,
}

impl Command {
    pub fn new(text: impl Into<String>, is_dangerous: bool) -> Self {
        Self {
            text: text.into(),
            is_dangerous,
            disposition: Disposition::Execute,
        }
    }

    pub fn blocked(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_dangerous: true,
            disposition: Disposition::Blocked,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_dangerous: false,
            disposition: Disposition::Comment,
        }
    }

    /// True when the engine should send this line to the device.
    pub fn is_executable(&self) -> bool {
        self.disposition == Disposition::Execute
    }
}

/// Ordered commands. Insertion order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBatch {
    pub commands: Vec<Command>,
}

impl CommandBatch {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Batch of plain executable, non-dangerous commands.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: lines.into_iter().map(|l| Command::new(l, false)).collect(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Commands the engine will transmit, in order.
    pub fn executable(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.is_executable())
    }

    pub fn executable_count(&self) -> usize {
        self.executable().count()
    }

    /// Any line flagged dangerous, sent or not.
    pub fn has_dangerous(&self) -> bool {
        self.commands.iter().any(|c| c.is_dangerous)
    }

    pub fn has_blocked(&self) -> bool {
        self.commands
            .iter()
            .any(|c| c.disposition == Disposition::Blocked)
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
