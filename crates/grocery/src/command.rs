use shared::error::GroceryError;

pub const COMMAND_PREFIX: &str = "!gro";
/// Upper bound, in characters, for both the command name and the list label.
pub const MAX_TOKEN_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Always starts with [`COMMAND_PREFIX`].
    pub command: String,
    /// Empty for the default list.
    pub label: String,
    /// Everything after the first whitespace character, verbatim.
    pub args: String,
}

impl ParsedCommand {
    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningCommand,
    ScanningLabel,
}

/// Splits `!gro[:label] args` into its parts.
///
/// The scan walks decoded characters, so multi-byte text never lands on a
/// split byte boundary.
pub fn parse(raw: &str) -> Result<ParsedCommand, GroceryError> {
    if !raw.starts_with(COMMAND_PREFIX) {
        return Err(GroceryError::NotACommand);
    }

    let mut state = ScanState::ScanningCommand;
    let mut command = String::new();
    let mut label = String::new();
    let mut command_chars = 0usize;
    let mut label_chars = 0usize;
    let mut args = String::new();

    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            args = chars.as_str().to_string();
            break;
        }

        match (state, ch) {
            (ScanState::ScanningCommand, ':') => state = ScanState::ScanningLabel,
            (ScanState::ScanningLabel, ':') => return Err(GroceryError::NotACommand),
            (ScanState::ScanningCommand, _) => {
                command_chars += 1;
                if command_chars > MAX_TOKEN_CHARS {
                    return Err(GroceryError::CommandTooLong);
                }
                command.push(ch);
            }
            (ScanState::ScanningLabel, _) => {
                label_chars += 1;
                if label_chars > MAX_TOKEN_CHARS {
                    return Err(GroceryError::CommandTooLong);
                }
                label.push(ch);
            }
        }
    }

    Ok(ParsedCommand {
        command,
        label,
        args,
    })
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
