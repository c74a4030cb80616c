use crate::config::CommandsConfig;

/// Control messages recognized before a turn reaches the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Forget the caller's own conversation.
    ClearMemory,
    /// Forget every conversation.
    ClearAll,
    /// Re-read the config file.
    ReloadConfig,
}

/// Match `input` against the configured command words. Only an exact match
/// (ignoring surrounding whitespace) counts; anything else is a normal turn.
pub fn parse_command(input: &str, commands: &CommandsConfig) -> Option<Command> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if commands.clear_memory.iter().any(|c| c == trimmed) {
        Some(Command::ClearMemory)
    } else if commands.clear_all == trimmed {
        Some(Command::ClearAll)
    } else if commands.reload_config == trimmed {
        Some(Command::ReloadConfig)
    } else {
        None
    }
}
