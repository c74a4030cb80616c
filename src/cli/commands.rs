use clap::{Parser, Subcommand};

/// `chatkeep` - conversational sessions over an OpenAI-compatible model.
#[derive(Parser, Debug)]
#[command(name = "chatkeep")]
#[command(version)]
#[command(about = "Chat with a model while chatkeep keeps each conversation.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.chatkeep/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat on stdin (one message per line)
    Chat {
        /// Conversation id to resume or start
        #[arg(long, default_value = "local")]
        conversation: String,

        /// Replace the system prompt (resets the conversation)
        #[arg(long)]
        system_prompt: Option<String>,

        /// Model to use instead of the configured one
        #[arg(long)]
        model: Option<String>,
    },

    /// Send a single message and print the reply
    Ask {
        /// Conversation id (default: a one-off conversation)
        #[arg(long)]
        conversation: Option<String>,

        /// Replace the system prompt
        #[arg(long)]
        system_prompt: Option<String>,

        /// Model to use instead of the configured one
        #[arg(long)]
        model: Option<String>,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}
