//! Append command - add a message to a conversation.
//!
//! With `--stdin` the message is treated as a streamed response: chunks
//! are buffered and the message is only appended once the stream ends, so
//! an interrupted stream leaves the stored conversation untouched.

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use bocode_cli::config::Config;
use bocode_cli::storage::{MessageRole, PendingResponse};

use crate::cli::{open_store, short_id};

/// Arguments for the append command.
#[derive(clap::Args)]
#[command(after_help = "EXAMPLES:\n    \
    bocode append last \"And for Vec?\"                  Add a user message\n    \
    bocode append abc123 --role assistant \"Use iter()\"  Record a reply\n    \
    model-client | bocode append last --stdin           Stream a reply")]
pub struct Args {
    /// Conversation ID prefix, or 'last'
    #[arg(value_name = "CONVERSATION")]
    pub conversation: String,

    /// Message content
    #[arg(value_name = "CONTENT", conflicts_with = "stdin")]
    pub content: Option<String>,

    /// Message role
    #[arg(short, long, value_enum)]
    pub role: Option<MessageRole>,

    /// Read the message from standard input as a stream
    #[arg(long)]
    #[arg(long_help = "Read the message from standard input. Input is buffered and\n\
        stored only when the stream ends. Defaults the role to assistant.")]
    pub stdin: bool,
}

/// Executes the append command.
pub fn run(args: Args, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let id = store.resolve(&args.conversation)?;
    let mut conversation = store.load(&id)?;

    let message = if args.stdin {
        let role = args.role.unwrap_or(MessageRole::Assistant);
        let pending = read_stream(io::stdin().lock())?;
        if pending.partial().trim().is_empty() {
            bail!("No input received on stdin; conversation left unchanged");
        }
        if role == MessageRole::Assistant {
            pending.commit(&mut conversation).clone()
        } else {
            conversation
                .push_message(role, pending.partial().to_string())
                .clone()
        }
    } else {
        let Some(content) = args.content else {
            bail!("Provide message content or use --stdin");
        };
        let role = args.role.unwrap_or(MessageRole::User);
        conversation.push_message(role, content).clone()
    };

    store.save(&conversation)?;

    println!(
        "{} {} message to {} ({} messages)",
        "Appended".green(),
        message.role,
        short_id(&conversation.id).cyan(),
        conversation.messages().len()
    );
    Ok(())
}

/// Buffers a stream chunk by chunk.
fn read_stream(mut input: impl Read) -> Result<PendingResponse> {
    let mut pending = PendingResponse::new();
    let mut buffer = [0u8; 4096];
    let mut carry: Vec<u8> = Vec::new();

    loop {
        let read = input.read(&mut buffer).context("Failed to read stdin")?;
        if read == 0 {
            break;
        }
        carry.extend_from_slice(&buffer[..read]);

        // Hold back an incomplete UTF-8 sequence until the next chunk
        let valid = match std::str::from_utf8(&carry) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => bail!("stdin is not valid UTF-8: {e}"),
        };
        let text = std::str::from_utf8(&carry[..valid]).context("stdin is not valid UTF-8")?;
        pending.push_chunk(text);
        carry.drain(..valid);
    }

    if !carry.is_empty() {
        bail!("stdin ended inside a UTF-8 sequence");
    }
    Ok(pending)
}
