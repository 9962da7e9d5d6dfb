use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bashbros", version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy-enforcing supervisor for autonomous coding agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a command against policy without recording it as executed.
    /// Exits 0 to allow, non-zero to deny, printing the reason to stderr.
    Gate {
        /// The shell command to evaluate
        command: String,
    },

    /// Record a command that already ran, with its captured output, so it
    /// counts toward rate/loop/anomaly tracking and the audit log.
    Record {
        /// The shell command that was executed
        command: String,

        /// Captured stdout/stderr from running the command
        #[arg(long, default_value = "")]
        output: String,
    },

    /// Start a new tracked session for the current agent process.
    SessionStart,

    /// End the current session normally, flushing final counters.
    SessionEnd,

    /// Record a user prompt against the current session.
    RecordPrompt {
        /// The prompt text
        prompt: String,
    },

    /// Record a non-bash tool invocation against the current session.
    RecordTool {
        /// Tool name, e.g. "Edit" or "WebFetch"
        name: String,

        /// The tool's input, serialized
        #[arg(long, default_value = "")]
        input: String,

        /// The tool's captured output
        #[arg(long, default_value = "")]
        output: String,
    },
}
