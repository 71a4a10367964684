//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

/// Morpheus CLI - manage a Morpheus appliance from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "morpheus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Flags accepted by every command.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by all commands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Remote appliance to use instead of the active one.
    #[arg(short, long, global = true, env = "MORPHEUS_REMOTE")]
    pub remote: Option<String>,

    /// Print the request that would be sent, without sending it.
    #[arg(short, long, global = true)]
    pub dry_run: bool,

    /// Output raw JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress output on success.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Answer yes to confirmation prompts.
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Skip TLS certificate verification.
    #[arg(short = 'I', long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra request header, repeatable.
    #[arg(
        short = 'H',
        long = "header",
        global = true,
        value_name = "KEY=VALUE",
        value_parser = parse_header
    )]
    pub headers: Vec<(String, String)>,

    /// Enable debug logging.
    #[arg(
        long,
        global = true,
        env = "MORPHEUS_DEBUG",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(['=', ':'])
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("header name is empty in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage remote appliances.
    Remote {
        /// Remote subcommand to execute.
        #[command(subcommand)]
        command: RemoteCommands,
    },

    /// Log in to the current remote.
    Login(LoginArgs),

    /// Forget the stored token for the current remote.
    Logout,

    /// Show the authenticated user.
    Whoami,

    /// Check that the appliance is reachable.
    Ping,

    /// Group management commands.
    Groups {
        /// Group subcommand to execute.
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Cloud management commands.
    Clouds {
        /// Cloud subcommand to execute.
        #[command(subcommand)]
        command: CloudCommands,
    },

    /// Instance management commands.
    Instances {
        /// Instance subcommand to execute.
        #[command(subcommand)]
        command: InstanceCommands,
    },

    /// Archive file transfer commands.
    Archives {
        /// Archive subcommand to execute.
        #[command(subcommand)]
        command: ArchiveCommands,
    },
}

/// Remote subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RemoteCommands {
    /// List configured remotes.
    List,

    /// Add a remote appliance.
    Add {
        /// Name for the remote.
        name: String,

        /// Appliance URL, e.g. `https://morpheus.example.com`. Pass the
        /// global `--insecure` to skip TLS verification for this remote.
        url: String,

        /// Make this the active remote.
        #[arg(long = "use")]
        make_active: bool,
    },

    /// Make a remote the active one.
    Use {
        /// Remote name.
        name: String,
    },

    /// Remove a remote and its stored credentials.
    Remove {
        /// Remote name.
        name: String,
    },

    /// Show the active remote.
    Current,
}

/// Arguments for login.
#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Username; prompted for when omitted.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password; prompted for when omitted.
    #[arg(short, long, env = "MORPHEUS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Store an existing access token instead of logging in.
    #[arg(long, conflicts_with_all = ["username", "password", "refresh"])]
    pub token: Option<String>,

    /// Renew the stored token with its refresh token.
    #[arg(long)]
    pub refresh: bool,
}

/// Paging and search flags for list commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Maximum number of results.
    #[arg(short, long)]
    pub max: Option<u32>,

    /// Offset into the results.
    #[arg(short, long)]
    pub offset: Option<u32>,

    /// Search phrase.
    #[arg(short = 's', long = "search")]
    pub phrase: Option<String>,
}

/// Group subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum GroupCommands {
    /// List groups.
    List(ListArgs),

    /// Show a group by id or name.
    Get {
        /// Group id or name.
        group: String,
    },

    /// Create a group.
    Add {
        /// Group name.
        name: String,

        /// Location label.
        #[arg(short, long)]
        location: Option<String>,

        /// Group code.
        #[arg(long)]
        code: Option<String>,
    },

    /// Update a group.
    Update {
        /// Group id or name.
        group: String,

        /// New name.
        #[arg(long)]
        name: Option<String>,

        /// New location label.
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Delete a group.
    Remove {
        /// Group id or name.
        group: String,
    },
}

/// Cloud subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum CloudCommands {
    /// List clouds.
    List(ListArgs),

    /// Show a cloud by id or name.
    Get {
        /// Cloud id or name.
        cloud: String,
    },

    /// Delete a cloud.
    Remove {
        /// Cloud id or name.
        cloud: String,
    },
}

/// Instance subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum InstanceCommands {
    /// List instances.
    List(ListArgs),

    /// Show an instance by id or name.
    Get {
        /// Instance id or name.
        instance: String,
    },

    /// Start an instance.
    Start {
        /// Instance id or name.
        instance: String,
    },

    /// Stop an instance.
    Stop {
        /// Instance id or name.
        instance: String,
    },

    /// Restart an instance.
    Restart {
        /// Instance id or name.
        instance: String,
    },

    /// Delete an instance.
    Remove {
        /// Instance id or name.
        instance: String,

        /// Delete even if cleanup fails.
        #[arg(long)]
        force: bool,
    },
}

/// Archive subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ArchiveCommands {
    /// Upload a local file to a bucket.
    Upload {
        /// Bucket id or name.
        bucket: String,

        /// Destination path in the bucket; a trailing `/` keeps the local name.
        remote_path: String,

        /// Local file to upload.
        file: PathBuf,
    },

    /// Download a file from a bucket.
    Download {
        /// Bucket id or name.
        bucket: String,

        /// Path of the file in the bucket.
        remote_path: String,

        /// Local destination file or directory.
        dest: PathBuf,
    },
}
