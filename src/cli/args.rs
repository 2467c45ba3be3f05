use clap::{Args, Parser, Subcommand};

/// git-bridge - share captured HTTP traffic and scanner findings through git
#[derive(Parser)]
#[command(name = "git-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the association file, state and working copies. Defaults to ~/.git-bridge
    #[arg(long, global = true)]
    pub home: Option<String>,

    /// Project to operate on (defaults to the last one associated or selected)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Associate a project with a remote repository, cloning it on first use
    Associate {
        /// Project name
        project: String,

        /// Repository URI (SSH, HTTPS or local path)
        uri: String,

        /// Commit author name to configure in the working copy
        #[arg(long)]
        name: Option<String>,

        /// Commit author email to configure in the working copy
        #[arg(long)]
        email: Option<String>,

        /// Write the identity to the global git config instead
        #[arg(long)]
        global: bool,
    },
    /// Switch the active project
    Use {
        /// Project name
        project: String,
    },
    /// Show the active project, repository and sync state
    Status,
    /// List stored records
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show {
        /// Fingerprint or unique prefix
        fingerprint: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a new record and commit it
    #[command(subcommand)]
    Add(AddCommand),
    /// Remove a record and commit the deletion
    Remove {
        /// Fingerprint or unique prefix
        fingerprint: String,
    },
    /// Replace the description of a record you created, then push
    Describe {
        /// Fingerprint or unique prefix
        fingerprint: String,

        /// New description text
        text: String,
    },
    /// Pull remote changes and reload
    Pull,
    /// Pull then push local commits
    Push,
    /// Delete the local working copy of a repository, discarding unpushed work
    Forget {
        /// Repository URI
        uri: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Create a new repository to share records through
    Init {
        /// Directory to initialize
        dir: String,

        /// Create a bare repository suitable as a shared remote
        #[arg(long)]
        bare: bool,
    },
}

#[derive(Subcommand)]
pub enum AddCommand {
    /// Store a request/response pair
    Capture(CaptureArgs),
    /// Store a scanner finding described as JSON
    Finding {
        /// JSON file, or - for stdin
        file: String,
    },
}

#[derive(Args)]
pub struct CaptureArgs {
    /// Target host
    #[arg(long)]
    pub host: String,

    /// Target port
    #[arg(long)]
    pub port: u16,

    /// Protocol (http or https)
    #[arg(long, default_value = "https")]
    pub protocol: String,

    /// Full request URL
    #[arg(long, default_value = "")]
    pub url: String,

    /// File holding the raw request, or - for stdin
    #[arg(long)]
    pub request: String,

    /// File holding the raw response
    #[arg(long)]
    pub response: Option<String>,
}
