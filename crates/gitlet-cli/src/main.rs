//! gitlet CLI — a minimal git client.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// gitlet - a minimal git client
#[derive(Parser, Debug)]
#[command(name = "gitlet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new repository in the current directory
    Init,

    /// Print an object's content
    CatFile {
        /// Pretty-print the object's body
        #[arg(short = 'p')]
        pretty: bool,
        /// Object identifier (40-character hex)
        object: String,
    },

    /// Compute a blob's identifier, optionally storing it
    HashObject {
        /// Write the blob into the object store
        #[arg(short = 'w')]
        write: bool,
        /// File to hash
        file: String,
    },

    /// List a tree object's entries
    LsTree {
        /// Print entry names only
        #[arg(long)]
        name_only: bool,
        /// Tree identifier (40-character hex)
        tree: String,
    },

    /// Snapshot the current directory as a tree object
    WriteTree,

    /// Create a commit object from a tree
    CommitTree {
        /// Tree identifier (40-character hex)
        tree: String,
        /// Parent commit identifier (repeatable)
        #[arg(short = 'p')]
        parents: Vec<String>,
        /// Commit message
        #[arg(short = 'm')]
        message: String,
    },

    /// Clone a remote repository over smart HTTP
    Clone {
        /// Repository URL
        url: String,
        /// Destination directory
        dir: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gitlet={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Init => commands::init(),
        Commands::CatFile { pretty, object } => commands::cat_file(pretty, &object),
        Commands::HashObject { write, file } => commands::hash_object(write, &file),
        Commands::LsTree { name_only, tree } => commands::ls_tree(name_only, &tree),
        Commands::WriteTree => commands::write_tree(),
        Commands::CommitTree {
            tree,
            parents,
            message,
        } => commands::commit_tree(&tree, &parents, &message),
        Commands::Clone { url, dir } => commands::clone(&url, &dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
