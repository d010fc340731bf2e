pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

/// Track every change. Rebuild any state. Revert with confidence.
#[derive(Parser, Debug)]
#[command(name = "auditrail", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the store directory (default: .auditrail)
    #[arg(long, global = true)]
    pub dir: Option<String>,

    /// Acting user, recorded on mutations ("id" or "id:Display Name")
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an audit store in the current directory
    Init,

    /// Create, change or inspect live records (audited)
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Browse the audit trail
    Log {
        /// Filter by source (table/collection name)
        #[arg(long)]
        source: Option<String>,
        /// Filter by primary key (requires --source)
        #[arg(long)]
        key: Option<String>,
        /// Filter by entry type: create, update, delete, revert
        #[arg(long = "type")]
        log_type: Option<String>,
        /// Filter by user (substring match)
        #[arg(long)]
        user: Option<String>,
        /// Filter entries since this date (ISO 8601)
        #[arg(long)]
        since: Option<String>,
        /// Show last N entries
        #[arg(long)]
        last: Option<usize>,
    },

    /// Show one audit entry in full
    Show {
        /// Audit entry id
        id: u64,
    },

    /// Render an HTML diff report for one audit entry
    Diff {
        /// Audit entry id
        id: u64,
        /// Write the report to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
        /// Two-column layout instead of inline
        #[arg(long)]
        side_by_side: bool,
    },

    /// Revert a record to the state it had at a past audit entry
    Revert {
        /// Source (table/collection name)
        source: String,
        /// Primary key of the record
        key: String,
        /// Target audit entry id
        entry: u64,
        /// Only revert these fields (partial revert)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Show what would change without touching anything
        #[arg(long)]
        preview: bool,
    },

    /// Re-create a deleted record from its last delete entry
    Restore {
        /// Source (table/collection name)
        source: String,
        /// Primary key of the record
        key: String,
    },

    /// Purge audit entries past their retention period
    Cleanup {
        /// Only purge this source
        #[arg(long)]
        source: Option<String>,
        /// Override the configured retention period
        #[arg(long)]
        days: Option<u64>,
        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RecordAction {
    /// Create or update a record from field=value pairs
    Set {
        /// Source (table/collection name)
        source: String,
        /// Primary key of the record
        key: String,
        /// Field assignments, e.g. title="Hello" published=true
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Delete a record (its final state is kept in the trail)
    Delete {
        /// Source (table/collection name)
        source: String,
        /// Primary key of the record
        key: String,
    },
    /// Print a record's current fields
    Show {
        /// Source (table/collection name)
        source: String,
        /// Primary key of the record
        key: String,
    },
}
