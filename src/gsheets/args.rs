use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gsheets")]
#[command(about = "Create, update, read and list Google Sheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (progress on stderr, debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.json
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct FormatFlags {
    /// Bold the first row
    #[arg(long)]
    pub bold_header: bool,

    /// Freeze the first row
    #[arg(long)]
    pub freeze_header: bool,

    /// Add a basic filter over the written data
    #[arg(long)]
    pub basic_filter: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new spreadsheet
    #[command(alias = "n")]
    Create {
        /// Spreadsheet title
        #[arg(short, long)]
        title: Option<String>,

        /// Rows as a JSON array of arrays
        #[arg(short, long, value_name = "JSON")]
        data: Option<String>,

        /// Formulas as a JSON object of A1 reference to formula
        #[arg(short, long, value_name = "JSON")]
        formulas: Option<String>,

        /// Email address to share the spreadsheet with
        #[arg(long, value_name = "EMAIL")]
        share_with: Option<String>,

        #[command(flatten)]
        format: FormatFlags,
    },

    /// Write into an existing spreadsheet
    #[command(alias = "u")]
    Update {
        /// Spreadsheet id or URL
        #[arg(long)]
        id: String,

        /// Rows as a JSON array of arrays
        #[arg(short, long, value_name = "JSON")]
        data: Option<String>,

        /// Formulas as a JSON object of A1 reference to formula
        #[arg(short, long, value_name = "JSON")]
        formulas: Option<String>,

        /// Target worksheet (defaults to the first)
        #[arg(short, long, value_name = "NAME")]
        worksheet: Option<String>,

        /// Clear existing values before writing
        #[arg(long)]
        clear: bool,

        #[command(flatten)]
        format: FormatFlags,
    },

    /// Print every populated row of a spreadsheet
    #[command(alias = "g")]
    Get {
        /// Spreadsheet id or URL
        #[arg(long)]
        id: String,

        /// Target worksheet (defaults to the first)
        #[arg(short, long, value_name = "NAME")]
        worksheet: Option<String>,
    },

    /// List accessible spreadsheets
    #[command(alias = "ls")]
    List {
        /// Case-insensitive title filter
        #[arg(long)]
        title_contains: Option<String>,

        /// Only spreadsheets in this Drive folder
        #[arg(long)]
        folder_id: Option<String>,

        /// Continuation token from a previous page
        #[arg(long)]
        page_token: Option<String>,

        /// Entries per page
        #[arg(long)]
        page_size: Option<i64>,
    },

    /// Invoke a tool by name with raw JSON arguments
    Call {
        /// Tool name, e.g. create_google_sheet
        tool: String,

        /// Arguments as a JSON object (read from stdin when omitted)
        args: Option<String>,
    },

    /// Print the tool descriptors
    Tools,
}
