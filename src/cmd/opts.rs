//! CLI argument definitions for every onyo subcommand, using clap's
//! doc-comment-as-help-text convention throughout.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;

/// A text-based inventory system built on git
///
/// onyo tracks assets as YAML-ish text files inside a git repository. Each
/// asset's path encodes its type, make, model, and serial number; its
/// content holds arbitrary structured fields. Every mutating command stages
/// one or more inventory operations, previews them as a diff, and commits
/// them as a single git commit recording both a human-readable message and
/// a machine-parseable operations footer.
#[derive(Debug, Parser)]
#[command(name = "onyo", author, version)]
pub struct OnyoArgs {
    /// Path to operate in; defaults to the current directory
    #[arg(short = 'C', long, value_name = "PATH", global = true)]
    pub path: Option<PathBuf>,

    /// Answer yes to all confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Suppress non-error output; requires --yes
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use the given commit message instead of the generated one
    #[arg(short, long, value_name = "MESSAGE", global = true)]
    pub message: Option<String>,

    /// Stage and preview the operation without committing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[enum_dispatch(Cmd)]
#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "init")]
    Init(InitCmd),
    #[command(name = "new")]
    New(NewCmd),
    #[command(name = "mkdir")]
    Mkdir(MkdirCmd),
    #[command(name = "rm")]
    Remove(RemoveCmd),
    #[command(name = "mv")]
    Move(MoveCmd),
    #[command(name = "set")]
    Set(SetCmd),
    #[command(name = "unset")]
    Unset(UnsetCmd),
    #[command(name = "get")]
    Get(GetCmd),
    #[command(name = "cat")]
    Cat(CatCmd),
    #[command(name = "edit")]
    Edit(EditCmd),
    #[command(name = "show")]
    Show(ShowCmd),
    #[command(name = "tree")]
    Tree(TreeCmd),
    #[command(name = "history")]
    History(HistoryCmd),
    #[command(name = "config")]
    Config(ConfigCmd),
    #[command(name = "fsck")]
    Fsck(FsckCmd),
}

/// Create a new onyo repository in the target directory
///
/// Initializes a git repository if one does not already exist, scaffolds
/// `.onyo/` (config, templates/, validation/), and commits the result.
#[derive(Args, Debug)]
pub struct InitCmd {}

/// Create one or more new assets
///
/// Each `--keys key=value` group defines one new asset's overrides on top
/// of the selected template. Faux serials may be requested with
/// `serial=faux`, generating unique placeholder values.
#[derive(Args, Debug)]
pub struct NewCmd {
    /// Directory to create the new asset(s) in
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Name of the template to apply
    #[arg(short, long, value_name = "NAME")]
    pub template: Option<String>,

    /// TSV file describing multiple assets to create; its header row
    /// declares keys, with `directory` and `template` as special columns.
    /// `--keys` may supplement every row but may not name a column the
    /// table itself declares.
    #[arg(long, value_name = "PATH")]
    pub tsv: Option<PathBuf>,

    /// `key=value` overrides; with `--tsv`, supplements every row. Without
    /// it, repeating `serial=faux` together with `--faux-count N > 1`
    /// creates N assets sharing the other keys, each with its own serial.
    #[arg(short, long, value_name = "KEY=VALUE", num_args = 1..)]
    pub keys: Vec<String>,

    /// With `serial=faux` and no `--tsv`, the number of assets to create
    /// in this batch (one faux serial apiece)
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub faux_count: usize,

    /// Length of generated faux serials
    #[arg(long, value_name = "LEN", default_value_t = 6)]
    pub faux_length: usize,
}

/// Create one or more new inventory directories
#[derive(Args, Debug)]
pub struct MkdirCmd {
    /// Directories to create
    #[arg(value_name = "DIR", required = true)]
    pub directories: Vec<PathBuf>,
}

/// Remove assets or inventory directories
#[derive(Args, Debug)]
pub struct RemoveCmd {
    /// Remove non-empty directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Paths to remove
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Move assets or directories into a destination directory
#[derive(Args, Debug)]
pub struct MoveCmd {
    /// Source paths to move
    #[arg(value_name = "SRC", required = true)]
    pub sources: Vec<PathBuf>,

    /// Destination inventory directory
    #[arg(value_name = "DST")]
    pub destination: PathBuf,
}

/// Set key/value fields on one or more assets
///
/// If the new values would change the synthesized leaf name, `--rename`
/// must be passed explicitly; otherwise the command fails with a
/// `changing '<name>' requires --rename` error.
#[derive(Args, Debug)]
pub struct SetCmd {
    /// `key=value` pair to set, repeatable (`--keys a=1 --keys b=2`);
    /// dotted keys address nested fields
    #[arg(short, long, value_name = "KEY=VALUE", required = true)]
    pub keys: Vec<String>,

    /// Allow the edit to rename the asset
    #[arg(long)]
    pub rename: bool,

    /// Assets or directories to modify
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Unset key/value fields on one or more assets
#[derive(Args, Debug)]
pub struct UnsetCmd {
    /// Dotted key to remove, repeatable (`--keys a --keys b`)
    #[arg(short, long, value_name = "KEY", required = true)]
    pub keys: Vec<String>,

    /// Allow the edit to rename the asset
    #[arg(long)]
    pub rename: bool,

    /// Assets or directories to modify
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Query assets and print selected fields
#[derive(Args, Debug)]
pub struct GetCmd {
    /// Keys to project, in output order; defaults to type,make,model,serial
    #[arg(short = 'k', long = "key", value_name = "KEY")]
    pub keys: Vec<String>,

    /// `key=value` filter predicates; value may be a regex, `<unset>`, `<dict>`, or `<list>`
    #[arg(short = 'f', long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Maximum depth below each scope path to recurse; 0 = unlimited
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub depth: i64,

    /// Sort rows by the first projected key, ascending
    #[arg(long, conflicts_with = "sort_descending")]
    pub sort_ascending: bool,

    /// Sort rows by the first projected key, descending
    #[arg(long, conflicts_with = "sort_ascending")]
    pub sort_descending: bool,

    /// Print a header row
    #[arg(short = 'H', long)]
    pub header: bool,

    /// Tab-separate the output instead of aligning columns
    #[arg(long)]
    pub machine_readable: bool,

    /// Inventory directories or assets to scope the query to
    #[arg(value_name = "PATH")]
    pub scopes: Vec<PathBuf>,
}

/// Print an asset's raw YAML content to stdout
#[derive(Args, Debug)]
pub struct CatCmd {
    /// Assets to print
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Open an asset in `$EDITOR` (or the configured editor) and stage the result
#[derive(Args, Debug)]
pub struct EditCmd {
    /// Assets to edit
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Print the current state of one or more assets as a multi-document YAML
/// stream (documents separated by `---`)
///
/// Each argument may be an asset or an inventory directory; directories are
/// expanded to every asset found beneath them. With no arguments, the whole
/// repository is shown.
#[derive(Args, Debug)]
pub struct ShowCmd {
    /// Assets or inventory directories to show
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Print the directory tree of an inventory directory
#[derive(Args, Debug)]
pub struct TreeCmd {
    /// Root of the tree to display
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Maximum depth to descend
    #[arg(short, long, value_name = "N")]
    pub depth: Option<usize>,
}

/// Show the git history of a path
#[derive(Args, Debug)]
pub struct HistoryCmd {
    /// Use the interactive history command instead of the non-interactive one
    #[arg(short, long)]
    pub interactive: bool,

    /// Path whose history to display; defaults to the whole repository
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

/// Get, set, or unset repository configuration options
#[derive(Args, Debug)]
pub struct ConfigCmd {
    /// Name of the configuration option, e.g. `onyo.core.editor`
    #[arg(value_name = "NAME")]
    pub name: String,

    /// New value to set; omit to print the current value
    #[arg(value_name = "VALUE", conflicts_with = "unset")]
    pub value: Option<String>,

    /// Remove the configuration option
    #[arg(long, conflicts_with = "value")]
    pub unset: bool,
}

/// Run repository integrity checks
#[derive(Args, Debug)]
pub struct FsckCmd {}
