use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = OnyoError> = std::result::Result<T, E>;

/// The full error taxonomy, one variant per named failure kind.
#[derive(Error, Debug)]
pub enum OnyoError {
    #[error("'{0}' is not a git repository")]
    NotARepo(PathBuf),

    #[error("'{which}' failed integrity check")]
    InvalidRepo { which: &'static str },

    #[error("invalid path: '{0}'")]
    InvalidPath(PathBuf),

    #[error("'{0}' is a protected path")]
    ProtectedPath(PathBuf),

    #[error("'{0}' is not an asset")]
    NotAnAsset(PathBuf),

    #[error("'{0}' is not an inventory directory")]
    NotAnInventoryDir(PathBuf),

    #[error("'{0}' already exists")]
    PathExists(PathBuf),

    #[error("'{0}' does not exist")]
    PathAbsent(PathBuf),

    #[error("invalid asset name: '{0}'")]
    InvalidAssetName(String),

    #[error("'{0}' already exists")]
    DuplicateAssetName(String),

    #[error("asset is missing required key '{0}'")]
    MissingNameKey(String),

    #[error("required key '{0}' is empty")]
    EmptyNameKey(String),

    #[error("changing '{0}' requires --rename")]
    RenameRequired(String),

    #[error("invalid YAML in '{path}': {detail}")]
    InvalidYaml { path: PathBuf, detail: String },

    #[error("'{0}' is a reserved key and cannot be stored")]
    ReservedKey(String),

    #[error("conflicting keys: {0}")]
    ConflictingKeys(String),

    #[error("no such template '{0}'")]
    NoTemplate(String),

    #[error("conflicting flags: {0}")]
    FlagConflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation failed and was rolled back: {first_failure}")]
    TransactionAborted { first_failure: Box<OnyoError> },

    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    #[error("invalid query path: '{0}'")]
    InvalidQueryPath(PathBuf),

    #[error("git error ({code}): {stderr}")]
    VcsError { code: i32, stderr: String },

    #[error("cancelled")]
    UserCancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl OnyoError {
    /// CLI-facade exit code mapping: 0 success, 1 domain error, 2 usage
    /// error; VCS codes bubble through unchanged.
    pub fn exit_code(&self) -> i32 {
        match self {
            OnyoError::VcsError { code, .. } => *code,
            OnyoError::FlagConflict(_) | OnyoError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }
}
