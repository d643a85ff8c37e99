//! Filesystem-protocol string constants, centralized in one place instead
//! of scattered as literals across the modules that use them.

pub const ONYO_DIR: &str = ".onyo";
pub const GIT_DIR: &str = ".git";
pub const ANCHOR_FILE: &str = ".anchor";
pub const ASSET_DIR_FILE: &str = ".asset";
pub const CONFIG_FILE: &str = "config";
pub const TEMPLATES_DIR: &str = "templates";
pub const VALIDATION_DIR: &str = "validation";

pub const RESERVED_DIRS: &[&str] = &[ANCHOR_FILE, GIT_DIR, ONYO_DIR];

/// Default required name keys, in the order they are assembled into a leaf name.
pub const DEFAULT_NAME_KEYS: &[&str] = &["type", "make", "model", "serial"];

/// Reserved keys: accepted as input, never persisted to disk.
pub const RESERVED_KEYS: &[&str] = &["directory", "is_asset_directory", "template"];

// .onyo/config section.key names
pub const CFG_NAME_FORMAT: &str = "onyo.assets.name-format";
pub const CFG_EDITOR: &str = "onyo.core.editor";
pub const CFG_HISTORY_INTERACTIVE: &str = "onyo.history.interactive";
pub const CFG_HISTORY_NON_INTERACTIVE: &str = "onyo.history.non-interactive";
pub const CFG_NEW_TEMPLATE: &str = "onyo.new.template";
pub const CFG_REPO_VERSION: &str = "onyo.repo.version";

pub const DEFAULT_EDITOR: &str = "nano";
pub const DEFAULT_HISTORY_INTERACTIVE: &str = "tig --follow";
pub const DEFAULT_HISTORY_NON_INTERACTIVE: &str = "git --no-pager log --follow";
pub const DEFAULT_TEMPLATE_NAME: &str = "empty";
pub const REPO_VERSION: &str = "1";

pub const OPERATIONS_FOOTER_HEADER: &str = "--- Inventory Operations ---";

pub const COMMIT_SUBJECT_MAX_LEN: usize = 80;
