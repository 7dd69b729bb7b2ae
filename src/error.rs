use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE_MULTIPLE_ROOTS: &str = "W-ERR-PARSE-001";
pub const ERR_PARSE_MISMATCHED_TAG: &str = "W-ERR-PARSE-002";
pub const ERR_PARSE_UNRESOLVED_TAG: &str = "W-ERR-PARSE-003";
pub const ERR_PARSE_UNKNOWN_DIRECTIVE: &str = "W-ERR-PARSE-004";
pub const ERR_PARSE_BAD_DIRECTIVE: &str = "W-ERR-PARSE-005";
pub const ERR_PARSE_DUPLICATE_SLOT: &str = "W-ERR-PARSE-006";
pub const ERR_PARSE_NO_ROOT: &str = "W-ERR-PARSE-007";
pub const ERR_PARSE_MALFORMED: &str = "W-ERR-PARSE-008";

pub const ERR_EXPR_SYNTAX: &str = "W-ERR-EXPR-001";

pub const ERR_DIR_ORPHAN_BRANCH: &str = "W-ERR-DIR-001";
pub const ERR_DIR_ROOT_STRUCTURAL: &str = "W-ERR-DIR-002";
pub const ERR_DIR_MODEL_REACTIVE: &str = "W-ERR-DIR-003";
pub const ERR_DIR_MODEL_PATH: &str = "W-ERR-DIR-004";

pub const ERR_EVENT_UNDECLARED: &str = "W-ERR-EVENT-001";

pub const ERR_MOUNT_NON_ROOT: &str = "W-ERR-MOUNT-001";
pub const ERR_MOUNT_TWICE: &str = "W-ERR-MOUNT-002";
pub const ERR_MOUNT_NO_TARGET: &str = "W-ERR-MOUNT-003";

/// Invariant statement for each code, surfaced alongside the message so an
/// embedder sees what rule was broken, not just where.
fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE_MULTIPLE_ROOTS => "A template parses to exactly one root element.",
        ERR_PARSE_MISMATCHED_TAG => "Every opened tag is closed with the same name.",
        ERR_PARSE_UNRESOLVED_TAG => "Custom tags resolve to a registered component recipe.",
        ERR_PARSE_UNKNOWN_DIRECTIVE => "Directive commands are registered before use.",
        ERR_PARSE_BAD_DIRECTIVE => "Directive attributes follow @command:target.params syntax.",
        ERR_PARSE_DUPLICATE_SLOT => "Slot names are unique within one component template.",
        ERR_PARSE_NO_ROOT => "A template contains one root element.",
        ERR_PARSE_MALFORMED => "Template markup is well formed.",
        ERR_EXPR_SYNTAX => "Expressions conform to the restricted expression grammar.",
        ERR_DIR_ORPHAN_BRANCH => "elif/else require a preceding sibling if.",
        ERR_DIR_ROOT_STRUCTURAL => {
            "Structural directives cannot suppress or multiply the template root."
        }
        ERR_DIR_MODEL_REACTIVE => {
            "model binds only non-reactive fields to avoid two-way feedback loops."
        }
        ERR_DIR_MODEL_PATH => "model binds an identifier path, not an arbitrary expression.",
        ERR_EVENT_UNDECLARED => "Components emit only events they declare.",
        ERR_MOUNT_NON_ROOT => "Only a component without a host may be mounted.",
        ERR_MOUNT_TWICE => "An instance is mounted at most once.",
        ERR_MOUNT_NO_TARGET => "The mount target exists on the display surface.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAMEWORK ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeftError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
}

impl WeftError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        WeftError {
            code: code.to_string(),
            message: message.into(),
            guarantee: get_guarantee(code).to_string(),
        }
    }

    pub fn is_parse(&self) -> bool {
        self.code.starts_with("W-ERR-PARSE") || self.code.starts_with("W-ERR-EXPR")
    }

    pub fn is_directive_usage(&self) -> bool {
        self.code.starts_with("W-ERR-DIR")
    }

    pub fn is_mount(&self) -> bool {
        self.code.starts_with("W-ERR-MOUNT")
    }
}

impl fmt::Display for WeftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for WeftError {}

pub type Result<T> = std::result::Result<T, WeftError>;
