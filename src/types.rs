/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Write operations recorded while reconciling a form tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Levels of the form definition tree, top-down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Form,
    Section,
    Row,
    Column,
    Field,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Form => "Form",
            NodeKind::Section => "Section",
            NodeKind::Row => "Row",
            NodeKind::Column => "Column",
            NodeKind::Field => "Field",
        };
        f.write_str(name)
    }
}
