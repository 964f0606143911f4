//! Command kinds.

use serde::{Deserialize, Serialize};

/// How the command text should be interpreted by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plain SQL text.
    #[default]
    Text,
    /// Name of a stored procedure.
    StoredProcedure,
    /// Name of a table, read in full.
    TableDirect,
}

impl CommandKind {
    /// Numeric code folded into identity hashes.
    ///
    /// Matches the conventional ADO-style command type values so hashes stay
    /// comparable with caches keyed the same way.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            CommandKind::Text => 1,
            CommandKind::StoredProcedure => 4,
            CommandKind::TableDirect => 512,
        }
    }

    /// Parse a command kind (case-insensitive).
    ///
    /// Returns `None` if the string is not a recognized kind.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" => Some(CommandKind::Text),
            "STOREDPROCEDURE" | "STORED_PROCEDURE" | "STORED PROCEDURE" | "PROC" => {
                Some(CommandKind::StoredProcedure)
            }
            "TABLEDIRECT" | "TABLE_DIRECT" | "TABLE DIRECT" => Some(CommandKind::TableDirect),
            _ => None,
        }
    }

    /// Stable name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandKind::Text => "text",
            CommandKind::StoredProcedure => "stored_procedure",
            CommandKind::TableDirect => "table_direct",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        assert_eq!(CommandKind::Text.code(), 1);
        assert_eq!(CommandKind::StoredProcedure.code(), 4);
        assert_eq!(CommandKind::TableDirect.code(), 512);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(CommandKind::from_str("text"), Some(CommandKind::Text));
        assert_eq!(
            CommandKind::from_str("StoredProcedure"),
            Some(CommandKind::StoredProcedure)
        );
        assert_eq!(
            CommandKind::from_str("table_direct"),
            Some(CommandKind::TableDirect)
        );
        assert_eq!(CommandKind::from_str("batch"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CommandKind::StoredProcedure).unwrap();
        assert_eq!(json, "\"stored_procedure\"");
        let back: CommandKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CommandKind::StoredProcedure);
    }
}
