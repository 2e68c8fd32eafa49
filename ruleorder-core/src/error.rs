use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuleOrderError>;

#[derive(Debug, Error)]
pub enum RuleOrderError {
    /// Malformed XML, either in a filter file or in a drag payload
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} has no <rules> container under its root element", path.display())]
    MissingRules { path: PathBuf },

    /// Save could not reproduce anything but UTF-8, so other encodings are refused up front
    #[error("{} declares encoding '{encoding}', only UTF-8 filters are supported", path.display())]
    UnsupportedEncoding { path: PathBuf, encoding: String },

    #[error("rule index {index} is out of range for {len} rules")]
    Index { index: usize, len: usize },

    #[error("rows {first} and {second} are not adjacent")]
    NotAdjacent { first: usize, second: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    SaveAll(SaveFailures),
}

impl RuleOrderError {
    pub fn parse(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Open-time failures: the file is skipped, other files are unaffected
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::MissingRules { .. } | Self::UnsupportedEncoding { .. }
        )
    }

    pub fn is_index_error(&self) -> bool {
        matches!(self, Self::Index { .. } | Self::NotAdjacent { .. })
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::SaveAll(_))
    }
}

/// Every save that failed during a save-all pass, in editor order.
#[derive(Debug, Default)]
pub struct SaveFailures {
    pub failures: Vec<(PathBuf, RuleOrderError)>,
}

impl SaveFailures {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for SaveFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.first() {
            Some((_, first)) if self.failures.len() == 1 => write!(f, "save failed: {first}"),
            Some((_, first)) => write!(
                f,
                "{} saves failed, first: {first}",
                self.failures.len()
            ),
            None => write!(f, "no save failures"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(RuleOrderError::parse("a.xml", "bad").is_parse_error());
        assert!(RuleOrderError::MissingRules { path: "a.xml".into() }.is_parse_error());
        assert!(RuleOrderError::Index { index: 3, len: 2 }.is_index_error());
        assert!(RuleOrderError::NotAdjacent { first: 0, second: 2 }.is_index_error());

        let io = RuleOrderError::io("a.xml", std::io::Error::other("disk full"));
        assert!(io.is_io_error());
        assert!(!io.is_parse_error());
    }

    #[test]
    fn test_save_failures_message_names_first_failure() {
        let failures = SaveFailures {
            failures: vec![
                ("a.xml".into(), RuleOrderError::io("a.xml", std::io::Error::other("denied"))),
                ("b.xml".into(), RuleOrderError::io("b.xml", std::io::Error::other("full"))),
            ],
        };
        let message = RuleOrderError::SaveAll(failures).to_string();
        assert!(message.starts_with("2 saves failed"));
        assert!(message.contains("a.xml"));
        assert!(message.contains("denied"));
    }
}
