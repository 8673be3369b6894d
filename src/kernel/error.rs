use std::fmt;
use std::io;

/// Raised while compiling a grammar source. Fatal to loading that grammar: the caller falls back
/// to no highlighting for the language.
#[derive(Debug)]
pub enum GrammarError {
    UnresolvedInclude {
        grammar: String,
        include: String,
    },
    InvalidPattern {
        grammar: String,
        rule: String,
        source: regex::Error,
    },
    UnsupportedRule {
        grammar: String,
        rule: String,
        reason: &'static str,
    },
    EmptyGrammar {
        grammar: String,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnresolvedInclude { grammar, include } => {
                write!(f, "{}: unresolved include {:?}", grammar, include)
            }
            GrammarError::InvalidPattern {
                grammar,
                rule,
                source,
            } => write!(f, "{}: invalid pattern in {}: {}", grammar, rule, source),
            GrammarError::UnsupportedRule {
                grammar,
                rule,
                reason,
            } => write!(f, "{}: unsupported rule {}: {}", grammar, rule, reason),
            GrammarError::EmptyGrammar { grammar } => {
                write!(f, "{}: grammar has no scope name", grammar)
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Runtime failure while matching a single line. Never escapes the incremental driver: the line
/// degrades to one unscoped token instead.
#[derive(Debug)]
pub enum MatchEngineError {
    StepLimitExceeded { limit: usize, offset: usize },
    DynamicEndPattern(regex::Error),
    /// The incoming state refers to a rule the grammar does not have (a state from another
    /// grammar).
    UnknownRule { rule: usize, rule_count: usize },
}

impl fmt::Display for MatchEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchEngineError::StepLimitExceeded { limit, offset } => write!(
                f,
                "rule evaluation limit ({}) exceeded at offset {}",
                limit, offset
            ),
            MatchEngineError::DynamicEndPattern(e) => {
                write!(f, "Invalid resolved end pattern: {}", e)
            }
            MatchEngineError::UnknownRule { rule, rule_count } => write!(
                f,
                "state refers to rule #{} but the grammar has {} rules",
                rule, rule_count
            ),
        }
    }
}

impl std::error::Error for MatchEngineError {}

impl From<regex::Error> for MatchEngineError {
    fn from(e: regex::Error) -> Self {
        MatchEngineError::DynamicEndPattern(e)
    }
}

#[derive(Debug)]
pub enum AssetError {
    NotFound(String),
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(what) => write!(f, "Asset not found: {}", what),
            AssetError::Io(e) => write!(f, "IO error: {}", e),
            AssetError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<io::Error> for AssetError {
    fn from(e: io::Error) -> Self {
        AssetError::Io(e)
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(e: serde_json::Error) -> Self {
        AssetError::Parse(e)
    }
}
