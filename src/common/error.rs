/// Prolog error terms raised by the list library.
///
/// Culprits are rendered to text when the error is raised, so an error never
/// holds a heap address that a later relocation could invalidate.
use std::fmt;

use thiserror::Error;

/// Type names used in `type_error(Type, Culprit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    List,
    Pair,
    Compound,
    Dict,
    SortKey,
    Atom,
    Integer,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::List => "list",
            TypeKind::Pair => "pair",
            TypeKind::Compound => "compound",
            TypeKind::Dict => "dict",
            TypeKind::SortKey => "sort_key",
            TypeKind::Atom => "atom",
            TypeKind::Integer => "integer",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was missing in an `existence_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceKind {
    Argument,
    Key,
}

impl ExistenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExistenceKind::Argument => "argument",
            ExistenceKind::Key => "key",
        }
    }
}

impl fmt::Display for ExistenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domains named in `domain_error(Domain, Culprit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Order,
    NotLessThanOne,
}

impl DomainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainKind::Order => "order",
            DomainKind::NotLessThanOne => "not_less_than_one",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlError {
    #[error("Arguments are not sufficiently instantiated")]
    Instantiation,

    #[error("Type error: `{expected}' expected, found `{culprit}'")]
    Type { expected: TypeKind, culprit: String },

    #[error("{kind} `{key}' does not exist in `{culprit}'")]
    Existence {
        kind: ExistenceKind,
        key: String,
        culprit: String,
    },

    #[error("Domain error: `{domain}' expected, found `{culprit}'")]
    Domain { domain: DomainKind, culprit: String },

    #[error("Not enough resources: heap ({requested} cells requested)")]
    ResourceExhausted { requested: usize },

    #[error("Execution aborted: interrupted")]
    Interrupted,

    #[error("Syntax error: {message} (at byte {offset})")]
    Syntax { message: String, offset: usize },
}

impl PlError {
    pub fn type_error(expected: TypeKind, culprit: impl Into<String>) -> Self {
        PlError::Type {
            expected,
            culprit: culprit.into(),
        }
    }

    pub fn domain_error(domain: DomainKind, culprit: impl Into<String>) -> Self {
        PlError::Domain {
            domain,
            culprit: culprit.into(),
        }
    }

    pub fn existence_error(
        kind: ExistenceKind,
        key: impl Into<String>,
        culprit: impl Into<String>,
    ) -> Self {
        PlError::Existence {
            kind,
            key: key.into(),
            culprit: culprit.into(),
        }
    }

    /// Render as the ISO error term, e.g. `type_error(list,foo)`.
    pub fn to_term_text(&self) -> String {
        match self {
            PlError::Instantiation => "instantiation_error".to_string(),
            PlError::Type { expected, culprit } => format!("type_error({},{})", expected, culprit),
            PlError::Existence { kind, key, culprit } => {
                format!("existence_error({},{},{})", kind, key, culprit)
            }
            PlError::Domain { domain, culprit } => format!("domain_error({},{})", domain, culprit),
            PlError::ResourceExhausted { .. } => "resource_error(heap)".to_string(),
            PlError::Interrupted => "'$aborted'".to_string(),
            PlError::Syntax { message, .. } => format!("syntax_error({})", message),
        }
    }
}
