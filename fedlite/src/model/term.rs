// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Opaque RDF-like terms
//!
//! The core never inspects term internals beyond equality and hashing.
//! The `Display` form is the canonical N-Triples-like rendering and is
//! consistent with equality.

use std::fmt;
use std::sync::Arc;

/// A bound value in a solution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// An IRI, stored without angle brackets
    Iri(Arc<str>),
    /// A literal with optional datatype IRI or language tag
    Literal {
        lexical: Arc<str>,
        datatype: Option<Arc<str>>,
        language: Option<Arc<str>>,
    },
    /// A blank node label
    Blank(Arc<str>),
}

impl Term {
    pub fn iri(iri: impl AsRef<str>) -> Self {
        Term::Iri(Arc::from(iri.as_ref()))
    }

    /// Plain string literal
    pub fn literal(lexical: impl AsRef<str>) -> Self {
        Term::Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl AsRef<str>, datatype: impl AsRef<str>) -> Self {
        Term::Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: Some(Arc::from(datatype.as_ref())),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl AsRef<str>, language: impl AsRef<str>) -> Self {
        Term::Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: None,
            language: Some(Arc::from(language.as_ref())),
        }
    }

    /// xsd:integer literal
    pub fn integer(value: i64) -> Self {
        Self::typed_literal(value.to_string(), "http://www.w3.org/2001/XMLSchema#integer")
    }

    pub fn blank(label: impl AsRef<str>) -> Self {
        Term::Blank(Arc::from(label.as_ref()))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"")?;
                for c in lexical.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
        }
    }
}
