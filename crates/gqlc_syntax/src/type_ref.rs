//! GraphQL type annotations.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A type reference, possibly wrapped in list / non-null modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Named type reference
    Named(String),
    /// `[T]`
    List(Box<TypeRef>),
    /// `T!`
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Returns the innermost named type, stripped of every modifier.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    /// Returns true if the outermost nullable layer is a list.
    pub fn is_list(&self) -> bool {
        match self {
            Self::Named(_) => false,
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Returns the element type of a list, looking through a non-null wrapper.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self {
            Self::List(inner) => Some(inner),
            Self::NonNull(inner) => inner.list_item(),
            Self::Named(_) => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Error produced when a type annotation cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type annotation `{input}`: {reason}")]
pub struct TypeRefParseError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = |reason| TypeRefParseError {
            input: input.to_string(),
            reason,
        };

        let mut parser = TypeRefParser {
            chars: input.trim().as_bytes(),
            pos: 0,
        };
        let ty = parser.parse_type().map_err(error)?;
        if parser.pos != parser.chars.len() {
            return Err(error("unexpected trailing characters"));
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

struct TypeRefParser<'a> {
    chars: &'a [u8],
    pos: usize,
}

impl TypeRefParser<'_> {
    fn parse_type(&mut self) -> Result<TypeRef, &'static str> {
        self.skip_whitespace();
        let base = match self.peek() {
            Some(b'[') => {
                self.pos += 1;
                let inner = self.parse_type()?;
                self.skip_whitespace();
                if self.peek() != Some(b']') {
                    return Err("unclosed list type");
                }
                self.pos += 1;
                TypeRef::list(inner)
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.pos += 1;
                }
                // Only ASCII bytes were consumed.
                let name = String::from_utf8_lossy(&self.chars[start..self.pos]).into_owned();
                TypeRef::Named(name)
            }
            Some(_) => return Err("expected a type name or `[`"),
            None => return Err("empty type"),
        };

        self.skip_whitespace();
        if self.peek() == Some(b'!') {
            self.pos += 1;
            return Ok(TypeRef::non_null(base));
        }
        Ok(base)
    }

    fn peek(&self) -> Option<u8> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}
