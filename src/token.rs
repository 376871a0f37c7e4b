// Copyright (c) 2018 Fabian Schuiki

//! Terminal identity and token values.

use std::fmt;
use std::collections::HashMap;

use Pretty;

/// A unique token type identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenType(usize);

/// The special end of input token type.
pub const EOF: TokenType = TokenType(0);

impl TokenType {
    /// Create a token type from a usize.
    pub fn from_usize(id: usize) -> TokenType {
        TokenType(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }

    /// Get a pretty printer for this token type.
    pub fn pretty(self, registry: &TokenRegistry) -> Pretty<&TokenRegistry, Self> {
        Pretty::new(registry, self)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Debug for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<'a> fmt::Display for Pretty<&'a TokenRegistry, TokenType> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ctx.name(self.item))
    }
}

/// A registry of the token types a grammar is written over.
///
/// The end of input sentinel [`EOF`](constant.EOF.html) is always present.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    names: Vec<String>,
    ids: HashMap<String, TokenType>,
}

impl TokenRegistry {
    /// Create a new registry containing only the EOF sentinel.
    pub fn new() -> TokenRegistry {
        let mut registry = TokenRegistry {
            names: Vec::new(),
            ids: HashMap::new(),
        };
        registry.add("EOF");
        registry
    }

    /// Add a token type.
    ///
    /// Adding a name twice returns the previously assigned id.
    pub fn add<S: Into<String>>(&mut self, name: S) -> TokenType {
        let name = name.into();
        if let Some(&id) = self.ids.get(&name) {
            id
        } else {
            let id = TokenType(self.names.len());
            self.ids.insert(name.clone(), id);
            self.names.push(name);
            id
        }
    }

    /// Look up a token type by name.
    pub fn get(&self, name: &str) -> Option<TokenType> {
        self.ids.get(name).cloned()
    }

    /// Get the name of a token type.
    pub fn name(&self, id: TokenType) -> &str {
        &self.names[id.as_usize()]
    }

    /// The upper bound on token type ids.
    ///
    /// Basically returns the largest token type id + 1. Can be used as
    /// capacity for containers that will hold token types.
    pub fn id_bound(&self) -> usize {
        self.names.len()
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The type of the token.
    pub token_type: TokenType,
    /// The matched text.
    pub image: String,
    /// The line the token starts on, if known.
    pub line: Option<u32>,
    /// The column the token starts on, if known.
    pub column: Option<u32>,
    /// The byte offset the token starts at, if known.
    pub start_offset: Option<usize>,
    /// The byte offset the token ends at, if known.
    pub end_offset: Option<usize>,
    /// Whether the token was fabricated by single token insertion recovery.
    pub inserted_in_recovery: bool,
}

impl Token {
    /// Create a new token.
    pub fn new<S: Into<String>>(token_type: TokenType, image: S) -> Token {
        Token {
            token_type: token_type,
            image: image.into(),
            line: None,
            column: None,
            start_offset: None,
            end_offset: None,
            inserted_in_recovery: false,
        }
    }

    /// Create an end of input sentinel token.
    pub fn eof() -> Token {
        Token::new(EOF, "")
    }

    /// Check whether this is the end of input sentinel.
    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_is_injected() {
        let registry = TokenRegistry::new();
        assert_eq!(registry.get("EOF"), Some(EOF));
        assert_eq!(registry.name(EOF), "EOF");
        assert_eq!(registry.id_bound(), 1);
    }

    #[test]
    fn adding_twice_returns_same_id() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("Comma");
        let b = registry.add("Comma");
        assert_eq!(a, b);
        assert_eq!(registry.id_bound(), 2);
        assert_eq!(format!("{}", a.pretty(&registry)), "Comma");
    }

    #[test]
    fn eof_token() {
        assert!(Token::eof().is_eof());
        assert!(!Token::new(TokenType::from_usize(1), "x").is_eof());
    }
}
