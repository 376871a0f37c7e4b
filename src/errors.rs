// Copyright (c) 2018 Fabian Schuiki

//! Errors reported by grammar self-analysis and by the parser runtime.
//!
//! The two taxonomies are strictly separate: `DefinitionError`s are produced
//! once per grammar while it is being analyzed, `RecognitionError`s are
//! produced while parsing an input. Errors from user actions are neither and
//! propagate through the parser unchanged.

use std::error;
use std::fmt;

use thiserror::Error;

use gast::DslKind;
use token::Token;

/// The classes of errors detected during grammar self-analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionErrorKind {
    /// A rule name that is not a valid identifier.
    InvalidRuleName,
    /// A rule name declared more than once.
    DuplicateRuleName,
    /// An override that does not shadow any earlier rule.
    InvalidRuleOverride,
    /// Two productions of the same kind sharing an occurrence index.
    DuplicateProductions,
    /// A subrule reference to a rule that does not exist.
    UnresolvedSubruleRef,
    /// A rule that can reach itself without consuming a terminal.
    LeftRecursion,
    /// An empty alternative that is not the last alternative.
    NoneLastEmptyAlt,
    /// Two alternatives that share a lookahead path.
    AmbiguousAlts,
}

impl fmt::Display for DefinitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            DefinitionErrorKind::InvalidRuleName => "INVALID_RULE_NAME",
            DefinitionErrorKind::DuplicateRuleName => "DUPLICATE_RULE_NAME",
            DefinitionErrorKind::InvalidRuleOverride => "INVALID_RULE_OVERRIDE",
            DefinitionErrorKind::DuplicateProductions => "DUPLICATE_PRODUCTIONS",
            DefinitionErrorKind::UnresolvedSubruleRef => "UNRESOLVED_SUBRULE_REF",
            DefinitionErrorKind::LeftRecursion => "LEFT_RECURSION",
            DefinitionErrorKind::NoneLastEmptyAlt => "NONE_LAST_EMPTY_ALT",
            DefinitionErrorKind::AmbiguousAlts => "AMBIGUOUS_ALTS",
        };
        write!(f, "{}", name)
    }
}

/// An error in the definition of a grammar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct DefinitionError {
    /// The class of the error.
    pub kind: DefinitionErrorKind,
    /// The rule the error was detected in.
    pub rule_name: String,
    /// A human readable description of the error.
    pub message: String,
    /// The production kind involved, for production level errors.
    pub dsl_kind: Option<DslKind>,
    /// The occurrence index involved, for production level errors.
    pub occurrence: Option<usize>,
    /// The 1-based alternative indices involved, for ambiguity errors.
    pub alternatives: Vec<usize>,
}

impl DefinitionError {
    pub(crate) fn new<S1, S2>(kind: DefinitionErrorKind, rule_name: S1, message: S2) -> DefinitionError
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        DefinitionError {
            kind: kind,
            rule_name: rule_name.into(),
            message: message.into(),
            dsl_kind: None,
            occurrence: None,
            alternatives: Vec::new(),
        }
    }

    pub(crate) fn at_production(mut self, dsl_kind: DslKind, occurrence: usize) -> DefinitionError {
        self.dsl_kind = Some(dsl_kind);
        self.occurrence = Some(occurrence);
        self
    }

    pub(crate) fn with_alternatives(mut self, alternatives: Vec<usize>) -> DefinitionError {
        self.alternatives = alternatives;
        self
    }
}

/// The aggregated definition errors of one grammar.
///
/// Raised by parser construction unless error deferral is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionErrors {
    /// The individual errors, in detection order.
    pub errors: Vec<DefinitionError>,
}

impl fmt::Display for DefinitionErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "errors detected in grammar definition:")?;
        for error in &self.errors {
            write!(f, "\n- [{}] {}", error.kind, error.message)?;
        }
        Ok(())
    }
}

impl error::Error for DefinitionErrors {}

/// The classes of recognition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognitionErrorKind {
    /// A specific terminal was expected but another token was found.
    MismatchedToken,
    /// No alternative of an `or` matched the lookahead window.
    NoViableAlt,
    /// An `at_least_one` style repetition ran zero iterations.
    EarlyExit,
    /// The top rule succeeded but input remains.
    NotAllInputParsed,
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            RecognitionErrorKind::MismatchedToken => "MismatchedToken",
            RecognitionErrorKind::NoViableAlt => "NoViableAlt",
            RecognitionErrorKind::EarlyExit => "EarlyExit",
            RecognitionErrorKind::NotAllInputParsed => "NotAllInputParsed",
        };
        write!(f, "{}", name)
    }
}

/// An error encountered while recognizing an input.
///
/// Carries the offending token and the rule stack context at the point of
/// the error. Tokens skipped by re-synchronization are attached as
/// `resynced_tokens`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RecognitionError {
    /// The class of the error.
    pub kind: RecognitionErrorKind,
    /// A human readable description of the error.
    pub message: String,
    /// The token the error occurred at.
    pub token: Token,
    /// The names of the rules being parsed, outermost first.
    pub rule_stack: Vec<String>,
    /// The subrule occurrence indices matching `rule_stack`.
    pub rule_occurrence_stack: Vec<usize>,
    /// The tokens discarded by re-synchronization recovery.
    pub resynced_tokens: Vec<Token>,
}

impl RecognitionError {
    pub(crate) fn new<S: Into<String>>(
        kind: RecognitionErrorKind,
        message: S,
        token: Token,
    ) -> RecognitionError {
        RecognitionError {
            kind: kind,
            message: message.into(),
            token: token,
            rule_stack: Vec::new(),
            rule_occurrence_stack: Vec::new(),
            resynced_tokens: Vec::new(),
        }
    }
}
