// Copyright (c) 2018 Fabian Schuiki

//! Fluent construction of rule grammar ASTs.
//!
//! This is the crate's stand-in for a reflective grammar extractor: the
//! engine only ever consumes [`Rule`](../gast/struct.Rule.html) values, and
//! any mechanism that produces them is acceptable. The builder mirrors the
//! shape of the rule's semantic action, so the occurrence indices given here
//! must match the ones passed to the parser primitives.

use gast::{Production, Rule};
use token::TokenType;

/// Build a rule from a sequence description.
///
/// ```ignore
/// let object = rule("object", |s| {
///     s.consume(1, l_curly)
///         .many_sep(1, comma, |s| s.subrule(1, "entry"))
///         .consume(2, r_curly)
/// });
/// ```
pub fn rule<S, F>(name: S, f: F) -> Rule
where
    S: Into<String>,
    F: FnOnce(SequenceBuilder) -> SequenceBuilder,
{
    Rule::new(name, f(SequenceBuilder::new()).build())
}

/// A builder for production sequences.
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    definition: Vec<Production>,
}

impl SequenceBuilder {
    /// Create a new empty sequence builder.
    pub fn new() -> SequenceBuilder {
        SequenceBuilder {
            definition: Vec::new(),
        }
    }

    /// Add a terminal to be consumed.
    pub fn consume(mut self, occurrence: usize, token_type: TokenType) -> Self {
        check_occurrence(occurrence);
        self.definition.push(Production::Terminal {
            token_type: token_type,
            occurrence: occurrence,
        });
        self
    }

    /// Add a reference to another rule.
    pub fn subrule<S: Into<String>>(mut self, occurrence: usize, rule: S) -> Self {
        check_occurrence(occurrence);
        self.definition.push(Production::NonTerminal {
            name: rule.into(),
            occurrence: occurrence,
            resolved: None,
        });
        self
    }

    /// Add an optional sequence.
    pub fn option<F>(mut self, occurrence: usize, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        check_occurrence(occurrence);
        self.definition.push(Production::Option {
            definition: f(SequenceBuilder::new()).build(),
            occurrence: occurrence,
        });
        self
    }

    /// Add a repetition of zero or more iterations.
    pub fn many<F>(mut self, occurrence: usize, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        check_occurrence(occurrence);
        self.definition.push(Production::Repetition {
            definition: f(SequenceBuilder::new()).build(),
            occurrence: occurrence,
        });
        self
    }

    /// Add a repetition of one or more iterations.
    pub fn at_least_one<F>(mut self, occurrence: usize, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        check_occurrence(occurrence);
        self.definition.push(Production::RepetitionMandatory {
            definition: f(SequenceBuilder::new()).build(),
            occurrence: occurrence,
        });
        self
    }

    /// Add a repetition of zero or more iterations separated by a terminal.
    pub fn many_sep<F>(mut self, occurrence: usize, separator: TokenType, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        check_occurrence(occurrence);
        self.definition.push(Production::RepetitionWithSeparator {
            definition: f(SequenceBuilder::new()).build(),
            separator: separator,
            occurrence: occurrence,
        });
        self
    }

    /// Add a repetition of one or more iterations separated by a terminal.
    pub fn at_least_one_sep<F>(mut self, occurrence: usize, separator: TokenType, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        check_occurrence(occurrence);
        self.definition
            .push(Production::RepetitionMandatoryWithSeparator {
                definition: f(SequenceBuilder::new()).build(),
                separator: separator,
                occurrence: occurrence,
            });
        self
    }

    /// Add a choice between alternatives.
    pub fn or<F>(mut self, occurrence: usize, f: F) -> Self
    where
        F: FnOnce(AlternationBuilder) -> AlternationBuilder,
    {
        check_occurrence(occurrence);
        self.definition.push(Production::Alternation {
            definition: f(AlternationBuilder::new()).build(),
            occurrence: occurrence,
        });
        self
    }

    /// Build the sequence.
    pub fn build(self) -> Vec<Production> {
        self.definition
    }
}

/// A builder for the alternatives of an `or`.
#[derive(Debug, Clone)]
pub struct AlternationBuilder {
    alternatives: Vec<Production>,
}

impl AlternationBuilder {
    fn new() -> AlternationBuilder {
        AlternationBuilder {
            alternatives: Vec::new(),
        }
    }

    /// Add an alternative.
    pub fn alt<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        self.alternatives.push(Production::Flat {
            definition: f(SequenceBuilder::new()).build(),
        });
        self
    }

    fn build(self) -> Vec<Production> {
        self.alternatives
    }
}

fn check_occurrence(occurrence: usize) {
    assert!(
        occurrence >= 1 && occurrence <= 5,
        "occurrence index must be a constant in 1..=5, got {}",
        occurrence
    );
}
