// Copyright (c) 2018 Fabian Schuiki

//! Data structures representing a reified grammar.
//!
//! Every rule of a grammar is described by a tree of [`Production`]
//! (enum.Production.html) nodes. The tree is built once per rule, cloned into
//! the per-grammar cache, and from then on is what self-analysis and the
//! parser runtime consult. References between rules are plain names until the
//! resolver binds them to [`RuleId`](struct.RuleId.html) handles into the
//! cache's rule arena.

use std::fmt;

use token::{TokenRegistry, TokenType};
use Pretty;

/// A unique rule identifier.
///
/// Indexes into the rule arena of the analyzed grammar.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(usize);

impl RuleId {
    /// Create a rule id from a usize.
    pub fn from_usize(id: usize) -> RuleId {
        RuleId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// The production kinds addressable from the parser primitives.
///
/// Each kind spans its own occurrence index space within a rule: `consume`
/// call sites are numbered independently from `option` call sites, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DslKind {
    /// A `consume` of a terminal.
    Consume,
    /// A `subrule` invocation.
    Subrule,
    /// An `option` construct.
    Option,
    /// A `many` repetition.
    Many,
    /// A `many_sep` repetition.
    ManySep,
    /// An `at_least_one` repetition.
    AtLeastOne,
    /// An `at_least_one_sep` repetition.
    AtLeastOneSep,
    /// An `or` alternation.
    Or,
}

impl fmt::Display for DslKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            DslKind::Consume => "CONSUME",
            DslKind::Subrule => "SUBRULE",
            DslKind::Option => "OPTION",
            DslKind::Many => "MANY",
            DslKind::ManySep => "MANY_SEP",
            DslKind::AtLeastOne => "AT_LEAST_ONE",
            DslKind::AtLeastOneSep => "AT_LEAST_ONE_SEP",
            DslKind::Or => "OR",
        };
        write!(f, "{}", name)
    }
}

/// A production node of a grammar rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    /// A concatenation of productions.
    Flat {
        /// The concatenated productions.
        definition: Vec<Production>,
    },
    /// A terminal to be consumed.
    Terminal {
        /// The token type of the terminal.
        token_type: TokenType,
        /// The occurrence index of this `consume` within its rule.
        occurrence: usize,
    },
    /// A reference to another rule.
    NonTerminal {
        /// The name of the referenced rule.
        name: String,
        /// The occurrence index of this `subrule` within its rule.
        occurrence: usize,
        /// The referenced rule, bound by the resolver.
        resolved: Option<RuleId>,
    },
    /// An optional production. EBNF `[...]`.
    Option {
        /// The optional productions.
        definition: Vec<Production>,
        /// The occurrence index of this `option` within its rule.
        occurrence: usize,
    },
    /// A repetition of zero or more iterations. EBNF `{...}`.
    Repetition {
        /// The repeated productions.
        definition: Vec<Production>,
        /// The occurrence index of this `many` within its rule.
        occurrence: usize,
    },
    /// A repetition of one or more iterations.
    RepetitionMandatory {
        /// The repeated productions.
        definition: Vec<Production>,
        /// The occurrence index of this `at_least_one` within its rule.
        occurrence: usize,
    },
    /// A repetition of zero or more iterations separated by a terminal.
    RepetitionWithSeparator {
        /// The repeated productions.
        definition: Vec<Production>,
        /// The separator between iterations.
        separator: TokenType,
        /// The occurrence index of this `many_sep` within its rule.
        occurrence: usize,
    },
    /// A repetition of one or more iterations separated by a terminal.
    RepetitionMandatoryWithSeparator {
        /// The repeated productions.
        definition: Vec<Production>,
        /// The separator between iterations.
        separator: TokenType,
        /// The occurrence index of this `at_least_one_sep` within its rule.
        occurrence: usize,
    },
    /// A choice between alternatives. Each alternative is a `Flat`.
    Alternation {
        /// The alternatives, in declaration order.
        definition: Vec<Production>,
        /// The occurrence index of this `or` within its rule.
        occurrence: usize,
    },
}

impl Production {
    /// The child productions of this node.
    ///
    /// Terminals and non-terminals are leaves and expose an empty definition.
    pub fn definition(&self) -> &[Production] {
        match *self {
            Production::Flat { ref definition }
            | Production::Option { ref definition, .. }
            | Production::Repetition { ref definition, .. }
            | Production::RepetitionMandatory { ref definition, .. }
            | Production::RepetitionWithSeparator { ref definition, .. }
            | Production::RepetitionMandatoryWithSeparator { ref definition, .. }
            | Production::Alternation { ref definition, .. } => definition,
            Production::Terminal { .. } | Production::NonTerminal { .. } => &[],
        }
    }

    /// The parser primitive kind this node corresponds to.
    ///
    /// `Flat` nodes are structural and have no kind.
    pub fn dsl_kind(&self) -> Option<DslKind> {
        match *self {
            Production::Flat { .. } => None,
            Production::Terminal { .. } => Some(DslKind::Consume),
            Production::NonTerminal { .. } => Some(DslKind::Subrule),
            Production::Option { .. } => Some(DslKind::Option),
            Production::Repetition { .. } => Some(DslKind::Many),
            Production::RepetitionMandatory { .. } => Some(DslKind::AtLeastOne),
            Production::RepetitionWithSeparator { .. } => Some(DslKind::ManySep),
            Production::RepetitionMandatoryWithSeparator { .. } => Some(DslKind::AtLeastOneSep),
            Production::Alternation { .. } => Some(DslKind::Or),
        }
    }

    /// The occurrence index of this node within its rule, if it has a kind.
    pub fn occurrence(&self) -> Option<usize> {
        match *self {
            Production::Flat { .. } => None,
            Production::Terminal { occurrence, .. }
            | Production::NonTerminal { occurrence, .. }
            | Production::Option { occurrence, .. }
            | Production::Repetition { occurrence, .. }
            | Production::RepetitionMandatory { occurrence, .. }
            | Production::RepetitionWithSeparator { occurrence, .. }
            | Production::RepetitionMandatoryWithSeparator { occurrence, .. }
            | Production::Alternation { occurrence, .. } => Some(occurrence),
        }
    }

    /// Deep copy this production for analysis.
    ///
    /// Non-terminal references come out unbound; the resolver re-binds them
    /// on the clone.
    pub fn clone_for_analysis(&self) -> Production {
        match *self {
            Production::NonTerminal {
                ref name,
                occurrence,
                ..
            } => Production::NonTerminal {
                name: name.clone(),
                occurrence: occurrence,
                resolved: None,
            },
            Production::Terminal {
                token_type,
                occurrence,
            } => Production::Terminal {
                token_type: token_type,
                occurrence: occurrence,
            },
            Production::Flat { ref definition } => Production::Flat {
                definition: clone_definition(definition),
            },
            Production::Option {
                ref definition,
                occurrence,
            } => Production::Option {
                definition: clone_definition(definition),
                occurrence: occurrence,
            },
            Production::Repetition {
                ref definition,
                occurrence,
            } => Production::Repetition {
                definition: clone_definition(definition),
                occurrence: occurrence,
            },
            Production::RepetitionMandatory {
                ref definition,
                occurrence,
            } => Production::RepetitionMandatory {
                definition: clone_definition(definition),
                occurrence: occurrence,
            },
            Production::RepetitionWithSeparator {
                ref definition,
                separator,
                occurrence,
            } => Production::RepetitionWithSeparator {
                definition: clone_definition(definition),
                separator: separator,
                occurrence: occurrence,
            },
            Production::RepetitionMandatoryWithSeparator {
                ref definition,
                separator,
                occurrence,
            } => Production::RepetitionMandatoryWithSeparator {
                definition: clone_definition(definition),
                separator: separator,
                occurrence: occurrence,
            },
            Production::Alternation {
                ref definition,
                occurrence,
            } => Production::Alternation {
                definition: clone_definition(definition),
                occurrence: occurrence,
            },
        }
    }

    /// Get a pretty printer for this production.
    pub fn pretty<'a>(&'a self, registry: &'a TokenRegistry) -> Pretty<&'a TokenRegistry, &'a Self> {
        Pretty::new(registry, self)
    }
}

fn clone_definition(definition: &[Production]) -> Vec<Production> {
    definition.iter().map(|p| p.clone_for_analysis()).collect()
}

/// A named rule of a grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// The name of the rule.
    pub name: String,
    /// The top level productions of the rule.
    pub definition: Vec<Production>,
}

impl Rule {
    /// Create a new rule.
    pub fn new<S: Into<String>>(name: S, definition: Vec<Production>) -> Rule {
        Rule {
            name: name.into(),
            definition: definition,
        }
    }

    /// Deep copy this rule for analysis, with all references unbound.
    pub fn clone_for_analysis(&self) -> Rule {
        Rule {
            name: self.name.clone(),
            definition: clone_definition(&self.definition),
        }
    }

    /// Get a pretty printer for this rule.
    pub fn pretty<'a>(&'a self, registry: &'a TokenRegistry) -> Pretty<&'a TokenRegistry, &'a Self> {
        Pretty::new(registry, self)
    }
}

/// A visitor over the productions of a rule.
///
/// Used together with [`walk_production`](fn.walk_production.html), which
/// calls the matching method for every node of a depth-first walk.
pub trait GastVisitor {
    /// Visit a `Flat` node.
    fn visit_flat(&mut self, _node: &Production) {}
    /// Visit a `Terminal` node.
    fn visit_terminal(&mut self, _node: &Production) {}
    /// Visit a `NonTerminal` node.
    fn visit_non_terminal(&mut self, _node: &Production) {}
    /// Visit an `Option` node.
    fn visit_option(&mut self, _node: &Production) {}
    /// Visit a `Repetition` node.
    fn visit_repetition(&mut self, _node: &Production) {}
    /// Visit a `RepetitionMandatory` node.
    fn visit_repetition_mandatory(&mut self, _node: &Production) {}
    /// Visit a `RepetitionWithSeparator` node.
    fn visit_repetition_with_separator(&mut self, _node: &Production) {}
    /// Visit a `RepetitionMandatoryWithSeparator` node.
    fn visit_repetition_mandatory_with_separator(&mut self, _node: &Production) {}
    /// Visit an `Alternation` node.
    fn visit_alternation(&mut self, _node: &Production) {}
}

/// Walk a production depth-first, dispatching on the visitor.
pub fn walk_production<V: GastVisitor>(production: &Production, visitor: &mut V) {
    match *production {
        Production::Flat { .. } => visitor.visit_flat(production),
        Production::Terminal { .. } => visitor.visit_terminal(production),
        Production::NonTerminal { .. } => visitor.visit_non_terminal(production),
        Production::Option { .. } => visitor.visit_option(production),
        Production::Repetition { .. } => visitor.visit_repetition(production),
        Production::RepetitionMandatory { .. } => visitor.visit_repetition_mandatory(production),
        Production::RepetitionWithSeparator { .. } => {
            visitor.visit_repetition_with_separator(production)
        }
        Production::RepetitionMandatoryWithSeparator { .. } => {
            visitor.visit_repetition_mandatory_with_separator(production)
        }
        Production::Alternation { .. } => visitor.visit_alternation(production),
    }
    walk_definition(production.definition(), visitor);
}

/// Walk a sequence of productions depth-first.
pub fn walk_definition<V: GastVisitor>(definition: &[Production], visitor: &mut V) {
    for production in definition {
        walk_production(production, visitor);
    }
}

impl<'a> fmt::Display for Pretty<&'a TokenRegistry, &'a Production> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.item {
            Production::Flat { ref definition } => {
                write!(f, "{}", DefinitionPretty(self.ctx, definition))
            }
            Production::Terminal { token_type, .. } => {
                write!(f, "{}", token_type.pretty(self.ctx))
            }
            Production::NonTerminal { ref name, .. } => write!(f, "{}", name),
            Production::Option { ref definition, .. } => {
                write!(f, "({})?", DefinitionPretty(self.ctx, definition))
            }
            Production::Repetition { ref definition, .. } => {
                write!(f, "({})*", DefinitionPretty(self.ctx, definition))
            }
            Production::RepetitionMandatory { ref definition, .. } => {
                write!(f, "({})+", DefinitionPretty(self.ctx, definition))
            }
            Production::RepetitionWithSeparator {
                ref definition,
                separator,
                ..
            } => write!(
                f,
                "({})[{}]*",
                DefinitionPretty(self.ctx, definition),
                separator.pretty(self.ctx)
            ),
            Production::RepetitionMandatoryWithSeparator {
                ref definition,
                separator,
                ..
            } => write!(
                f,
                "({})[{}]+",
                DefinitionPretty(self.ctx, definition),
                separator.pretty(self.ctx)
            ),
            Production::Alternation { ref definition, .. } => {
                write!(f, "(")?;
                for (index, alternative) in definition.iter().enumerate() {
                    if index > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", alternative.pretty(self.ctx))?;
                }
                write!(f, ")")
            }
        }
    }
}

struct DefinitionPretty<'a>(&'a TokenRegistry, &'a [Production]);

impl<'a> fmt::Display for DefinitionPretty<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut iter = self.1.iter();
        if let Some(production) = iter.next() {
            write!(f, "{}", production.pretty(self.0))?;
            for production in iter {
                write!(f, " {}", production.pretty(self.0))?;
            }
            Ok(())
        } else {
            write!(f, "ε")
        }
    }
}

impl<'a> fmt::Display for Pretty<&'a TokenRegistry, &'a Rule> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.item.name,
            DefinitionPretty(self.ctx, &self.item.definition)
        )
    }
}
