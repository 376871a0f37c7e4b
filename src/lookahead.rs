// Copyright (c) 2018 Fabian Schuiki

//! Lookahead path computation.
//!
//! This module enumerates, for any point of a grammar, the k-bounded token
//! paths that may begin the productions from that point onwards. The paths
//! feed three consumers: the ambiguity validation, the decision functions
//! that drive `option`/`many`/`or` at parse time, and the FOLLOW computation
//! (which runs with k = 1 over rule continuations).

use std::collections::HashMap;

use indexmap::IndexSet;

use gast::{DslKind, Production, Rule, RuleId};
use token::TokenType;

/// A bounded lookahead path: the token types of one possible prefix.
pub(crate) type TokenPath = Vec<TokenType>;

/// A step of the path enumeration work stack.
///
/// The stack top is the next step to process. Repetitions re-enter through
/// `Again`, which is also where the no-progress guard cuts the enumeration.
#[derive(Clone)]
pub(crate) enum Walk<'a> {
    /// Process a sequence of productions.
    Seq(&'a [Production]),
    /// Process a single production.
    Prod(&'a Production),
    /// Match a fixed terminal, e.g. a repetition separator.
    Tok(TokenType),
    /// Optionally run another iteration of a repetition.
    Again(&'a Production),
}

/// Enumerate the token paths of length at most `k` that may begin `work`.
///
/// Paths shorter than `k` end where the walked productions end. All
/// non-terminals reachable from `work` must be resolved.
pub(crate) fn collect_paths(rules: &[Rule], k: usize, work: Vec<Walk>) -> Vec<TokenPath> {
    let mut out = IndexSet::new();
    let mut prefix = Vec::new();
    collect(rules, k, work, &mut prefix, Vec::new(), &mut out);
    out.into_iter().collect()
}

/// Enumerate the token paths that may begin a production sequence.
pub(crate) fn possible_prefix_paths(
    definition: &[Production],
    rules: &[Rule],
    k: usize,
) -> Vec<TokenPath> {
    collect_paths(rules, k, vec![Walk::Seq(definition)])
}

fn collect<'a>(
    rules: &'a [Rule],
    k: usize,
    mut work: Vec<Walk<'a>>,
    prefix: &mut Vec<TokenType>,
    mut guards: Vec<(usize, usize)>,
    out: &mut IndexSet<TokenPath>,
) {
    let entry_len = prefix.len();
    loop {
        if prefix.len() == k {
            out.insert(prefix.clone());
            break;
        }
        let step = match work.pop() {
            Some(step) => step,
            None => {
                out.insert(prefix.clone());
                break;
            }
        };
        match step {
            Walk::Tok(token_type) => prefix.push(token_type),
            Walk::Seq(definition) => {
                for production in definition.iter().rev() {
                    work.push(Walk::Prod(production));
                }
            }
            Walk::Prod(production) => match *production {
                Production::Terminal { token_type, .. } => prefix.push(token_type),
                Production::NonTerminal { ref resolved, .. } => {
                    let id = resolved.expect("unresolved reference during path enumeration");
                    work.push(Walk::Seq(&rules[id.as_usize()].definition));
                }
                Production::Flat { ref definition } => work.push(Walk::Seq(definition)),
                Production::Option { ref definition, .. } => {
                    collect(rules, k, work.clone(), prefix, guards.clone(), out);
                    work.push(Walk::Seq(definition));
                }
                Production::Repetition { ref definition, .. }
                | Production::RepetitionWithSeparator { ref definition, .. } => {
                    collect(rules, k, work.clone(), prefix, guards.clone(), out);
                    work.push(Walk::Again(production));
                    work.push(Walk::Seq(definition));
                }
                Production::RepetitionMandatory { ref definition, .. }
                | Production::RepetitionMandatoryWithSeparator { ref definition, .. } => {
                    work.push(Walk::Again(production));
                    work.push(Walk::Seq(definition));
                }
                Production::Alternation { ref definition, .. } => {
                    for alternative in definition {
                        let mut branch = work.clone();
                        branch.push(Walk::Prod(alternative));
                        collect(rules, k, branch, prefix, guards.clone(), out);
                    }
                    break;
                }
            },
            Walk::Again(production) => {
                collect(rules, k, work.clone(), prefix, guards.clone(), out);
                // Re-enter only if the previous iteration consumed a token,
                // otherwise the enumeration would never terminate.
                let guard = (production as *const Production as usize, prefix.len());
                if !guards.contains(&guard) {
                    guards.push(guard);
                    work.push(Walk::Again(production));
                    work.push(Walk::Seq(production.definition()));
                    match *production {
                        Production::RepetitionWithSeparator { separator, .. }
                        | Production::RepetitionMandatoryWithSeparator { separator, .. } => {
                            work.push(Walk::Tok(separator))
                        }
                        _ => {}
                    }
                } else {
                    break;
                }
            }
        }
    }
    prefix.truncate(entry_len);
}

/// Check whether a production sequence can match without consuming a token.
pub(crate) fn is_epsilon_derivable(
    definition: &[Production],
    rules: &[Rule],
    visiting: &mut Vec<RuleId>,
) -> bool {
    definition
        .iter()
        .all(|production| production_epsilon(production, rules, visiting))
}

fn production_epsilon(
    production: &Production,
    rules: &[Rule],
    visiting: &mut Vec<RuleId>,
) -> bool {
    match *production {
        Production::Terminal { .. } => false,
        Production::NonTerminal { ref resolved, .. } => match *resolved {
            // A cycle without consuming a terminal is left recursion and
            // reported separately, so cut it off here.
            Some(id) if !visiting.contains(&id) => {
                visiting.push(id);
                let epsilon = is_epsilon_derivable(&rules[id.as_usize()].definition, rules, visiting);
                visiting.pop();
                epsilon
            }
            _ => false,
        },
        Production::Option { .. }
        | Production::Repetition { .. }
        | Production::RepetitionWithSeparator { .. } => true,
        Production::Flat { ref definition }
        | Production::RepetitionMandatory { ref definition, .. }
        | Production::RepetitionMandatoryWithSeparator { ref definition, .. } => {
            is_epsilon_derivable(definition, rules, visiting)
        }
        Production::Alternation { ref definition, .. } => definition
            .iter()
            .any(|alternative| production_epsilon(alternative, rules, visiting)),
    }
}

/// The set of lookahead paths that may begin a construct.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathSet {
    paths: Vec<TokenPath>,
}

impl PathSet {
    pub(crate) fn new(paths: Vec<TokenPath>) -> PathSet {
        PathSet { paths: paths }
    }

    /// Check whether the lookahead window matches one of the paths.
    ///
    /// `la(n)` must yield the type of the n-th upcoming token, 1-based. A
    /// path shorter than the window matches on its full length.
    pub(crate) fn matches<F: Fn(usize) -> TokenType>(&self, la: F) -> bool {
        self.paths.iter().any(|path| {
            path.iter()
                .enumerate()
                .all(|(index, &token_type)| la(index + 1) == token_type)
        })
    }
}

/// A precomputed lookahead decision.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Decision {
    /// Whether the next tokens can begin the construct interior.
    Single(PathSet),
    /// The per-alternative path sets of an `or`, in declaration order.
    Alternation(Vec<PathSet>),
}

impl Decision {
    pub(crate) fn as_single(&self) -> &PathSet {
        match *self {
            Decision::Single(ref paths) => paths,
            Decision::Alternation(..) => panic!("alternation decision used as single"),
        }
    }

    pub(crate) fn as_alternation(&self) -> &[PathSet] {
        match *self {
            Decision::Alternation(ref alternatives) => alternatives,
            Decision::Single(..) => panic!("single decision used as alternation"),
        }
    }
}

/// The identity of a decision: rule, production kind, occurrence index.
pub(crate) type DecisionKey = (RuleId, DslKind, usize);

/// Build the decision functions for every keyed construct of every rule.
pub(crate) fn build_decisions(rules: &[Rule], k: usize) -> HashMap<DecisionKey, Decision> {
    let mut decisions = HashMap::new();
    for (index, rule) in rules.iter().enumerate() {
        collect_decisions(
            &rule.definition,
            RuleId::from_usize(index),
            rules,
            k,
            &mut decisions,
        );
    }
    decisions
}

fn collect_decisions(
    definition: &[Production],
    rule: RuleId,
    rules: &[Rule],
    k: usize,
    out: &mut HashMap<DecisionKey, Decision>,
) {
    for production in definition {
        match *production {
            Production::Alternation {
                ref definition,
                occurrence,
            } => {
                let alternatives = definition
                    .iter()
                    .map(|alternative| {
                        PathSet::new(possible_prefix_paths(alternative.definition(), rules, k))
                    })
                    .collect();
                out.insert(
                    (rule, DslKind::Or, occurrence),
                    Decision::Alternation(alternatives),
                );
            }
            Production::Option { occurrence, .. }
            | Production::Repetition { occurrence, .. }
            | Production::RepetitionMandatory { occurrence, .. }
            | Production::RepetitionWithSeparator { occurrence, .. }
            | Production::RepetitionMandatoryWithSeparator { occurrence, .. } => {
                let kind = production.dsl_kind().unwrap();
                let paths = possible_prefix_paths(production.definition(), rules, k);
                out.insert((rule, kind, occurrence), Decision::Single(PathSet::new(paths)));
            }
            Production::Flat { .. }
            | Production::Terminal { .. }
            | Production::NonTerminal { .. } => {}
        }
        collect_decisions(production.definition(), rule, rules, k, out);
    }
}
