// Copyright (c) 2018 Fabian Schuiki

//! Re-sync FOLLOW set computation.
//!
//! For every subrule occurrence the engine needs to know which terminals may
//! immediately follow a successful match of that occurrence. Error recovery
//! flattens these sets along the rule stack to decide how far to skip. The
//! per-occurrence set is the single-token FIRST of the continuation after
//! the occurrence; where that continuation can match nothing, the calling
//! rule's own FOLLOW shines through, which makes this a fixpoint over all
//! call sites.

use std::collections::HashMap;

use bit_set::BitSet;

use gast::{Production, Rule, RuleId};
use lookahead::{collect_paths, Walk};
use token::EOF;

/// The key of a FOLLOW set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FollowKey {
    /// FOLLOW of `rule` invoked as subrule occurrence `occurrence` of `caller`.
    Rule {
        /// The invoked rule.
        rule: RuleId,
        /// The subrule occurrence index within the caller.
        occurrence: usize,
        /// The invoking rule.
        caller: RuleId,
    },
    /// FOLLOW of the parse entry point.
    Eof,
}

/// The FOLLOW sets of a grammar, keyed per subrule occurrence.
#[derive(Debug, Clone)]
pub(crate) struct FollowSets {
    sets: HashMap<FollowKey, BitSet>,
}

impl FollowSets {
    /// Create an empty table, for grammars that failed validation.
    pub(crate) fn empty() -> FollowSets {
        FollowSets {
            sets: HashMap::new(),
        }
    }

    /// Compute the FOLLOW sets of a grammar.
    ///
    /// All non-terminals in `rules` must be resolved.
    pub(crate) fn compute(rules: &[Rule]) -> FollowSets {
        let mut sites = Vec::new();
        for (index, rule) in rules.iter().enumerate() {
            let caller = RuleId::from_usize(index);
            walk_definition(&rule.definition, &Vec::new(), caller, rules, &mut sites);
        }

        // Every rule may serve as the parse entry point, so each rule level
        // FOLLOW is seeded with EOF.
        let mut rule_follow: Vec<BitSet> = rules
            .iter()
            .map(|_| {
                let mut set = BitSet::new();
                set.insert(EOF.as_usize());
                set
            })
            .collect();

        // Propagate caller FOLLOWs through epsilon-derivable continuations
        // until nothing changes anymore.
        let mut changed = true;
        while changed {
            changed = false;
            for site in &sites {
                let mut addition = site.first.clone();
                if site.epsilon {
                    addition.union_with(&rule_follow[site.caller.as_usize()]);
                }
                let target = &mut rule_follow[site.callee.as_usize()];
                if !target.is_superset(&addition) {
                    target.union_with(&addition);
                    changed = true;
                }
            }
        }

        let mut sets = HashMap::new();
        for site in sites {
            let mut set = site.first;
            if site.epsilon {
                set.union_with(&rule_follow[site.caller.as_usize()]);
            }
            sets.insert(
                FollowKey::Rule {
                    rule: site.callee,
                    occurrence: site.occurrence,
                    caller: site.caller,
                },
                set,
            );
        }
        let mut eof_set = BitSet::new();
        eof_set.insert(EOF.as_usize());
        sets.insert(FollowKey::Eof, eof_set);

        FollowSets { sets: sets }
    }

    /// Get the FOLLOW set stored under a key.
    pub(crate) fn get(&self, key: &FollowKey) -> Option<&BitSet> {
        self.sets.get(key)
    }
}

struct CallSite {
    callee: RuleId,
    occurrence: usize,
    caller: RuleId,
    first: BitSet,
    epsilon: bool,
}

/// Walk a rule's productions, recording a call site for every non-terminal.
///
/// `cont` is the walk continuation of the enclosing context, bottom to top;
/// descending into a construct pushes the remainder of the current sequence
/// (and for repetitions the re-entry step) onto it.
fn walk_definition<'a>(
    definition: &'a [Production],
    cont: &Vec<Walk<'a>>,
    caller: RuleId,
    rules: &'a [Rule],
    sites: &mut Vec<CallSite>,
) {
    for (index, production) in definition.iter().enumerate() {
        let rest = &definition[index + 1..];
        match *production {
            Production::NonTerminal {
                occurrence,
                ref resolved,
                ..
            } => {
                let callee = resolved.expect("unresolved reference during FOLLOW computation");
                let mut work = cont.clone();
                work.push(Walk::Seq(rest));
                let paths = collect_paths(rules, 1, work);
                let mut first = BitSet::new();
                let mut epsilon = false;
                for path in paths {
                    match path.first() {
                        Some(&token_type) => {
                            first.insert(token_type.as_usize());
                        }
                        None => epsilon = true,
                    }
                }
                sites.push(CallSite {
                    callee: callee,
                    occurrence: occurrence,
                    caller: caller,
                    first: first,
                    epsilon: epsilon,
                });
            }
            Production::Flat {
                definition: ref inner,
            }
            | Production::Option {
                definition: ref inner,
                ..
            } => {
                let mut child = cont.clone();
                child.push(Walk::Seq(rest));
                walk_definition(inner, &child, caller, rules, sites);
            }
            Production::Repetition {
                definition: ref inner,
                ..
            }
            | Production::RepetitionMandatory {
                definition: ref inner,
                ..
            }
            | Production::RepetitionWithSeparator {
                definition: ref inner,
                ..
            }
            | Production::RepetitionMandatoryWithSeparator {
                definition: ref inner,
                ..
            } => {
                let mut child = cont.clone();
                child.push(Walk::Seq(rest));
                child.push(Walk::Again(production));
                walk_definition(inner, &child, caller, rules, sites);
            }
            Production::Alternation {
                definition: ref alternatives,
                ..
            } => {
                let mut child = cont.clone();
                child.push(Walk::Seq(rest));
                for alternative in alternatives {
                    walk_definition(alternative.definition(), &child, caller, rules, sites);
                }
            }
            Production::Terminal { .. } => {}
        }
    }
}
