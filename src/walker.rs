// Copyright (c) 2018 Fabian Schuiki

//! Grammar walker for the terminal expected after a production.
//!
//! In-repetition recovery needs to know which terminal the parser should be
//! looking at once a repetition has exhausted its iterations. This walker
//! locates the repetition inside its rule and reduces the single-token
//! lookahead of its continuation to that terminal.

use gast::{DslKind, Production, Rule};
use lookahead::{collect_paths, TokenPath, Walk};
use token::TokenType;

/// The single-token paths that may follow a production within its rule.
///
/// Locates the production with the given kind and occurrence inside `rule`
/// and enumerates the one-token lookahead of its continuation, staying
/// within the rule. Returns `None` when the production cannot be found.
pub(crate) fn follow_after(
    rule: &Rule,
    rules: &[Rule],
    kind: DslKind,
    occurrence: usize,
) -> Option<Vec<TokenPath>> {
    find(&rule.definition, &Vec::new(), kind, occurrence).map(|work| collect_paths(rules, 1, work))
}

/// Find the terminal expected right after a repetition exits.
///
/// Returns `None` when the production cannot be found, when nothing definite
/// follows it, or when more than one terminal could follow; recovery only
/// re-synchronizes against an unambiguous expectation.
pub(crate) fn next_terminal_after(
    rule: &Rule,
    rules: &[Rule],
    kind: DslKind,
    occurrence: usize,
) -> Option<TokenType> {
    let paths = match follow_after(rule, rules, kind, occurrence) {
        Some(paths) => paths,
        None => return None,
    };
    let mut first = None;
    for path in paths {
        match (path.first(), first) {
            (None, _) => {}
            (Some(&token_type), None) => first = Some(token_type),
            (Some(&token_type), Some(seen)) if token_type == seen => {}
            (Some(_), Some(_)) => return None,
        }
    }
    first
}

fn find<'a>(
    definition: &'a [Production],
    cont: &Vec<Walk<'a>>,
    kind: DslKind,
    occurrence: usize,
) -> Option<Vec<Walk<'a>>> {
    for (index, production) in definition.iter().enumerate() {
        let rest = &definition[index + 1..];
        if production.dsl_kind() == Some(kind) && production.occurrence() == Some(occurrence) {
            let mut work = cont.clone();
            work.push(Walk::Seq(rest));
            return Some(work);
        }
        match *production {
            Production::Flat {
                definition: ref inner,
            }
            | Production::Option {
                definition: ref inner,
                ..
            } => {
                let mut child = cont.clone();
                child.push(Walk::Seq(rest));
                if let Some(work) = find(inner, &child, kind, occurrence) {
                    return Some(work);
                }
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
                if let Some(work) = find(inner, &child, kind, occurrence) {
                    return Some(work);
                }
            }
            Production::Alternation {
                definition: ref alternatives,
                ..
            } => {
                let mut child = cont.clone();
                child.push(Walk::Seq(rest));
                for alternative in alternatives {
                    if let Some(work) = find(alternative.definition(), &child, kind, occurrence) {
                        return Some(work);
                    }
                }
            }
            Production::Terminal { .. } | Production::NonTerminal { .. } => {}
        }
    }
    None
}
