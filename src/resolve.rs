// Copyright (c) 2018 Fabian Schuiki

//! Binding of subrule references to rule definitions.

use indexmap::IndexMap;

use errors::{DefinitionError, DefinitionErrorKind};
use gast::{DslKind, Production, Rule, RuleId};

/// Bind every non-terminal in the rule arena to its target rule.
///
/// References to names absent from the index are left unbound and reported
/// as `UNRESOLVED_SUBRULE_REF` errors.
pub(crate) fn resolve_references(
    rules: &mut [Rule],
    index: &IndexMap<String, RuleId>,
) -> Vec<DefinitionError> {
    let mut errors = Vec::new();
    for rule in rules.iter_mut() {
        let rule_name = rule.name.clone();
        for production in &mut rule.definition {
            resolve_production(production, index, &rule_name, &mut errors);
        }
    }
    errors
}

fn resolve_production(
    production: &mut Production,
    index: &IndexMap<String, RuleId>,
    rule_name: &str,
    errors: &mut Vec<DefinitionError>,
) {
    match *production {
        Production::NonTerminal {
            ref name,
            occurrence,
            ref mut resolved,
        } => match index.get(name) {
            Some(&id) => *resolved = Some(id),
            None => errors.push(
                DefinitionError::new(
                    DefinitionErrorKind::UnresolvedSubruleRef,
                    rule_name,
                    format!(
                        "rule `{}` references undefined rule `{}`",
                        rule_name, name
                    ),
                ).at_production(DslKind::Subrule, occurrence),
            ),
        },
        Production::Terminal { .. } => {}
        Production::Flat { ref mut definition }
        | Production::Option {
            ref mut definition, ..
        }
        | Production::Repetition {
            ref mut definition, ..
        }
        | Production::RepetitionMandatory {
            ref mut definition, ..
        }
        | Production::RepetitionWithSeparator {
            ref mut definition, ..
        }
        | Production::RepetitionMandatoryWithSeparator {
            ref mut definition, ..
        }
        | Production::Alternation {
            ref mut definition, ..
        } => {
            for production in definition {
                resolve_production(production, index, rule_name, errors);
            }
        }
    }
}
