// Copyright (c) 2018 Fabian Schuiki

//! Grammar validation.
//!
//! Runs after the resolver has bound all references and reports every
//! defect that would make the grammar unparseable or its analysis
//! meaningless: duplicate names and occurrence indices, bogus overrides,
//! left recursion, misplaced empty alternatives, and alternatives that
//! cannot be told apart within the lookahead bound.

use std::collections::{HashMap, HashSet};

use analysis::IgnoredIssues;
use errors::{DefinitionError, DefinitionErrorKind};
use gast::{walk_definition, DslKind, GastVisitor, Production, Rule, RuleId};
use lookahead::{is_epsilon_derivable, possible_prefix_paths};
use token::TokenRegistry;

/// Validate a grammar.
///
/// `declarations` is the raw declaration log in order, one `(name,
/// is_override)` entry per `rule`/`override_rule` call; `rules` is the
/// effective rule arena after overrides have been applied.
pub(crate) fn validate_grammar(
    declarations: &[(String, bool)],
    rules: &[Rule],
    registry: &TokenRegistry,
    ignored: &IgnoredIssues,
    max_lookahead: usize,
) -> Vec<DefinitionError> {
    let mut errors = Vec::new();
    check_declarations(declarations, &mut errors);
    for (index, rule) in rules.iter().enumerate() {
        check_duplicate_productions(rule, ignored, &mut errors);
        check_empty_alternatives(rule, &mut errors);
        check_left_recursion(RuleId::from_usize(index), rules, &mut errors);
    }
    // Path enumeration only terminates on non-left-recursive grammars.
    if errors
        .iter()
        .all(|error| error.kind != DefinitionErrorKind::LeftRecursion)
    {
        for rule in rules {
            check_ambiguous_alternatives(rule, rules, registry, ignored, max_lookahead, &mut errors);
        }
    }
    errors
}

fn check_declarations(declarations: &[(String, bool)], errors: &mut Vec<DefinitionError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for &(ref name, is_override) in declarations {
        if !is_valid_rule_name(name) {
            errors.push(DefinitionError::new(
                DefinitionErrorKind::InvalidRuleName,
                name.as_str(),
                format!("`{}` is not a valid rule name", name),
            ));
        }
        if is_override {
            if !seen.contains(name.as_str()) {
                errors.push(DefinitionError::new(
                    DefinitionErrorKind::InvalidRuleOverride,
                    name.as_str(),
                    format!("override of rule `{}` which is not defined", name),
                ));
                seen.insert(name);
            }
        } else {
            if !seen.insert(name) {
                errors.push(DefinitionError::new(
                    DefinitionErrorKind::DuplicateRuleName,
                    name.as_str(),
                    format!("rule `{}` is defined more than once", name),
                ));
            }
        }
    }
}

fn is_valid_rule_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Collects the `(kind, occurrence)` pairs used within one rule.
struct OccurrenceCollector {
    counts: HashMap<(DslKind, usize), usize>,
}

impl OccurrenceCollector {
    fn count(&mut self, node: &Production) {
        let key = (node.dsl_kind().unwrap(), node.occurrence().unwrap());
        *self.counts.entry(key).or_insert(0) += 1;
    }
}

impl GastVisitor for OccurrenceCollector {
    fn visit_terminal(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_non_terminal(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_option(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_repetition(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_repetition_mandatory(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_repetition_with_separator(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_repetition_mandatory_with_separator(&mut self, node: &Production) {
        self.count(node);
    }
    fn visit_alternation(&mut self, node: &Production) {
        self.count(node);
    }
}

fn check_duplicate_productions(
    rule: &Rule,
    ignored: &IgnoredIssues,
    errors: &mut Vec<DefinitionError>,
) {
    let mut collector = OccurrenceCollector {
        counts: HashMap::new(),
    };
    walk_definition(&rule.definition, &mut collector);
    let mut duplicates: Vec<_> = collector
        .counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .collect();
    duplicates.sort();
    for ((kind, occurrence), _) in duplicates {
        if ignored.is_ignored(&rule.name, kind, occurrence) {
            continue;
        }
        errors.push(
            DefinitionError::new(
                DefinitionErrorKind::DuplicateProductions,
                rule.name.as_str(),
                format!(
                    "rule `{}` uses {} with occurrence {} more than once",
                    rule.name, kind, occurrence
                ),
            ).at_production(kind, occurrence),
        );
    }
}

fn check_empty_alternatives(rule: &Rule, errors: &mut Vec<DefinitionError>) {
    fn walk(definition: &[Production], rule: &Rule, errors: &mut Vec<DefinitionError>) {
        for production in definition {
            if let Production::Alternation {
                definition: ref alternatives,
                occurrence,
            } = *production
            {
                for (index, alternative) in alternatives.iter().enumerate() {
                    if index + 1 < alternatives.len() && alternative.definition().is_empty() {
                        errors.push(
                            DefinitionError::new(
                                DefinitionErrorKind::NoneLastEmptyAlt,
                                rule.name.as_str(),
                                format!(
                                    "alternative {} of OR {} in rule `{}` is empty but not last",
                                    index + 1,
                                    occurrence,
                                    rule.name
                                ),
                            ).at_production(DslKind::Or, occurrence),
                        );
                    }
                }
            }
            walk(production.definition(), rule, errors);
        }
    }
    walk(&rule.definition, rule, errors);
}

/// Collect the rules reachable as the first terminal-preceding non-terminal
/// of a production sequence.
///
/// Returns `true` if the sequence is *tight*, that is, it always consumes a
/// terminal before anything past it can start.
fn collect_first_rules(definition: &[Production], rules: &[Rule], out: &mut Vec<RuleId>) -> bool {
    for production in definition {
        let tight = match *production {
            Production::Terminal { .. } => true,
            Production::NonTerminal { ref resolved, .. } => {
                let id = resolved.expect("unresolved reference during left recursion check");
                if !out.contains(&id) {
                    out.push(id);
                }
                !is_epsilon_derivable(&rules[id.as_usize()].definition, rules, &mut Vec::new())
            }
            Production::Flat {
                definition: ref inner,
            } => collect_first_rules(inner, rules, out),
            Production::Option {
                definition: ref inner,
                ..
            }
            | Production::Repetition {
                definition: ref inner,
                ..
            }
            | Production::RepetitionWithSeparator {
                definition: ref inner,
                ..
            } => {
                collect_first_rules(inner, rules, out);
                false
            }
            Production::RepetitionMandatory {
                definition: ref inner,
                ..
            }
            | Production::RepetitionMandatoryWithSeparator {
                definition: ref inner,
                ..
            } => collect_first_rules(inner, rules, out),
            Production::Alternation {
                definition: ref alternatives,
                ..
            } => {
                let mut all_tight = true;
                for alternative in alternatives {
                    all_tight &= collect_first_rules(alternative.definition(), rules, out);
                }
                all_tight
            }
        };
        if tight {
            return true;
        }
    }
    false
}

fn check_left_recursion(id: RuleId, rules: &[Rule], errors: &mut Vec<DefinitionError>) {
    let mut closure = Vec::new();
    let mut todo = Vec::new();
    collect_first_rules(&rules[id.as_usize()].definition, rules, &mut todo);
    while let Some(next) = todo.pop() {
        if closure.contains(&next) {
            continue;
        }
        closure.push(next);
        collect_first_rules(&rules[next.as_usize()].definition, rules, &mut todo);
    }
    if closure.contains(&id) {
        let rule = &rules[id.as_usize()];
        errors.push(DefinitionError::new(
            DefinitionErrorKind::LeftRecursion,
            rule.name.as_str(),
            format!("rule `{}` is left recursive", rule.name),
        ));
    }
}

fn check_ambiguous_alternatives(
    rule: &Rule,
    rules: &[Rule],
    registry: &TokenRegistry,
    ignored: &IgnoredIssues,
    max_lookahead: usize,
    errors: &mut Vec<DefinitionError>,
) {
    fn walk(
        definition: &[Production],
        rule: &Rule,
        rules: &[Rule],
        registry: &TokenRegistry,
        ignored: &IgnoredIssues,
        max_lookahead: usize,
        errors: &mut Vec<DefinitionError>,
    ) {
        for production in definition {
            if let Production::Alternation {
                definition: ref alternatives,
                occurrence,
            } = *production
            {
                if !ignored.is_ignored(&rule.name, DslKind::Or, occurrence) {
                    let paths: Vec<_> = alternatives
                        .iter()
                        .map(|alternative| {
                            possible_prefix_paths(alternative.definition(), rules, max_lookahead)
                        })
                        .collect();
                    for i in 0..paths.len() {
                        for j in i + 1..paths.len() {
                            let common = paths[i].iter().find(|path| paths[j].contains(path));
                            if let Some(common) = common {
                                let rendered: Vec<_> = common
                                    .iter()
                                    .map(|&t| format!("{}", t.pretty(registry)))
                                    .collect();
                                errors.push(
                                    DefinitionError::new(
                                        DefinitionErrorKind::AmbiguousAlts,
                                        rule.name.as_str(),
                                        format!(
                                            "alternatives {} and {} of OR {} in rule `{}` are \
                                             ambiguous: both may start with <{}>",
                                            i + 1,
                                            j + 1,
                                            occurrence,
                                            rule.name,
                                            rendered.join(" ")
                                        ),
                                    ).at_production(DslKind::Or, occurrence)
                                        .with_alternatives(vec![i + 1, j + 1]),
                                );
                            }
                        }
                    }
                }
            }
            walk(
                production.definition(),
                rule,
                rules,
                registry,
                ignored,
                max_lookahead,
                errors,
            );
        }
    }
    walk(
        &rule.definition,
        rule,
        rules,
        registry,
        ignored,
        max_lookahead,
        errors,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::IgnoredIssues;
    use builder::rule;
    use indexmap::IndexMap;
    use resolve::resolve_references;

    fn validate(
        mut rules: Vec<Rule>,
        registry: &TokenRegistry,
        ignored: &IgnoredIssues,
    ) -> Vec<DefinitionError> {
        let declarations: Vec<_> = rules.iter().map(|r| (r.name.clone(), false)).collect();
        let mut index = IndexMap::new();
        for (i, rule) in rules.iter().enumerate() {
            index.insert(rule.name.clone(), RuleId::from_usize(i));
        }
        assert!(resolve_references(&mut rules, &index).is_empty());
        validate_grammar(&declarations, &rules, registry, ignored, 5)
    }

    #[test]
    fn accepts_well_formed_grammars() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");
        let errors = validate(
            vec![
                rule("top", |s| s.subrule(1, "item").consume(1, b)),
                rule("item", |s| s.consume(1, a)),
            ],
            &registry,
            &IgnoredIssues::new(),
        );
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn rejects_invalid_rule_names() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![rule("3bad", |s| s.consume(1, a))],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::InvalidRuleName);
    }

    #[test]
    fn rejects_duplicate_rule_names() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let declarations = vec![("top".to_string(), false), ("top".to_string(), false)];
        let rules = vec![rule("top", |s| s.consume(1, a))];
        let registry = TokenRegistry::new();
        let errors = validate_grammar(
            &declarations,
            &rules,
            &registry,
            &IgnoredIssues::new(),
            5,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::DuplicateRuleName);
        assert_eq!(errors[0].rule_name, "top");
    }

    #[test]
    fn rejects_bogus_overrides() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let declarations = vec![("top".to_string(), false), ("other".to_string(), true)];
        let rules = vec![rule("top", |s| s.consume(1, a))];
        let registry = TokenRegistry::new();
        let errors = validate_grammar(
            &declarations,
            &rules,
            &registry,
            &IgnoredIssues::new(),
            5,
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::InvalidRuleOverride);
    }

    #[test]
    fn rejects_duplicate_occurrences() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");
        let errors = validate(
            vec![rule("top", |s| s.consume(1, a).consume(1, b))],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::DuplicateProductions);
        assert_eq!(errors[0].dsl_kind, Some(DslKind::Consume));
        assert_eq!(errors[0].occurrence, Some(1));
    }

    #[test]
    fn duplicate_occurrences_can_be_silenced() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");
        let mut ignored = IgnoredIssues::new();
        ignored.ignore("top", DslKind::Consume, 1);
        let errors = validate(
            vec![rule("top", |s| s.consume(1, a).consume(1, b))],
            &registry,
            &ignored,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_direct_left_recursion() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![rule("expr", |s| s.subrule(1, "expr").consume(1, a))],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::LeftRecursion);
        assert_eq!(errors[0].rule_name, "expr");
    }

    #[test]
    fn rejects_indirect_left_recursion() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![
                rule("expr", |s| s.subrule(1, "factor").consume(1, a)),
                rule("factor", |s| s.option(1, |s| s.subrule(1, "expr"))),
            ],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == DefinitionErrorKind::LeftRecursion));
    }

    #[test]
    fn rejects_misplaced_empty_alternatives() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![
                rule("top", |s| {
                    s.or(1, |alts| alts.alt(|s| s).alt(|s| s.consume(1, a)))
                }),
            ],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::NoneLastEmptyAlt);
    }

    #[test]
    fn trailing_empty_alternative_is_allowed() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![
                rule("top", |s| {
                    s.or(1, |alts| alts.alt(|s| s.consume(1, a)).alt(|s| s))
                }),
            ],
            &registry,
            &IgnoredIssues::new(),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn rejects_ambiguous_alternatives() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let errors = validate(
            vec![
                rule("top", |s| {
                    s.or(1, |alts| {
                        alts.alt(|s| s.consume(1, a)).alt(|s| s.consume(2, a))
                    })
                }),
            ],
            &registry,
            &IgnoredIssues::new(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DefinitionErrorKind::AmbiguousAlts);
        assert_eq!(errors[0].alternatives, vec![1, 2]);
    }

    #[test]
    fn ambiguity_can_be_silenced() {
        let mut registry = TokenRegistry::new();
        let a = registry.add("a");
        let mut ignored = IgnoredIssues::new();
        ignored.ignore("top", DslKind::Or, 1);
        let errors = validate(
            vec![
                rule("top", |s| {
                    s.or(1, |alts| {
                        alts.alt(|s| s.consume(1, a)).alt(|s| s.consume(2, a))
                    })
                }),
            ],
            &registry,
            &ignored,
        );
        assert!(errors.is_empty());
    }
}
