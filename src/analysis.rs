// Copyright (c) 2018 Fabian Schuiki

//! Grammar self-analysis and the per-grammar analysis cache.
//!
//! Analysis runs once per grammar, on construction of the first parser for
//! it: the declared rules are cloned into an arena, references are resolved,
//! the grammar is validated, and FOLLOW sets and lookahead decisions are
//! precomputed. The results are memoized process-wide under the grammar's
//! stable name, so every later parser construction is a cache lookup. A
//! grammar that analyzed with errors stays in the cache with its errors and
//! re-surfaces them on every construction.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use errors::DefinitionError;
use follow::FollowSets;
use gast::{DslKind, Rule, RuleId};
use lookahead::{build_decisions, Decision, DecisionKey};
use resolve::resolve_references;
use token::TokenRegistry;
use validate::validate_grammar;

/// Per-rule silencing of validation issues.
///
/// Only the duplicate-production and ambiguous-alternatives checks can be
/// silenced; every other validation reports unconditionally.
#[derive(Debug, Clone, Default)]
pub struct IgnoredIssues {
    ignored: HashMap<String, HashSet<(DslKind, usize)>>,
}

impl IgnoredIssues {
    /// Create an empty table.
    pub fn new() -> IgnoredIssues {
        IgnoredIssues {
            ignored: HashMap::new(),
        }
    }

    /// Silence issues for one production of one rule.
    pub fn ignore<S: Into<String>>(&mut self, rule: S, kind: DslKind, occurrence: usize) {
        self.ignored
            .entry(rule.into())
            .or_insert_with(HashSet::new)
            .insert((kind, occurrence));
    }

    pub(crate) fn is_ignored(&self, rule: &str, kind: DslKind, occurrence: usize) -> bool {
        self.ignored
            .get(rule)
            .map(|productions| productions.contains(&(kind, occurrence)))
            .unwrap_or(false)
    }
}

/// The analyzed, immutable form of a grammar.
///
/// Owned by the process-wide cache and shared by all parser instances of
/// the grammar.
pub struct ClassAnalysis {
    pub(crate) name: String,
    pub(crate) registry: TokenRegistry,
    pub(crate) rules: Vec<Rule>,
    pub(crate) index: IndexMap<String, RuleId>,
    pub(crate) follows: FollowSets,
    pub(crate) decisions: HashMap<DecisionKey, Decision>,
    pub(crate) errors: Vec<DefinitionError>,
    pub(crate) max_lookahead: usize,
}

impl ClassAnalysis {
    /// The stable name of the analyzed grammar.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definition errors detected during analysis.
    pub fn definition_errors(&self) -> &[DefinitionError] {
        &self.errors
    }

    /// The lookahead bound the analysis ran with.
    pub fn max_lookahead(&self) -> usize {
        self.max_lookahead
    }
}

static CACHE: Lazy<Mutex<HashMap<String, Arc<ClassAnalysis>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Fetch the cached analysis for a grammar, running `build` if missing.
///
/// The registry lock serializes concurrent first constructions, so analysis
/// runs exactly once per grammar name for the process lifetime.
pub(crate) fn analysis_for<F>(name: &str, build: F) -> Arc<ClassAnalysis>
where
    F: FnOnce() -> ClassAnalysis,
{
    let mut cache = CACHE.lock().unwrap();
    if let Some(existing) = cache.get(name) {
        return existing.clone();
    }
    let analysis = Arc::new(build());
    cache.insert(name.to_string(), analysis.clone());
    analysis
}

/// Run the self-analysis pipeline over a grammar's declared rules.
///
/// `declarations` is the raw declaration log; `effective` the rules after
/// override application, cloned for analysis and in first-declaration
/// order.
pub(crate) fn run_self_analysis(
    name: &str,
    declarations: &[(String, bool)],
    effective: Vec<Rule>,
    registry: TokenRegistry,
    max_lookahead: usize,
    ignored: &IgnoredIssues,
) -> ClassAnalysis {
    let mut rules = effective;
    let mut index = IndexMap::new();
    for (position, rule) in rules.iter().enumerate() {
        index.insert(rule.name.clone(), RuleId::from_usize(position));
    }

    let mut errors = resolve_references(&mut rules, &index);
    if errors.is_empty() {
        errors = validate_grammar(declarations, &rules, &registry, ignored, max_lookahead);
    }

    let (follows, decisions) = if errors.is_empty() {
        (
            FollowSets::compute(&rules),
            build_decisions(&rules, max_lookahead),
        )
    } else {
        (FollowSets::empty(), HashMap::new())
    };

    debug!(
        "analyzed grammar `{}`: {} rules, {} decisions, {} errors",
        name,
        rules.len(),
        decisions.len(),
        errors.len()
    );

    ClassAnalysis {
        name: name.to_string(),
        registry: registry,
        rules: rules,
        index: index,
        follows: follows,
        decisions: decisions,
        errors: errors,
        max_lookahead: max_lookahead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder::rule;

    fn registry_with(names: &[&str]) -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        for name in names {
            registry.add(*name);
        }
        registry
    }

    #[test]
    fn analysis_is_cached_per_name() {
        let registry = registry_with(&["a"]);
        let a = registry.get("a").unwrap();
        let build = || {
            let rules = vec![rule("top", |s| s.consume(1, a))];
            let declarations = vec![("top".to_string(), false)];
            run_self_analysis(
                "analysis_cache_test",
                &declarations,
                rules,
                registry.clone(),
                5,
                &IgnoredIssues::new(),
            )
        };
        let first = analysis_for("analysis_cache_test", &build);
        let second = analysis_for("analysis_cache_test", || {
            panic!("analysis must not run twice for one grammar")
        });
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.definition_errors().is_empty());
    }

    #[test]
    fn errors_stay_cached() {
        let registry = registry_with(&["a"]);
        let rules = vec![rule("top", |s| s.subrule(1, "missing"))];
        let declarations = vec![("top".to_string(), false)];
        let analysis = run_self_analysis(
            "analysis_error_test",
            &declarations,
            rules,
            registry,
            5,
            &IgnoredIssues::new(),
        );
        assert_eq!(analysis.definition_errors().len(), 1);
        assert_eq!(
            analysis.definition_errors()[0].kind,
            ::errors::DefinitionErrorKind::UnresolvedSubruleRef
        );
    }
}
