// Copyright (c) 2018 Fabian Schuiki

//! The parser runtime.
//!
//! A [`Grammar`](struct.Grammar.html) pairs every rule's grammar AST with a
//! semantic action; a [`Parser`](struct.Parser.html) is a single-use
//! recognizer over one token sequence. Rule actions are ordinary closures
//! that call the parser's primitives and propagate recognition errors with
//! `?`; the primitives consult the decision functions precomputed during
//! self-analysis, and with recovery enabled they repair single-token
//! mismatches in place and re-synchronize whole rules on anything worse.

use std::rc::Rc;
use std::sync::Arc;

use bit_set::BitSet;

use analysis::{analysis_for, run_self_analysis, ClassAnalysis, IgnoredIssues};
use errors::{DefinitionError, DefinitionErrors, RecognitionError, RecognitionErrorKind};
use follow::FollowKey;
use gast::{DslKind, Rule, RuleId};
use token::{Token, TokenRegistry, TokenType};
use walker;

/// Static configuration of a parser instance.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Whether error recovery is attempted. Defaults to `false`.
    pub recovery_enabled: bool,
    /// The lookahead bound k. Defaults to 5.
    pub max_lookahead: usize,
    /// Validation issues to silence.
    pub ignored_issues: IgnoredIssues,
    /// Keep definition errors readable through `definition_errors` instead
    /// of failing construction. Defaults to `false`.
    pub defer_definition_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> ParserConfig {
        ParserConfig {
            recovery_enabled: false,
            max_lookahead: 5,
            ignored_issues: IgnoredIssues::new(),
            defer_definition_errors: false,
        }
    }
}

/// Per-rule configuration.
pub struct RuleConfig<V> {
    /// Produces the value a failed rule yields after re-synchronization.
    /// Defaults to `V::default()`.
    pub recovery_value: Option<Rc<dyn Fn() -> V>>,
    /// Whether recognition errors re-synchronize at this rule. Defaults to
    /// `true`.
    pub resync_enabled: bool,
}

impl<V> Default for RuleConfig<V> {
    fn default() -> RuleConfig<V> {
        RuleConfig {
            recovery_value: None,
            resync_enabled: true,
        }
    }
}

/// The semantic action of a rule.
pub type RuleBody<V> = Rc<dyn Fn(&mut Parser<V>) -> Result<V, RecognitionError>>;

struct Declaration<V> {
    gast: Rule,
    body: RuleBody<V>,
    recovery_value: Rc<dyn Fn() -> V>,
    resync_enabled: bool,
    is_override: bool,
}

impl<V> Clone for Declaration<V> {
    fn clone(&self) -> Declaration<V> {
        Declaration {
            gast: self.gast.clone(),
            body: self.body.clone(),
            recovery_value: self.recovery_value.clone(),
            resync_enabled: self.resync_enabled,
            is_override: self.is_override,
        }
    }
}

/// A grammar declaration: named rules paired with semantic actions.
///
/// The name identifies the grammar in the process-wide analysis cache and
/// must be stable and unique per distinct grammar.
pub struct Grammar<V> {
    name: String,
    registry: TokenRegistry,
    declarations: Vec<Declaration<V>>,
}

impl<V> Grammar<V> {
    /// Create a new empty grammar.
    ///
    /// Panics when `name` is empty; anonymous grammars cannot be keyed in
    /// the analysis cache.
    pub fn new<S: Into<String>>(name: S, registry: TokenRegistry) -> Grammar<V> {
        let name = name.into();
        assert!(
            !name.is_empty(),
            "grammars must have a stable non-empty name"
        );
        Grammar {
            name: name,
            registry: registry,
            declarations: Vec::new(),
        }
    }

    /// Create a grammar that starts out with all of `base`'s rules.
    ///
    /// Combine with `override_rule` to shadow a subset of the inherited
    /// rules.
    pub fn extending<S: Into<String>>(name: S, base: &Grammar<V>) -> Grammar<V> {
        let mut grammar = Grammar::new(name, base.registry.clone());
        grammar.declarations = base.declarations.clone();
        grammar
    }

    /// The name of the grammar.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The token registry the grammar is written over.
    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// The effective declarations after overrides, in first-declaration
    /// order. Plain duplicates keep the first definition; overrides without
    /// a base are dropped. The validator reports both cases.
    fn effective(&self) -> Vec<&Declaration<V>> {
        let mut order: Vec<&Declaration<V>> = Vec::new();
        for declaration in &self.declarations {
            let existing = order
                .iter()
                .position(|d| d.gast.name == declaration.gast.name);
            match (existing, declaration.is_override) {
                (Some(position), true) => order[position] = declaration,
                (Some(_), false) => {}
                (None, true) => {}
                (None, false) => order.push(declaration),
            }
        }
        order
    }

    fn declaration_log(&self) -> Vec<(String, bool)> {
        self.declarations
            .iter()
            .map(|d| (d.gast.name.clone(), d.is_override))
            .collect()
    }
}

impl<V: Default + 'static> Grammar<V> {
    /// Declare a rule.
    pub fn rule<F>(&mut self, gast: Rule, body: F)
    where
        F: Fn(&mut Parser<V>) -> Result<V, RecognitionError> + 'static,
    {
        self.rule_with_config(gast, RuleConfig::default(), body);
    }

    /// Declare a rule with explicit per-rule configuration.
    pub fn rule_with_config<F>(&mut self, gast: Rule, config: RuleConfig<V>, body: F)
    where
        F: Fn(&mut Parser<V>) -> Result<V, RecognitionError> + 'static,
    {
        self.declare(gast, config, body, false);
    }

    /// Replace a rule inherited from a base grammar.
    pub fn override_rule<F>(&mut self, gast: Rule, body: F)
    where
        F: Fn(&mut Parser<V>) -> Result<V, RecognitionError> + 'static,
    {
        self.declare(gast, RuleConfig::default(), body, true);
    }

    fn declare<F>(&mut self, gast: Rule, config: RuleConfig<V>, body: F, is_override: bool)
    where
        F: Fn(&mut Parser<V>) -> Result<V, RecognitionError> + 'static,
    {
        self.declarations.push(Declaration {
            gast: gast,
            body: Rc::new(body),
            recovery_value: config
                .recovery_value
                .unwrap_or_else(|| Rc::new(V::default)),
            resync_enabled: config.resync_enabled,
            is_override: is_override,
        });
    }
}

struct RuleImpl<V> {
    body: RuleBody<V>,
    recovery_value: Rc<dyn Fn() -> V>,
    resync_enabled: bool,
}

/// An alternative passed to the `or` primitive.
pub struct OrAlt<'a, V: 'a, R: 'a> {
    gate: Option<Box<dyn Fn(&Parser<V>) -> bool + 'a>>,
    body: Box<dyn FnMut(&mut Parser<V>) -> Result<R, RecognitionError> + 'a>,
}

impl<'a, V, R> OrAlt<'a, V, R> {
    /// An ungated alternative.
    pub fn alt<F>(body: F) -> OrAlt<'a, V, R>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError> + 'a,
    {
        OrAlt {
            gate: None,
            body: Box::new(body),
        }
    }

    /// An alternative guarded by a semantic gate.
    ///
    /// The alternative is chosen only when both its lookahead paths match
    /// and the gate holds.
    pub fn when<G, F>(gate: G, body: F) -> OrAlt<'a, V, R>
    where
        G: Fn(&Parser<V>) -> bool + 'a,
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError> + 'a,
    {
        OrAlt {
            gate: Some(Box::new(gate)),
            body: Box::new(body),
        }
    }
}

/// An LL(k) recursive descent parser over one token sequence.
///
/// Not safe for concurrent use; all primitives run to completion
/// synchronously.
pub struct Parser<V> {
    analysis: Arc<ClassAnalysis>,
    impls: Vec<RuleImpl<V>>,
    input: Vec<Token>,
    idx: usize,
    eof: Token,
    errors: Vec<RecognitionError>,
    rule_stack: Vec<RuleId>,
    occurrence_stack: Vec<usize>,
    backtracking: usize,
    recovery_enabled: bool,
}

impl<V> std::fmt::Debug for Parser<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("idx", &self.idx)
            .field("errors", &self.errors)
            .field("rule_stack", &self.rule_stack)
            .finish()
    }
}

impl<V> Parser<V> {
    /// Create a parser for a grammar over a token sequence.
    ///
    /// The first construction per grammar name runs self-analysis and caches
    /// the outcome; later constructions are cache lookups. Definition errors
    /// fail construction unless deferral is enabled in the configuration.
    pub fn new(
        grammar: &Grammar<V>,
        input: Vec<Token>,
        config: ParserConfig,
    ) -> Result<Parser<V>, DefinitionErrors> {
        assert!(config.max_lookahead >= 1, "max_lookahead must be at least 1");
        let analysis = analysis_for(&grammar.name, || {
            let effective: Vec<Rule> = grammar
                .effective()
                .iter()
                .map(|d| d.gast.clone_for_analysis())
                .collect();
            run_self_analysis(
                &grammar.name,
                &grammar.declaration_log(),
                effective,
                grammar.registry.clone(),
                config.max_lookahead,
                &config.ignored_issues,
            )
        });
        if !analysis.definition_errors().is_empty() && !config.defer_definition_errors {
            return Err(DefinitionErrors {
                errors: analysis.definition_errors().to_vec(),
            });
        }
        let effective = grammar.effective();
        let impls = analysis
            .rules
            .iter()
            .map(|rule| {
                let declaration = effective
                    .iter()
                    .find(|d| d.gast.name == rule.name)
                    .expect("grammar changed since its analysis was cached");
                RuleImpl {
                    body: declaration.body.clone(),
                    recovery_value: declaration.recovery_value.clone(),
                    resync_enabled: declaration.resync_enabled,
                }
            })
            .collect();
        Ok(Parser {
            analysis: analysis,
            impls: impls,
            input: input,
            idx: 0,
            eof: Token::eof(),
            errors: Vec::new(),
            rule_stack: Vec::new(),
            occurrence_stack: Vec::new(),
            backtracking: 0,
            recovery_enabled: config.recovery_enabled,
        })
    }

    /// Parse the input starting at the given rule.
    ///
    /// With recovery enabled the top invocation always re-synchronizes, so
    /// this returns the rule's value (possibly its recovery value) and all
    /// errors accumulate in `errors`. Without recovery the first recognition
    /// error is returned.
    pub fn parse(&mut self, rule: &str) -> Result<V, RecognitionError> {
        let id = self.rule_id(rule);
        self.invoke_rule(id, 0, true)
    }

    /// The recognition errors accumulated so far.
    pub fn errors(&self) -> &[RecognitionError] {
        &self.errors
    }

    /// The definition errors of the grammar, for deferred construction.
    pub fn definition_errors(&self) -> &[DefinitionError] {
        self.analysis.definition_errors()
    }

    /// Look at an upcoming token without consuming it. 1-based.
    ///
    /// Beyond the end of the input this yields the EOF sentinel.
    pub fn la(&self, n: usize) -> &Token {
        debug_assert!(n >= 1, "lookahead is 1-based");
        self.input.get(self.idx + n - 1).unwrap_or(&self.eof)
    }

    fn la_type(&self, n: usize) -> TokenType {
        self.la(n).token_type
    }

    fn rule_id(&self, rule: &str) -> RuleId {
        match self.analysis.index.get(rule) {
            Some(&id) => id,
            None => panic!(
                "unknown rule `{}` in grammar `{}`",
                rule,
                self.analysis.name()
            ),
        }
    }

    fn current_rule(&self) -> RuleId {
        *self.rule_stack
            .last()
            .expect("parser primitive used outside of a rule invocation")
    }

    fn rule_name(&self, id: RuleId) -> &str {
        &self.analysis.rules[id.as_usize()].name
    }

    fn token_label(&self, token: &Token) -> String {
        if token.image.is_empty() {
            self.analysis.registry.name(token.token_type).to_string()
        } else {
            token.image.clone()
        }
    }

    fn recognition_error<S: Into<String>>(
        &self,
        kind: RecognitionErrorKind,
        message: S,
        token: Token,
    ) -> RecognitionError {
        let mut error = RecognitionError::new(kind, message, token);
        error.rule_stack = self.rule_stack
            .iter()
            .map(|&id| self.rule_name(id).to_string())
            .collect();
        error.rule_occurrence_stack = self.occurrence_stack.clone();
        error
    }

    /// Consume the next token, which must be of the given type.
    ///
    /// With recovery enabled a mismatch is first repaired by single token
    /// insertion or deletion; failing that the error propagates so that a
    /// rule further up can re-synchronize.
    pub fn consume(
        &mut self,
        occurrence: usize,
        token_type: TokenType,
    ) -> Result<Token, RecognitionError> {
        debug_assert!(occurrence >= 1 && occurrence <= 5);
        if self.la_type(1) == token_type {
            let token = self.la(1).clone();
            self.idx += 1;
            return Ok(token);
        }
        let found = self.la(1).clone();
        let error = self.recognition_error(
            RecognitionErrorKind::MismatchedToken,
            format!(
                "expected `{}` but found `{}`",
                self.analysis.registry.name(token_type),
                self.token_label(&found)
            ),
            found,
        );
        if self.recovery_enabled && self.backtracking == 0 {
            // Single token insertion: legal when the current token may
            // follow the missing terminal at this position.
            if let Some(follow) = self.follow_after_consume(occurrence) {
                if follow.contains(self.la_type(1).as_usize()) {
                    let mut inserted = Token::new(token_type, "");
                    inserted.inserted_in_recovery = true;
                    trace!(
                        "recovered by inserting `{}`",
                        self.analysis.registry.name(token_type)
                    );
                    self.errors.push(error);
                    return Ok(inserted);
                }
            }
            // Single token deletion: the expected terminal is right behind
            // the offending token.
            if self.la_type(2) == token_type {
                let token = self.la(2).clone();
                trace!("recovered by deleting `{}`", self.token_label(self.la(1)));
                self.idx += 2;
                self.errors.push(error);
                return Ok(token);
            }
        }
        Err(error)
    }

    fn follow_after_consume(&self, occurrence: usize) -> Option<BitSet> {
        let rule = &self.analysis.rules[self.current_rule().as_usize()];
        let paths = match walker::follow_after(
            rule,
            &self.analysis.rules,
            DslKind::Consume,
            occurrence,
        ) {
            Some(paths) => paths,
            None => return None,
        };
        let mut set = BitSet::new();
        for path in paths {
            if let Some(&token_type) = path.first() {
                set.insert(token_type.as_usize());
            }
        }
        if set.is_empty() {
            None
        } else {
            Some(set)
        }
    }

    /// Invoke another rule.
    pub fn subrule(&mut self, occurrence: usize, rule: &str) -> Result<V, RecognitionError> {
        debug_assert!(occurrence >= 1 && occurrence <= 5);
        let id = self.rule_id(rule);
        self.invoke_rule(id, occurrence, false)
    }

    fn invoke_rule(
        &mut self,
        id: RuleId,
        occurrence: usize,
        top: bool,
    ) -> Result<V, RecognitionError> {
        self.rule_stack.push(id);
        self.occurrence_stack.push(occurrence);
        let body = self.impls[id.as_usize()].body.clone();
        let result = (*body)(self);
        let result = match result {
            Err(error) => {
                let resync = self.recovery_enabled && self.backtracking == 0
                    && (top || self.impls[id.as_usize()].resync_enabled);
                if resync {
                    let error = self.resync_to_follow(error);
                    trace!("re-synced rule `{}`", self.rule_name(id));
                    self.errors.push(error);
                    let recovery_value = self.impls[id.as_usize()].recovery_value.clone();
                    Ok((*recovery_value)())
                } else {
                    Err(error)
                }
            }
            ok => ok,
        };
        self.rule_stack.pop();
        self.occurrence_stack.pop();
        if top {
            if let Err(ref error) = result {
                self.errors.push(error.clone());
            }
            if result.is_ok() && !self.la(1).is_eof() {
                let token = self.la(1).clone();
                let error = self.recognition_error(
                    RecognitionErrorKind::NotAllInputParsed,
                    format!(
                        "expecting end of input but found `{}`",
                        self.token_label(&token)
                    ),
                    token,
                );
                self.errors.push(error);
            }
        }
        result
    }

    /// Union of the FOLLOW sets along the rule stack, bottom to top.
    fn resync_follow_union(&self) -> BitSet {
        let mut union = BitSet::new();
        for (depth, &rule) in self.rule_stack.iter().enumerate() {
            let key = if depth == 0 {
                FollowKey::Eof
            } else {
                FollowKey::Rule {
                    rule: rule,
                    occurrence: self.occurrence_stack[depth],
                    caller: self.rule_stack[depth - 1],
                }
            };
            if let Some(set) = self.analysis.follows.get(&key) {
                union.union_with(set);
            }
        }
        union
    }

    fn resync_to_follow(&mut self, mut error: RecognitionError) -> RecognitionError {
        let follow = self.resync_follow_union();
        let mut skipped = Vec::new();
        while !self.la(1).is_eof() && !follow.contains(self.la_type(1).as_usize()) {
            skipped.push(self.la(1).clone());
            self.idx += 1;
        }
        error.resynced_tokens = skipped;
        error
    }

    fn single_decision(&self, kind: DslKind, occurrence: usize) -> bool {
        let rule = self.current_rule();
        match self.analysis.decisions.get(&(rule, kind, occurrence)) {
            Some(decision) => decision.as_single().matches(|n| self.la_type(n)),
            None => panic!(
                "no lookahead decision for {} {} in rule `{}`; the rule body and its grammar AST disagree",
                kind,
                occurrence,
                self.rule_name(rule)
            ),
        }
    }

    /// Run `f` once if the lookahead says the optional construct is present.
    ///
    /// Returns `Some` with the action's value when it ran.
    pub fn option<R, F>(&mut self, occurrence: usize, f: F) -> Result<Option<R>, RecognitionError>
    where
        F: FnOnce(&mut Parser<V>) -> Result<R, RecognitionError>,
    {
        self.option_when(occurrence, |_| true, f)
    }

    /// Like `option`, additionally guarded by a semantic gate.
    pub fn option_when<R, F, G>(
        &mut self,
        occurrence: usize,
        gate: G,
        f: F,
    ) -> Result<Option<R>, RecognitionError>
    where
        F: FnOnce(&mut Parser<V>) -> Result<R, RecognitionError>,
        G: Fn(&Parser<V>) -> bool,
    {
        if self.single_decision(DslKind::Option, occurrence) && gate(self) {
            f(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Choose and run one of several alternatives.
    ///
    /// The first alternative whose lookahead paths match the upcoming tokens
    /// and whose gate holds is run. When none qualifies a `NoViableAlt`
    /// error is raised, with `err_msg` as its message if given.
    pub fn or<R>(
        &mut self,
        occurrence: usize,
        err_msg: Option<&str>,
        alternatives: &mut [OrAlt<V, R>],
    ) -> Result<R, RecognitionError> {
        let chosen = {
            let rule = self.current_rule();
            let decision = match self.analysis.decisions.get(&(rule, DslKind::Or, occurrence)) {
                Some(decision) => decision,
                None => panic!(
                    "no lookahead decision for OR {} in rule `{}`; the rule body and its grammar AST disagree",
                    occurrence,
                    self.rule_name(rule)
                ),
            };
            let path_sets = decision.as_alternation();
            assert_eq!(
                path_sets.len(),
                alternatives.len(),
                "OR {} in rule `{}` declares {} alternatives but was invoked with {}",
                occurrence,
                self.rule_name(rule),
                path_sets.len(),
                alternatives.len()
            );
            let mut chosen = None;
            for (index, path_set) in path_sets.iter().enumerate() {
                if path_set.matches(|n| self.la_type(n)) {
                    if let Some(ref gate) = alternatives[index].gate {
                        if !gate(self) {
                            continue;
                        }
                    }
                    chosen = Some(index);
                    break;
                }
            }
            chosen
        };
        match chosen {
            Some(index) => (alternatives[index].body)(self),
            None => {
                let token = self.la(1).clone();
                let message = match err_msg {
                    Some(message) => message.to_string(),
                    None => format!(
                        "expecting one of the alternatives of OR {} in rule `{}` but found `{}`",
                        occurrence,
                        self.rule_name(self.current_rule()),
                        self.token_label(&token)
                    ),
                };
                Err(self.recognition_error(RecognitionErrorKind::NoViableAlt, message, token))
            }
        }
    }

    /// Run `f` as long as the lookahead says another iteration follows.
    ///
    /// Returns the number of iterations run.
    pub fn many<R, F>(&mut self, occurrence: usize, f: F) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
    {
        self.many_when(occurrence, |_| true, f)
    }

    /// Like `many`, additionally guarded by a semantic gate.
    pub fn many_when<R, F, G>(
        &mut self,
        occurrence: usize,
        gate: G,
        mut f: F,
    ) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
        G: Fn(&Parser<V>) -> bool,
    {
        let mut count = 0;
        loop {
            while self.single_decision(DslKind::Many, occurrence) && gate(self) {
                f(self)?;
                count += 1;
            }
            if !self.try_repetition_recovery(DslKind::Many, occurrence, None, count > 0) {
                return Ok(count);
            }
        }
    }

    /// Run `f` zero or more times, iterations separated by a terminal.
    ///
    /// Returns the number of iterations run.
    pub fn many_sep<R, F>(
        &mut self,
        occurrence: usize,
        separator: TokenType,
        mut f: F,
    ) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
    {
        let mut count = 0;
        loop {
            if count == 0 && self.single_decision(DslKind::ManySep, occurrence) {
                f(self)?;
                count += 1;
            }
            while count > 0 && self.la_type(1) == separator {
                self.idx += 1;
                f(self)?;
                count += 1;
            }
            if !self.try_repetition_recovery(
                DslKind::ManySep,
                occurrence,
                Some(separator),
                count > 0,
            ) {
                return Ok(count);
            }
        }
    }

    /// Like `many` but raises `EarlyExit` when zero iterations ran.
    pub fn at_least_one<R, F>(
        &mut self,
        occurrence: usize,
        err_msg: Option<&str>,
        f: F,
    ) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
    {
        self.at_least_one_when(occurrence, |_| true, err_msg, f)
    }

    /// Like `at_least_one`, additionally guarded by a semantic gate.
    pub fn at_least_one_when<R, F, G>(
        &mut self,
        occurrence: usize,
        gate: G,
        err_msg: Option<&str>,
        mut f: F,
    ) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
        G: Fn(&Parser<V>) -> bool,
    {
        let mut count = 0;
        loop {
            while self.single_decision(DslKind::AtLeastOne, occurrence) && gate(self) {
                f(self)?;
                count += 1;
            }
            if !self.try_repetition_recovery(DslKind::AtLeastOne, occurrence, None, count > 0) {
                break;
            }
        }
        if count == 0 {
            let token = self.la(1).clone();
            let message = match err_msg {
                Some(message) => message.to_string(),
                None => format!(
                    "expecting at least one iteration of AT_LEAST_ONE {} in rule `{}`",
                    occurrence,
                    self.rule_name(self.current_rule())
                ),
            };
            return Err(self.recognition_error(RecognitionErrorKind::EarlyExit, message, token));
        }
        Ok(count)
    }

    /// Like `many_sep` but raises `EarlyExit` when zero iterations ran.
    pub fn at_least_one_sep<R, F>(
        &mut self,
        occurrence: usize,
        separator: TokenType,
        err_msg: Option<&str>,
        mut f: F,
    ) -> Result<usize, RecognitionError>
    where
        F: FnMut(&mut Parser<V>) -> Result<R, RecognitionError>,
    {
        let mut count = 0;
        loop {
            if count == 0 && self.single_decision(DslKind::AtLeastOneSep, occurrence) {
                f(self)?;
                count += 1;
            }
            while count > 0 && self.la_type(1) == separator {
                self.idx += 1;
                f(self)?;
                count += 1;
            }
            if !self.try_repetition_recovery(
                DslKind::AtLeastOneSep,
                occurrence,
                Some(separator),
                count > 0,
            ) {
                break;
            }
        }
        if count == 0 {
            let token = self.la(1).clone();
            let message = match err_msg {
                Some(message) => message.to_string(),
                None => format!(
                    "expecting at least one iteration of AT_LEAST_ONE_SEP {} in rule `{}`",
                    occurrence,
                    self.rule_name(self.current_rule())
                ),
            };
            return Err(self.recognition_error(RecognitionErrorKind::EarlyExit, message, token));
        }
        Ok(count)
    }

    /// Re-synchronize after a repetition exits in front of unexpected input.
    ///
    /// Skips tokens until either the terminal expected after the repetition
    /// is reached (record the error, exit the repetition), the repetition's
    /// own lookahead fires again (record the error, iterate once more), or a
    /// token of the current FOLLOW or EOF is reached (restore and give up).
    /// Returns whether the caller should re-enter its iteration loop.
    fn try_repetition_recovery(
        &mut self,
        kind: DslKind,
        occurrence: usize,
        separator: Option<TokenType>,
        started: bool,
    ) -> bool {
        if !self.recovery_enabled || self.backtracking > 0 {
            return false;
        }
        let rule = self.current_rule();
        let expected = walker::next_terminal_after(
            &self.analysis.rules[rule.as_usize()],
            &self.analysis.rules,
            kind,
            occurrence,
        );
        let expected = match expected {
            Some(expected) => expected,
            None => return false,
        };
        if self.la_type(1) == expected {
            return false;
        }
        let follow = self.resync_follow_union();
        if follow.contains(self.la_type(1).as_usize()) {
            return false;
        }
        let saved_idx = self.idx;
        let offending = self.la(1).clone();
        let mut skipped = Vec::new();
        loop {
            if self.la(1).is_eof() {
                self.idx = saved_idx;
                return false;
            }
            if self.la_type(1) == expected {
                let mut error = self.recognition_error(
                    RecognitionErrorKind::MismatchedToken,
                    format!(
                        "expected `{}` but found `{}`",
                        self.analysis.registry.name(expected),
                        self.token_label(&offending)
                    ),
                    offending,
                );
                error.resynced_tokens = skipped;
                trace!(
                    "repetition recovery skipped to `{}`",
                    self.analysis.registry.name(expected)
                );
                self.errors.push(error);
                return false;
            }
            let reenter = match separator {
                Some(separator) if started => self.la_type(1) == separator,
                _ => self.single_decision(kind, occurrence),
            };
            if reenter {
                let mut error = self.recognition_error(
                    RecognitionErrorKind::MismatchedToken,
                    format!(
                        "expected `{}` but found `{}`",
                        self.analysis.registry.name(expected),
                        self.token_label(&offending)
                    ),
                    offending,
                );
                error.resynced_tokens = skipped;
                trace!("repetition recovery re-entered the repetition");
                self.errors.push(error);
                return true;
            }
            if follow.contains(self.la_type(1).as_usize()) {
                self.idx = saved_idx;
                return false;
            }
            skipped.push(self.la(1).clone());
            self.idx += 1;
        }
    }

    /// Speculatively run `f`, always restoring the parser state.
    ///
    /// Returns whether `f` succeeded and its value passed `is_valid`. All
    /// recovery is disabled while the speculation runs.
    pub fn backtrack<R, F, G>(&mut self, f: F, is_valid: G) -> bool
    where
        F: FnOnce(&mut Parser<V>) -> Result<R, RecognitionError>,
        G: FnOnce(&R) -> bool,
    {
        let saved_idx = self.idx;
        let saved_errors = self.errors.len();
        let saved_rules = self.rule_stack.len();
        let saved_occurrences = self.occurrence_stack.len();
        self.backtracking += 1;
        let result = f(self);
        self.backtracking -= 1;
        self.idx = saved_idx;
        self.errors.truncate(saved_errors);
        self.rule_stack.truncate(saved_rules);
        self.occurrence_stack.truncate(saved_occurrences);
        match result {
            Ok(ref value) => is_valid(value),
            Err(_) => false,
        }
    }
}
