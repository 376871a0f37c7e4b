// Copyright (c) 2018 Fabian Schuiki

//! End-to-end tests over a JSON-like grammar.

extern crate muntjac;

use muntjac::builder::rule;
use muntjac::errors::{DefinitionErrorKind, RecognitionErrorKind};
use muntjac::gast::DslKind;
use muntjac::parser::{Grammar, OrAlt, Parser, ParserConfig};
use muntjac::token::{Token, TokenRegistry};

#[derive(Debug, Clone, PartialEq)]
enum Json {
    Invalid,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Json>),
    Object(Vec<(String, Json)>),
}

impl Default for Json {
    fn default() -> Json {
        Json::Invalid
    }
}

fn json_registry() -> TokenRegistry {
    let mut registry = TokenRegistry::new();
    for name in &[
        "LCurly", "RCurly", "LSquare", "RSquare", "Comma", "Colon", "StringLit", "NumberLit",
        "True", "False", "Null",
    ] {
        registry.add(*name);
    }
    registry
}

/// A hand-rolled lexer for the JSON-like test inputs.
fn lex(registry: &TokenRegistry, input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    let mut emit = |name: &str, image: String, pos: usize| {
        let mut token = Token::new(registry.get(name).unwrap(), image);
        token.start_offset = Some(pos);
        tokens.push(token);
    };
    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '{' => {
                emit("LCurly", "{".into(), pos);
                chars.next();
            }
            '}' => {
                emit("RCurly", "}".into(), pos);
                chars.next();
            }
            '[' => {
                emit("LSquare", "[".into(), pos);
                chars.next();
            }
            ']' => {
                emit("RSquare", "]".into(), pos);
                chars.next();
            }
            ',' => {
                emit("Comma", ",".into(), pos);
                chars.next();
            }
            ':' => {
                emit("Colon", ":".into(), pos);
                chars.next();
            }
            '"' => {
                chars.next();
                let mut image = String::from("\"");
                while let Some((_, c)) = chars.next() {
                    image.push(c);
                    if c == '"' {
                        break;
                    }
                }
                emit("StringLit", image, pos);
            }
            c if c.is_ascii_digit() => {
                let mut image = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_digit() && c != '.' {
                        break;
                    }
                    image.push(c);
                    chars.next();
                }
                emit("NumberLit", image, pos);
            }
            c if c.is_ascii_alphabetic() => {
                let mut image = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    image.push(c);
                    chars.next();
                }
                let name = match image.as_str() {
                    "true" => "True",
                    "false" => "False",
                    "null" => "Null",
                    other => panic!("unexpected word `{}`", other),
                };
                emit(name, image, pos);
            }
            c => panic!("unexpected character `{}`", c),
        }
    }
    tokens
}

fn unquote(image: &str) -> String {
    image.trim_matches('"').to_string()
}

fn json_grammar(name: &str, registry: &TokenRegistry) -> Grammar<Json> {
    let l_curly = registry.get("LCurly").unwrap();
    let r_curly = registry.get("RCurly").unwrap();
    let l_square = registry.get("LSquare").unwrap();
    let r_square = registry.get("RSquare").unwrap();
    let comma = registry.get("Comma").unwrap();
    let colon = registry.get("Colon").unwrap();
    let string_lit = registry.get("StringLit").unwrap();
    let number_lit = registry.get("NumberLit").unwrap();
    let true_lit = registry.get("True").unwrap();
    let false_lit = registry.get("False").unwrap();
    let null_lit = registry.get("Null").unwrap();

    let mut grammar = Grammar::new(name, registry.clone());

    grammar.rule(
        rule("json", |s| {
            s.or(1, |alts| {
                alts.alt(|s| s.subrule(1, "object"))
                    .alt(|s| s.subrule(2, "array"))
            })
        }),
        |p| {
            p.or(
                1,
                None,
                &mut [
                    OrAlt::alt(|p| p.subrule(1, "object")),
                    OrAlt::alt(|p| p.subrule(2, "array")),
                ],
            )
        },
    );

    grammar.rule(
        rule("object", |s| {
            s.consume(1, l_curly)
                .many_sep(1, comma, |s| s.subrule(1, "entry"))
                .consume(2, r_curly)
        }),
        move |p| {
            p.consume(1, l_curly)?;
            let mut entries = Vec::new();
            p.many_sep(1, comma, |p| {
                if let Json::Object(mut pairs) = p.subrule(1, "entry")? {
                    entries.append(&mut pairs);
                }
                Ok(())
            })?;
            p.consume(2, r_curly)?;
            Ok(Json::Object(entries))
        },
    );

    grammar.rule(
        rule("entry", |s| {
            s.consume(1, string_lit)
                .consume(2, colon)
                .subrule(1, "value")
        }),
        move |p| {
            let key = p.consume(1, string_lit)?;
            p.consume(2, colon)?;
            let value = p.subrule(1, "value")?;
            Ok(Json::Object(vec![(unquote(&key.image), value)]))
        },
    );

    grammar.rule(
        rule("array", |s| {
            s.consume(1, l_square)
                .many_sep(1, comma, |s| s.subrule(1, "value"))
                .consume(2, r_square)
        }),
        move |p| {
            p.consume(1, l_square)?;
            let mut values = Vec::new();
            p.many_sep(1, comma, |p| {
                values.push(p.subrule(1, "value")?);
                Ok(())
            })?;
            p.consume(2, r_square)?;
            Ok(Json::Array(values))
        },
    );

    grammar.rule(
        rule("value", |s| {
            s.or(1, |alts| {
                alts.alt(|s| s.consume(1, string_lit))
                    .alt(|s| s.consume(2, number_lit))
                    .alt(|s| s.subrule(1, "object"))
                    .alt(|s| s.subrule(2, "array"))
                    .alt(|s| s.consume(3, true_lit))
                    .alt(|s| s.consume(4, false_lit))
                    .alt(|s| s.consume(5, null_lit))
            })
        }),
        move |p| {
            p.or(
                1,
                None,
                &mut [
                    OrAlt::alt(|p| {
                        let token = p.consume(1, string_lit)?;
                        Ok(if token.inserted_in_recovery {
                            Json::Invalid
                        } else {
                            Json::String(unquote(&token.image))
                        })
                    }),
                    OrAlt::alt(|p| {
                        let token = p.consume(2, number_lit)?;
                        Ok(if token.inserted_in_recovery {
                            Json::Invalid
                        } else {
                            Json::Number(token.image.parse().unwrap())
                        })
                    }),
                    OrAlt::alt(|p| p.subrule(1, "object")),
                    OrAlt::alt(|p| p.subrule(2, "array")),
                    OrAlt::alt(|p| {
                        p.consume(3, true_lit)?;
                        Ok(Json::Bool(true))
                    }),
                    OrAlt::alt(|p| {
                        p.consume(4, false_lit)?;
                        Ok(Json::Bool(false))
                    }),
                    OrAlt::alt(|p| {
                        p.consume(5, null_lit)?;
                        Ok(Json::Null)
                    }),
                ],
            )
        },
    );

    grammar
}

fn recovering() -> ParserConfig {
    ParserConfig {
        recovery_enabled: true,
        ..ParserConfig::default()
    }
}

#[test]
fn parses_well_formed_input() {
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    let input = lex(&registry, "{ \"a\": 1 }");
    let mut parser = Parser::new(&grammar, input, ParserConfig::default()).unwrap();
    let value = parser.parse("json").unwrap();
    assert_eq!(
        value,
        Json::Object(vec![("a".to_string(), Json::Number(1.0))])
    );
    assert!(parser.errors().is_empty());
}

#[test]
fn parses_nested_structures() {
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    let input = lex(&registry, "{ \"a\": [1, true, null], \"b\": { \"c\": \"d\" } }");
    let mut parser = Parser::new(&grammar, input, ParserConfig::default()).unwrap();
    let value = parser.parse("json").unwrap();
    assert_eq!(
        value,
        Json::Object(vec![
            (
                "a".to_string(),
                Json::Array(vec![Json::Number(1.0), Json::Bool(true), Json::Null]),
            ),
            (
                "b".to_string(),
                Json::Object(vec![("c".to_string(), Json::String("d".to_string()))]),
            ),
        ])
    );
    assert!(parser.errors().is_empty());
}

#[test]
fn missing_closing_curly_resyncs_the_top_rule() {
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    let input = lex(&registry, "{ \"a\": 1 ");
    let mut parser = Parser::new(&grammar, input, recovering()).unwrap();
    let value = parser.parse("json").unwrap();
    // The object rule cannot repair the missing curly at EOF; it re-syncs
    // and yields its recovery value.
    assert_eq!(value, Json::Invalid);
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(
        parser.errors()[0].kind,
        RecognitionErrorKind::MismatchedToken
    );
    assert!(parser.errors()[0].message.contains("RCurly"));
    assert!(parser.errors()[0].resynced_tokens.is_empty());
}

#[test]
fn missing_colon_is_repaired_by_insertion() {
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    let input = lex(&registry, "{ \"a\" 1 }");
    let mut parser = Parser::new(&grammar, input, recovering()).unwrap();
    let value = parser.parse("json").unwrap();
    // A colon is fabricated and the rest of the input parses normally.
    assert_eq!(
        value,
        Json::Object(vec![("a".to_string(), Json::Number(1.0))])
    );
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(
        parser.errors()[0].kind,
        RecognitionErrorKind::MismatchedToken
    );
}

#[test]
fn doubled_separator_is_repaired_in_repetition() {
    // An array of plain numbers, as a dedicated grammar using MANY_SEP over
    // a terminal.
    let registry = json_registry();
    let l_square = registry.get("LSquare").unwrap();
    let r_square = registry.get("RSquare").unwrap();
    let comma = registry.get("Comma").unwrap();
    let number_lit = registry.get("NumberLit").unwrap();
    let mut grammar = Grammar::new("json_number_array", registry.clone());
    grammar.rule(
        rule("array", |s| {
            s.consume(1, l_square)
                .many_sep(1, comma, |s| s.consume(2, number_lit))
                .consume(3, r_square)
        }),
        move |p| {
            p.consume(1, l_square)?;
            let mut values = Vec::new();
            p.many_sep(1, comma, |p| {
                let token = p.consume(2, number_lit)?;
                if !token.inserted_in_recovery {
                    values.push(Json::Number(token.image.parse().unwrap()));
                }
                Ok(())
            })?;
            p.consume(3, r_square)?;
            Ok(Json::Array(values))
        },
    );
    let input = lex(&registry, "[1,,2]");
    let mut parser = Parser::new(&grammar, input, recovering()).unwrap();
    let value = parser.parse("array").unwrap();
    // The missing number is fabricated at the doubled comma; the real
    // elements survive.
    assert_eq!(
        value,
        Json::Array(vec![Json::Number(1.0), Json::Number(2.0)])
    );
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(
        parser.errors()[0].kind,
        RecognitionErrorKind::MismatchedToken
    );
    assert_eq!(parser.errors()[0].token.image, ",");
}

#[test]
fn identical_alternatives_are_rejected() {
    let registry = json_registry();
    let number_lit = registry.get("NumberLit").unwrap();
    let mut grammar = Grammar::<Json>::new("json_ambiguous", registry.clone());
    grammar.rule(
        rule("value", |s| {
            s.or(1, |alts| {
                alts.alt(|s| s.consume(1, number_lit))
                    .alt(|s| s.consume(2, number_lit))
            })
        }),
        move |p| {
            let token = p.consume(1, number_lit)?;
            Ok(Json::Number(token.image.parse().unwrap()))
        },
    );
    let errors = Parser::new(&grammar, Vec::new(), ParserConfig::default()).unwrap_err();
    assert_eq!(errors.errors.len(), 1);
    assert_eq!(errors.errors[0].kind, DefinitionErrorKind::AmbiguousAlts);
    assert_eq!(errors.errors[0].dsl_kind, Some(DslKind::Or));
    assert_eq!(errors.errors[0].occurrence, Some(1));
    assert_eq!(errors.errors[0].alternatives, vec![1, 2]);
}

#[test]
fn duplicate_rule_registration_is_rejected() {
    let registry = json_registry();
    let number_lit = registry.get("NumberLit").unwrap();
    let mut grammar = Grammar::<Json>::new("json_duplicate_rule", registry.clone());
    grammar.rule(rule("value", |s| s.consume(1, number_lit)), move |p| {
        let token = p.consume(1, number_lit)?;
        Ok(Json::Number(token.image.parse().unwrap()))
    });
    grammar.rule(rule("value", |s| s.consume(1, number_lit)), move |p| {
        let token = p.consume(1, number_lit)?;
        Ok(Json::Number(token.image.parse().unwrap()))
    });
    let errors = Parser::new(&grammar, Vec::new(), ParserConfig::default()).unwrap_err();
    assert_eq!(errors.errors.len(), 1);
    assert_eq!(errors.errors[0].kind, DefinitionErrorKind::DuplicateRuleName);
    assert_eq!(errors.errors[0].rule_name, "value");
}

#[test]
fn recovery_never_raises_out_of_the_top_rule() {
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    for input in &["} ] , :", "[ { ] }", "{ \"a\" \"b\" \"c\" }", ", , ,"] {
        let tokens = lex(&registry, input);
        let mut parser = Parser::new(&grammar, tokens, recovering()).unwrap();
        assert!(
            parser.parse("json").is_ok(),
            "recovery must terminate `{}` without raising",
            input
        );
        assert!(!parser.errors().is_empty());
    }
}

#[test]
fn decisions_depend_only_on_lookahead() {
    // Two parsers over the same input take identical decisions.
    let registry = json_registry();
    let grammar = json_grammar("json", &registry);
    let input = "{ \"a\": [1, 2], \"b\": false }";
    let mut first = Parser::new(&grammar, lex(&registry, input), ParserConfig::default()).unwrap();
    let mut second = Parser::new(&grammar, lex(&registry, input), ParserConfig::default()).unwrap();
    assert_eq!(first.parse("json").unwrap(), second.parse("json").unwrap());
}
