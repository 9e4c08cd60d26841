//! Grammar parser: turns a lexed BNF document into an immutable [`Grammar`].

use std::collections::HashMap;

use regex::Regex;
use thiserror::Error;

use crate::lexer::{LexError, Lexer, Token, UnitKind, unit_payload};

/// Meta-group operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// `[ … ]`: match zero or one time.
    Optional,
    /// `{ … }`: match zero or more times.
    Repeat,
    /// `( … )`: match exactly once (used for inline alternation).
    Group,
}

/// One unit inside an alternative.
#[derive(Debug, Clone)]
pub enum ProductionUnit {
    /// Escaped terminal text, matched literally against instruction input.
    Terminal { text: String },
    /// Raw terminal text (single-quoted in the grammar document).
    Literal { text: String },
    /// Reference to another rule by name.
    NonTerminal { name: String },
    /// Regex terminal, anchored at the parser cursor.
    Regex { pattern: String, re: Regex },
    /// Nested group with its own alternatives.
    Meta {
        kind: MetaKind,
        alternatives: Vec<Alternative>,
    },
}

/// Ordered sequence of units; one of the `|`-separated branches of a rule.
pub type Alternative = Vec<ProductionUnit>;

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub alternatives: Vec<Alternative>,
}

/// Immutable compiled grammar. Well-formedness (defined references, unique
/// rule names, compilable regexes) is established before any instruction is
/// parsed against it.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    start: String,
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("duplicate rule `{rule}`")]
    DuplicateRule { rule: String },
    #[error("rule `{rule}` references undefined rule `{reference}`")]
    UndefinedReference { rule: String, reference: String },
    #[error("rule `{rule}`: malformed alternative: {reason}")]
    Malformed { rule: String, reason: String },
    #[error("rule `{rule}`: invalid regex `{pattern}`: {source}")]
    BadRegex {
        rule: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("grammar document declares no rules")]
    Empty,
    #[error("start symbol `{rule}` is not a declared rule")]
    UnknownStart { rule: String },
}

impl Grammar {
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Override the default start symbol (first declared rule).
    pub fn with_start(mut self, name: &str) -> Result<Self, GrammarError> {
        if !self.index.contains_key(name) {
            return Err(GrammarError::UnknownStart {
                rule: name.to_string(),
            });
        }
        self.start = name.to_string();
        Ok(self)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// Parse a grammar document. The first declared rule becomes the start
/// symbol.
pub fn parse_grammar(source: &str) -> Result<Grammar, GrammarError> {
    let mut lexer = Lexer::new(source);
    let mut rules: Vec<Rule> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    while let Some(head) = lexer.next_token()? {
        let name = match head.kind {
            UnitKind::NonTerminal => unit_payload(head.kind, &head.lexeme),
            _ => {
                return Err(GrammarError::Malformed {
                    rule: head.lexeme,
                    reason: "expected `<rule>` at start of production".to_string(),
                });
            }
        };
        expect_meta(&mut lexer, &name, "::=")?;

        let (alternatives, terminator) = parse_alternatives(&mut lexer, &name, None)?;
        if terminator.is_some() {
            return Err(GrammarError::Malformed {
                rule: name,
                reason: "unbalanced closing meta group".to_string(),
            });
        }
        if alternatives.iter().all(|alt| alt.is_empty()) {
            return Err(GrammarError::Malformed {
                rule: name,
                reason: "production has no units".to_string(),
            });
        }

        if index.contains_key(&name) {
            return Err(GrammarError::DuplicateRule { rule: name });
        }
        index.insert(name.clone(), rules.len());
        rules.push(Rule { name, alternatives });
    }

    if rules.is_empty() {
        return Err(GrammarError::Empty);
    }

    // Every referenced non-terminal must be declared somewhere.
    for rule in &rules {
        for alt in &rule.alternatives {
            check_references(&rule.name, alt, &index)?;
        }
    }

    let start = rules[0].name.clone();
    Ok(Grammar {
        rules,
        index,
        start,
    })
}

fn check_references(
    rule: &str,
    alt: &Alternative,
    index: &HashMap<String, usize>,
) -> Result<(), GrammarError> {
    for unit in alt {
        match unit {
            ProductionUnit::NonTerminal { name } => {
                if !index.contains_key(name) {
                    return Err(GrammarError::UndefinedReference {
                        rule: rule.to_string(),
                        reference: name.clone(),
                    });
                }
            }
            ProductionUnit::Meta { alternatives, .. } => {
                for nested in alternatives {
                    check_references(rule, nested, index)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn expect_meta(lexer: &mut Lexer<'_>, rule: &str, want: &str) -> Result<(), GrammarError> {
    match lexer.next_token()? {
        Some(Token {
            kind: UnitKind::Meta,
            lexeme,
            ..
        }) if lexeme == want => Ok(()),
        other => Err(GrammarError::Malformed {
            rule: rule.to_string(),
            reason: format!("expected `{want}`, found {other:?}"),
        }),
    }
}

/// Parse `|`-separated alternatives until the production terminator `;` or,
/// inside a meta group, the matching closer. Returns the closer lexeme when
/// one ended the scan.
fn parse_alternatives(
    lexer: &mut Lexer<'_>,
    rule: &str,
    closing: Option<&str>,
) -> Result<(Vec<Alternative>, Option<String>), GrammarError> {
    let mut alternatives: Vec<Alternative> = Vec::new();
    let mut current: Alternative = Vec::new();

    loop {
        let Some(tok) = lexer.next_token()? else {
            return Err(GrammarError::Malformed {
                rule: rule.to_string(),
                reason: "unexpected end of grammar inside production".to_string(),
            });
        };

        match tok.kind {
            UnitKind::End => {
                if closing.is_some() {
                    return Err(GrammarError::Malformed {
                        rule: rule.to_string(),
                        reason: "`;` inside unterminated meta group".to_string(),
                    });
                }
                alternatives.push(current);
                return Ok((alternatives, None));
            }
            UnitKind::Meta => match tok.lexeme.as_str() {
                "|" => {
                    alternatives.push(std::mem::take(&mut current));
                }
                "[" | "{" | "(" => {
                    let (kind, closer) = match tok.lexeme.as_str() {
                        "[" => (MetaKind::Optional, "]"),
                        "{" => (MetaKind::Repeat, "}"),
                        _ => (MetaKind::Group, ")"),
                    };
                    let (nested, ended) = parse_alternatives(lexer, rule, Some(closer))?;
                    if ended.as_deref() != Some(closer) {
                        return Err(GrammarError::Malformed {
                            rule: rule.to_string(),
                            reason: format!("expected `{closer}` to close meta group"),
                        });
                    }
                    current.push(ProductionUnit::Meta {
                        kind,
                        alternatives: nested,
                    });
                }
                "]" | "}" | ")" => {
                    if closing == Some(tok.lexeme.as_str()) {
                        alternatives.push(current);
                        return Ok((alternatives, Some(tok.lexeme)));
                    }
                    return Err(GrammarError::Malformed {
                        rule: rule.to_string(),
                        reason: format!("unbalanced `{}`", tok.lexeme),
                    });
                }
                other => {
                    return Err(GrammarError::Malformed {
                        rule: rule.to_string(),
                        reason: format!("unexpected meta token `{other}`"),
                    });
                }
            },
            UnitKind::Terminal => current.push(ProductionUnit::Terminal {
                text: unit_payload(tok.kind, &tok.lexeme),
            }),
            UnitKind::LiteralTerminal => current.push(ProductionUnit::Literal {
                text: unit_payload(tok.kind, &tok.lexeme),
            }),
            UnitKind::NonTerminal => current.push(ProductionUnit::NonTerminal {
                name: unit_payload(tok.kind, &tok.lexeme),
            }),
            UnitKind::RegexTerminal => {
                let pattern = unit_payload(tok.kind, &tok.lexeme);
                let anchored = format!(r"\A(?:{pattern})");
                let re = Regex::new(&anchored).map_err(|source| GrammarError::BadRegex {
                    rule: rule.to_string(),
                    pattern: pattern.clone(),
                    source,
                })?;
                current.push(ProductionUnit::Regex { pattern, re });
            }
        }
    }
}
