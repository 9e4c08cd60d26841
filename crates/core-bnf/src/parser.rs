//! Recursive-descent instruction parser.
//!
//! Matches instruction text against a compiled [`Grammar`] with an explicit
//! byte cursor. Alternation backtracks by saving and restoring the cursor;
//! the furthest failure offset and its expected set are tracked for error
//! reporting. Whitespace and `//` comments are skipped between units, so
//! the concatenated terminal text of a successful parse equals the input
//! modulo trivia. `#` stays meaningful inside instructions (color tokens).

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::trace;

use crate::ast::{AstNode, IntermediaryNode, RootNode, TerminalNode, site_hash};
use crate::grammar::{Alternative, Grammar, MetaKind, ProductionUnit};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at byte {offset}: expected one of [{}], observed {observed:?}",
        .expected.join(", "))]
pub struct ParseError {
    pub offset: usize,
    pub expected: Vec<String>,
    pub observed: String,
}

pub struct InstructionParser<'g> {
    grammar: &'g Grammar,
}

struct ParseState<'s> {
    text: &'s str,
    pos: usize,
    furthest: usize,
    expected: BTreeSet<String>,
}

impl<'s> ParseState<'s> {
    fn rest(&self) -> &'s str {
        &self.text[self.pos..]
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let Some(c) = rest.chars().next() else { return };
            if c.is_whitespace() {
                self.pos += c.len_utf8();
                continue;
            }
            if rest.starts_with("//") {
                match rest.find('\n') {
                    Some(nl) => self.pos += nl + 1,
                    None => self.pos = self.text.len(),
                }
                continue;
            }
            return;
        }
    }

    fn fail(&mut self, expected: impl Into<String>) {
        if self.pos > self.furthest {
            self.furthest = self.pos;
            self.expected.clear();
        }
        if self.pos == self.furthest {
            self.expected.insert(expected.into());
        }
    }

    fn observed_at_furthest(&self) -> String {
        let rest = &self.text[self.furthest.min(self.text.len())..];
        if rest.is_empty() {
            return "<eof>".to_string();
        }
        let upto = rest
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take(16)
            .last()
            .unwrap_or(rest.len());
        rest[..upto].to_string()
    }
}

impl<'g> InstructionParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Parse one instruction document; the whole input must be consumed.
    pub fn parse(&self, text: &str) -> Result<AstNode, ParseError> {
        let mut st = ParseState {
            text,
            pos: 0,
            furthest: 0,
            expected: BTreeSet::new(),
        };

        let start = self.grammar.start().to_string();
        let Some(node) = self.match_rule(&start, &mut st) else {
            return Err(self.error_from(&st));
        };

        st.skip_trivia();
        if st.pos != text.len() {
            st.fail("end of input");
            return Err(self.error_from(&st));
        }

        trace!(start = %start, bytes = text.len(), "instruction parsed");
        Ok(AstNode::Root(RootNode {
            lhs: start,
            children: vec![node],
        }))
    }

    fn error_from(&self, st: &ParseState<'_>) -> ParseError {
        ParseError {
            offset: st.furthest,
            expected: st.expected.iter().cloned().collect(),
            observed: st.observed_at_furthest(),
        }
    }

    fn match_rule(&self, name: &str, st: &mut ParseState<'_>) -> Option<AstNode> {
        let rule = self
            .grammar
            .rule(name)
            .unwrap_or_else(|| panic!("grammar invariant: rule `{name}` resolved at compile"));
        for (alt_index, alt) in rule.alternatives.iter().enumerate() {
            let save = st.pos;
            if let Some(children) = self.match_alternative(alt, st) {
                return Some(AstNode::Intermediary(IntermediaryNode {
                    lhs: name.to_string(),
                    alt_index,
                    site: site_hash(name, alt_index),
                    children,
                }));
            }
            st.pos = save;
        }
        None
    }

    fn match_alternative(&self, alt: &Alternative, st: &mut ParseState<'_>) -> Option<Vec<AstNode>> {
        let mut children = Vec::new();
        for unit in alt {
            if !self.match_unit(unit, st, &mut children) {
                return None;
            }
        }
        Some(children)
    }

    /// Match one unit, appending produced nodes to `out`. Meta groups splice
    /// their children directly into the parent (zero-or-more semantics).
    fn match_unit(
        &self,
        unit: &ProductionUnit,
        st: &mut ParseState<'_>,
        out: &mut Vec<AstNode>,
    ) -> bool {
        match unit {
            ProductionUnit::Terminal { text } | ProductionUnit::Literal { text } => {
                st.skip_trivia();
                if st.rest().starts_with(text.as_str()) {
                    st.pos += text.len();
                    out.push(AstNode::Terminal(TerminalNode { text: text.clone() }));
                    true
                } else {
                    st.fail(format!("{text:?}"));
                    false
                }
            }
            ProductionUnit::Regex { pattern, re } => {
                st.skip_trivia();
                match re.find(st.rest()) {
                    Some(m) => {
                        let matched = m.as_str().to_string();
                        st.pos += m.end();
                        out.push(AstNode::Terminal(TerminalNode { text: matched }));
                        true
                    }
                    None => {
                        st.fail(format!("/{pattern}/"));
                        false
                    }
                }
            }
            ProductionUnit::NonTerminal { name } => match self.match_rule(name, st) {
                Some(node) => {
                    out.push(node);
                    true
                }
                None => false,
            },
            ProductionUnit::Meta { kind, alternatives } => match kind {
                MetaKind::Optional => {
                    self.try_alternatives(alternatives, st, out);
                    true
                }
                MetaKind::Repeat => {
                    loop {
                        let before = st.pos;
                        if !self.try_alternatives(alternatives, st, out) {
                            break;
                        }
                        // An empty match would loop forever.
                        if st.pos == before {
                            break;
                        }
                    }
                    true
                }
                MetaKind::Group => self.try_alternatives(alternatives, st, out),
            },
        }
    }

    /// Try the group alternatives in order, appending the first success.
    fn try_alternatives(
        &self,
        alternatives: &[Alternative],
        st: &mut ParseState<'_>,
        out: &mut Vec<AstNode>,
    ) -> bool {
        for alt in alternatives {
            let save = st.pos;
            if let Some(children) = self.match_alternative(alt, st) {
                out.extend(children);
                return true;
            }
            st.pos = save;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::flatten_terminals;
    use crate::grammar::parse_grammar;

    fn ident_grammar() -> Grammar {
        parse_grammar(
            r#"
            <list> ::= { <entry> } ;
            <entry> ::= <pair> | <word> ;
            <pair> ::= <word> "=" <word> [ ";" ] ;
            <word> ::= /[A-Za-z_][A-Za-z0-9_.]*/ ;
            "#,
        )
        .expect("grammar")
    }

    #[test]
    fn parses_with_backtracking_between_alternatives() {
        let g = ident_grammar();
        let p = InstructionParser::new(&g);
        let ast = p.parse("a = b; standalone c = d").expect("parse");
        // 3 entries: pair, word, pair.
        let AstNode::Root(root) = &ast else { unreachable!() };
        let list = root.children[0].as_intermediary().unwrap();
        assert_eq!(list.children.len(), 3);
    }

    #[test]
    fn totality_flatten_equals_input_modulo_trivia() {
        let g = ident_grammar();
        let p = InstructionParser::new(&g);
        let input = "x = y ; // comment\n z";
        let ast = p.parse(input).expect("parse");
        assert_eq!(flatten_terminals(&ast), "x=y;z");
    }

    #[test]
    fn error_carries_offset_and_expected_set() {
        let g = parse_grammar(r#"<a> ::= "x" ( "y" | "z" ) ;"#).unwrap();
        let p = InstructionParser::new(&g);
        let err = p.parse("x q").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.expected, vec!["\"y\"".to_string(), "\"z\"".to_string()]);
        assert_eq!(err.observed, "q");
    }

    #[test]
    fn partial_match_must_consume_all_input() {
        let g = parse_grammar(r#"<a> ::= "x" ;"#).unwrap();
        let p = InstructionParser::new(&g);
        let err = p.parse("x trailing").unwrap_err();
        assert!(err.expected.contains(&"end of input".to_string()));
    }

    #[test]
    fn optional_group_may_match_nothing() {
        let g = parse_grammar(r#"<a> ::= "x" [ "y" ] ;"#).unwrap();
        let p = InstructionParser::new(&g);
        assert!(p.parse("x").is_ok());
        assert!(p.parse("x y").is_ok());
    }

    #[test]
    fn repeat_group_collects_zero_or_more() {
        let g = parse_grammar(r#"<a> ::= { "x" } ;"#).unwrap();
        let p = InstructionParser::new(&g);
        for (input, want) in [("", 0), ("x", 1), ("x x x", 3)] {
            let ast = p.parse(input).expect("parse");
            let AstNode::Root(root) = &ast else { unreachable!() };
            assert_eq!(root.children[0].children().len(), want, "input {input:?}");
        }
    }

    #[test]
    fn intermediary_records_matched_alternative() {
        let g = parse_grammar(r#"<a> ::= "x" | "y" ;"#).unwrap();
        let p = InstructionParser::new(&g);
        let ast = p.parse("y").unwrap();
        let AstNode::Root(root) = &ast else { unreachable!() };
        let n = root.children[0].as_intermediary().unwrap();
        assert_eq!(n.alt_index, 1);
        assert_eq!(n.site, site_hash("a", 1));
    }
}
