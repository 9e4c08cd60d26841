//! Tokenizer for grammar documents.
//!
//! The lexer is restartable at arbitrary byte offsets ([`Lexer::rewind`]) so
//! the grammar parser can backtrack without re-allocating. Whitespace and
//! `#`-to-end-of-line comments are skipped; anything else outside the
//! declared token alphabet is a hard [`LexError`].

use thiserror::Error;

/// Classification of one production unit as produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// `"…"`: escaped terminal text.
    Terminal,
    /// `<name>`: reference to another production.
    NonTerminal,
    /// `/…/`: regex terminal, compiled later by the grammar parser.
    RegexTerminal,
    /// `'…'`: raw terminal text, no escape processing.
    LiteralTerminal,
    /// `[ ] { } ( ) |` and the `::=` definition operator.
    Meta,
    /// `;`: end of production.
    End,
}

/// One lexed unit. The lexeme keeps the surrounding quote/slash characters
/// so that re-lexing a joined token stream reproduces the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: UnitKind,
    pub lexeme: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated quoted string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("unterminated regex group starting at byte {0}")]
    UnterminatedRegex(usize),
    #[error("unterminated non-terminal starting at byte {0}")]
    UnterminatedNonTerminal(usize),
    #[error("unexpected character {ch:?} at byte {offset}")]
    UnexpectedChar { offset: usize, ch: char },
}

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    /// Current byte offset; pass back into [`Lexer::rewind`] to backtrack.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, position: usize) {
        self.pos = position.min(self.src.len());
    }

    /// Lex the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<Token>, LexError> {
        let save = self.pos;
        let tok = self.next_token();
        self.pos = save;
        tok
    }

    /// Lex and consume the next token; `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.current_char() else {
            return Ok(None);
        };

        let token = match c {
            '<' => self.lex_delimited('<', '>', UnitKind::NonTerminal, |o| {
                LexError::UnterminatedNonTerminal(o)
            })?,
            '"' => self.lex_quoted('"', UnitKind::Terminal)?,
            '\'' => self.lex_quoted('\'', UnitKind::LiteralTerminal)?,
            '/' => self.lex_regex()?,
            '[' | ']' | '{' | '}' | '(' | ')' | '|' => {
                self.pos += c.len_utf8();
                Token {
                    kind: UnitKind::Meta,
                    lexeme: c.to_string(),
                    offset: start,
                }
            }
            ':' if self.src[self.pos..].starts_with("::=") => {
                self.pos += 3;
                Token {
                    kind: UnitKind::Meta,
                    lexeme: "::=".to_string(),
                    offset: start,
                }
            }
            ';' => {
                self.pos += 1;
                Token {
                    kind: UnitKind::End,
                    lexeme: ";".to_string(),
                    offset: start,
                }
            }
            other => {
                return Err(LexError::UnexpectedChar {
                    offset: start,
                    ch: other,
                });
            }
        };
        Ok(Some(token))
    }

    fn current_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.src[self.pos..];
            let Some(c) = rest.chars().next() else { return };
            if c.is_whitespace() {
                self.pos += c.len_utf8();
                continue;
            }
            if c == '#' {
                match rest.find('\n') {
                    Some(nl) => self.pos += nl + 1,
                    None => self.pos = self.src.len(),
                }
                continue;
            }
            return;
        }
    }

    fn lex_delimited(
        &mut self,
        open: char,
        close: char,
        kind: UnitKind,
        err: impl Fn(usize) -> LexError,
    ) -> Result<Token, LexError> {
        let start = self.pos;
        debug_assert_eq!(self.current_char(), Some(open));
        self.pos += open.len_utf8();
        while let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
            if c == close {
                return Ok(Token {
                    kind,
                    lexeme: self.src[start..self.pos].to_string(),
                    offset: start,
                });
            }
            if c == '\n' {
                break;
            }
        }
        Err(err(start))
    }

    /// Quoted terminal with backslash escapes; the closing quote must appear
    /// on the same logical token (newlines are allowed when escaped).
    fn lex_quoted(&mut self, quote: char, kind: UnitKind) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += quote.len_utf8();
        let mut escaped = false;
        while let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                continue;
            }
            if c == quote {
                return Ok(Token {
                    kind,
                    lexeme: self.src[start..self.pos].to_string(),
                    offset: start,
                });
            }
        }
        Err(LexError::UnterminatedString(start))
    }

    fn lex_regex(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        self.pos += 1; // opening '/'
        let mut escaped = false;
        while let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                continue;
            }
            if c == '/' {
                return Ok(Token {
                    kind: UnitKind::RegexTerminal,
                    lexeme: self.src[start..self.pos].to_string(),
                    offset: start,
                });
            }
            if c == '\n' {
                break;
            }
        }
        Err(LexError::UnterminatedRegex(start))
    }
}

/// Strip the delimiters from a lexed unit and process terminal escapes.
pub(crate) fn unit_payload(kind: UnitKind, lexeme: &str) -> String {
    match kind {
        UnitKind::Terminal => unescape(&lexeme[1..lexeme.len() - 1]),
        UnitKind::LiteralTerminal | UnitKind::NonTerminal | UnitKind::RegexTerminal => {
            lexeme[1..lexeme.len() - 1].to_string()
        }
        UnitKind::Meta | UnitKind::End => lexeme.to_string(),
    }
}

/// Process `\n \r \t \\ \" \'` escapes; unknown escapes keep the backslash.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<Token> {
        let mut lx = Lexer::new(src);
        let mut out = Vec::new();
        while let Some(tok) = lx.next_token().expect("lex") {
            out.push(tok);
        }
        out
    }

    #[test]
    fn lexes_a_production() {
        let toks = lex_all(r#"<rule> ::= "lit" /[a-z]+/ [ <other> ] ;"#);
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::NonTerminal,
                UnitKind::Meta,
                UnitKind::Terminal,
                UnitKind::RegexTerminal,
                UnitKind::Meta,
                UnitKind::NonTerminal,
                UnitKind::Meta,
                UnitKind::End,
            ]
        );
        assert_eq!(toks[0].lexeme, "<rule>");
        assert_eq!(toks[2].lexeme, "\"lit\"");
    }

    #[test]
    fn skips_comments_and_whitespace() {
        let toks = lex_all("# heading\n  <a> # trailing\n ::= 'x' ;");
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[0].lexeme, "<a>");
    }

    #[test]
    fn roundtrip_relex_matches() {
        // Joining lexemes with separators re-lexes to the same stream
        // (offsets aside).
        let src = r#"<a> ::= "x\n" | /q+/ { <b> } ; <b> ::= 'y' ;"#;
        let toks = lex_all(src);
        let joined = toks
            .iter()
            .map(|t| t.lexeme.clone())
            .collect::<Vec<_>>()
            .join(" ");
        let relexed = lex_all(&joined);
        assert_eq!(relexed.len(), toks.len());
        for (a, b) in toks.iter().zip(&relexed) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.lexeme, b.lexeme);
        }
    }

    #[test]
    fn unterminated_string_fails() {
        let mut lx = Lexer::new("<a> ::= \"oops");
        lx.next_token().unwrap();
        lx.next_token().unwrap();
        assert!(matches!(
            lx.next_token(),
            Err(LexError::UnterminatedString(_))
        ));
    }

    #[test]
    fn unterminated_regex_fails() {
        let mut lx = Lexer::new("/ab\n");
        assert!(matches!(lx.next_token(), Err(LexError::UnterminatedRegex(0))));
    }

    #[test]
    fn unknown_char_fails() {
        let mut lx = Lexer::new("$");
        assert!(matches!(
            lx.next_token(),
            Err(LexError::UnexpectedChar { offset: 0, ch: '$' })
        ));
    }

    #[test]
    fn rewind_replays_tokens() {
        let mut lx = Lexer::new("<a> ::= 'x' ;");
        let first = lx.next_token().unwrap().unwrap();
        let mark = lx.position();
        let second = lx.next_token().unwrap().unwrap();
        lx.rewind(mark);
        assert_eq!(lx.next_token().unwrap().unwrap(), second);
        assert_ne!(first.lexeme, second.lexeme);
    }

    #[test]
    fn unescapes_common_sequences() {
        assert_eq!(unescape(r"a\nb\t\\\'"), "a\nb\t\\'");
    }
}
