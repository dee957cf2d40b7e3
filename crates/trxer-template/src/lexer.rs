use crate::error::{Location, Result, TemplateError};
use crate::token::{to_keyword, Token, TokenKind};

const OPEN: &str = "{[";
const CLOSE: &str = "]}";

/// Splits report template source into text runs and tag tokens
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    in_tag: bool,
    /// Nothing but whitespace seen since the last `{[`
    tag_start: bool,
    /// The next `/` starts an include name
    include_pending: bool,
    /// A `-]}` asked to drop the rest of its line
    trim_line: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            in_tag: false,
            tag_start: false,
            include_pending: false,
            trim_line: false,
        }
    }

    /// Tokenize the whole source; the last token is always `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while self.pos < self.chars.len() {
            if self.in_tag {
                self.lex_tag_part(&mut tokens)?;
            } else {
                self.lex_text(&mut tokens)?;
            }
        }

        if self.in_tag {
            return Err(self.error("Unclosed tag at end of template", self.location()));
        }
        tokens.push(Token::new(TokenKind::Eof, self.location()));
        Ok(tokens)
    }

    fn lex_text(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        if std::mem::take(&mut self.trim_line) {
            self.skip_blank_line_rest();
        }

        let start = self.location();
        let mut text = String::new();
        while self.pos < self.chars.len() && !self.at(OPEN) {
            text.push(self.bump());
        }
        if !text.is_empty() {
            tokens.push(Token::new(TokenKind::Text(text), start));
        }

        if self.at(OPEN) {
            self.lex_open(tokens)?;
        }
        Ok(())
    }

    /// Drop trailing blanks and the newline, unless other text follows on the line
    fn skip_blank_line_rest(&mut self) {
        let rest = &self.chars[self.pos..];
        let blanks = rest.iter().take_while(|c| matches!(c, ' ' | '\t' | '\r')).count();
        if blanks < rest.len() && rest[blanks] != '\n' {
            return;
        }
        for _ in 0..blanks {
            self.bump();
        }
        if self.current() == Some('\n') {
            self.bump();
        }
    }

    fn lex_open(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.location();
        self.skip(OPEN.len());

        match self.current() {
            Some('!') => {
                while self.pos < self.chars.len() && !self.at(CLOSE) {
                    self.bump();
                }
                if !self.at(CLOSE) {
                    return Err(self.error("Unclosed comment", start));
                }
                self.skip(CLOSE.len());
            }
            Some('{') => {
                self.bump();
                if !self.at(CLOSE) {
                    return Err(self.error("Expected ']}' after '{[{'", self.location()));
                }
                self.skip(CLOSE.len());
                tokens.push(Token::new(TokenKind::Text(OPEN.to_string()), start));
            }
            next => {
                if next == Some('-') {
                    self.bump();
                    trim_blank_line_tail(tokens);
                }
                tokens.push(Token::new(TokenKind::Open, start));
                self.in_tag = true;
                self.tag_start = true;
            }
        }
        Ok(())
    }

    fn lex_tag_part(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        if self.tag_start {
            self.reject_space_before_marker()?;
            self.tag_start = false;
        }
        if self.current().is_some_and(is_space) {
            let start = self.location();
            let space = self.take_while(is_space);
            tokens.push(Token::new(TokenKind::Whitespace(space), start));
            return Ok(());
        }

        let start = self.location();
        if self.at("-]}") {
            self.bump();
            self.trim_line = true;
        }
        if self.at(CLOSE) {
            self.skip(CLOSE.len());
            self.in_tag = false;
            tokens.push(Token::new(TokenKind::Close, start));
            return Ok(());
        }

        let Some(c) = self.current() else {
            return Ok(());
        };
        let include_name = c == '/' && std::mem::take(&mut self.include_pending);
        let kind = match c {
            '/' if include_name => {
                self.bump();
                let mut name = String::from('/');
                name.push_str(&self.take_while(|c| is_ident_char(c) || c == '/'));
                TokenKind::Ident(name)
            }
            '\'' | '"' => self.lex_string(c, start)?,
            c if c.is_ascii_alphabetic() || c == '_' => {
                self.include_pending = false;
                let word = self.take_while(is_ident_char);
                to_keyword(&word).unwrap_or(TokenKind::Ident(word))
            }
            _ => {
                let kind = match c {
                    '#' => TokenKind::Hash,
                    '/' => TokenKind::Slash,
                    '>' => TokenKind::Gt,
                    '=' => TokenKind::Equal,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    _ => {
                        return Err(self.error(&format!("Unexpected character: '{c}'"), start));
                    }
                };
                self.bump();
                self.include_pending = kind == TokenKind::Gt;
                kind
            }
        };
        tokens.push(Token::new(kind, start));
        Ok(())
    }

    fn lex_string(&mut self, quote: char, start: Location) -> Result<TokenKind> {
        self.bump();
        let value = self.take_while(|c| c != quote && c != '\n');
        if self.current() != Some(quote) {
            return Err(self.error("Unterminated string literal", start));
        }
        self.bump();
        Ok(TokenKind::StringLit(value))
    }

    /// Block, close and include markers must follow `{[` directly
    fn reject_space_before_marker(&self) -> Result<()> {
        if !self.current().is_some_and(is_space) {
            return Ok(());
        }
        match self.chars[self.pos..].iter().find(|c| !is_space(**c)) {
            Some(&marker @ ('#' | '/' | '>')) => Err(self.error(
                &format!("Whitespace not allowed before '{marker}' after tag open"),
                self.location(),
            )),
            _ => Ok(()),
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut taken = String::new();
        while self.current().is_some_and(&keep) {
            taken.push(self.bump());
        }
        taken
    }

    fn at(&self, s: &str) -> bool {
        let rest = &self.chars[self.pos..];
        rest.len() >= s.chars().count() && s.chars().zip(rest).all(|(a, b)| a == *b)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.bump();
        }
    }

    fn bump(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn error(&self, message: &str, location: Location) -> TemplateError {
        TemplateError::LexerError {
            message: message.to_string(),
            location,
        }
    }
}

/// `{[-` removes the blanks between the previous line break and the tag
fn trim_blank_line_tail(tokens: &mut Vec<Token>) {
    let Some(idx) = tokens.iter().rposition(|t| matches!(t.kind, TokenKind::Text(_))) else {
        return;
    };
    let TokenKind::Text(value) = &tokens[idx].kind else {
        return;
    };

    let keep = value.rfind('\n').map_or(0, |newline| newline + 1);
    if !value[keep..].chars().all(|c| c == ' ' || c == '\t') {
        return;
    }
    if keep == 0 {
        tokens.remove(idx);
    } else {
        let trimmed = value[..keep].to_string();
        tokens[idx].kind = TokenKind::Text(trimmed);
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}
