//! Hand-written lexer producing tokens on demand.
//!
//! The lexer never fails: malformed input (unterminated strings, stray
//! characters) is reported as `TokenKind::Illegal` and left for the parser
//! to diagnose. Numeric literals are emitted as text only; the parser is
//! responsible for turning them into values.

use crate::token::{lookup_keyword, Position, Token, TokenKind};

/// Dotted identifiers are kept as a single token only when they name a
/// registered qualified built-in or a prelude-defined type method. Anything
/// else is split at the first dot so `value.method` parses as a method call.
pub const QUALIFIED_NAMES: &[&str] = &[
    "array.contains",
    "array.filter",
    "array.map",
    "directory.glob",
    "math.abs",
    "math.random",
    "math.sqrt",
    "os.environment",
    "os.getenv",
    "os.setenv",
    "string.repeat",
];

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    // Kind of the previous emitted token, used to tell division from the
    // start of a regexp literal.
    prev_kind: Option<TokenKind>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            prev_kind: None,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let token = self.read_token();
        self.prev_kind = Some(token.kind);
        token
    }

    fn read_token(&mut self) -> Token {
        self.skip_trivia();

        let position = self.current_position();
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Token::eof(position),
        };

        match ch {
            '=' => self.two_char_or(position, '=', TokenKind::Eq, TokenKind::Assign),
            '+' => {
                self.consume_char();
                match self.peek_char() {
                    Some('+') => self.finish(position, TokenKind::PlusPlus),
                    Some('=') => self.finish(position, TokenKind::PlusEquals),
                    _ => Token::new(TokenKind::Plus, "+", position),
                }
            }
            '-' => {
                self.consume_char();
                match self.peek_char() {
                    Some('-') => self.finish(position, TokenKind::MinusMinus),
                    Some('=') => self.finish(position, TokenKind::MinusEquals),
                    _ => Token::new(TokenKind::Minus, "-", position),
                }
            }
            '*' => {
                self.consume_char();
                match self.peek_char() {
                    Some('*') => self.finish(position, TokenKind::Pow),
                    Some('=') => self.finish(position, TokenKind::AsteriskEquals),
                    _ => Token::new(TokenKind::Asterisk, "*", position),
                }
            }
            '/' => {
                self.consume_char();
                if self.peek_char() == Some('=') {
                    return self.finish(position, TokenKind::SlashEquals);
                }
                if self.after_operand() {
                    Token::new(TokenKind::Slash, "/", position)
                } else {
                    self.read_regexp(position)
                }
            }
            '%' => self.single(position, TokenKind::Mod),
            '!' => {
                self.consume_char();
                match self.peek_char() {
                    Some('=') => self.finish(position, TokenKind::NotEq),
                    Some('~') => self.finish(position, TokenKind::NotContains),
                    _ => Token::new(TokenKind::Bang, "!", position),
                }
            }
            '~' => self.two_char_or(position, '=', TokenKind::Contains, TokenKind::Illegal),
            '<' => self.two_char_or(position, '=', TokenKind::LtEquals, TokenKind::Lt),
            '>' => self.two_char_or(position, '=', TokenKind::GtEquals, TokenKind::Gt),
            '&' => self.two_char_or(position, '&', TokenKind::And, TokenKind::Illegal),
            '|' => self.two_char_or(position, '|', TokenKind::Or, TokenKind::Illegal),
            '?' => self.single(position, TokenKind::Question),
            '.' => self.two_char_or(position, '.', TokenKind::DotDot, TokenKind::Period),
            ',' => self.single(position, TokenKind::Comma),
            ';' => self.single(position, TokenKind::Semicolon),
            ':' => self.single(position, TokenKind::Colon),
            '(' => self.single(position, TokenKind::LParen),
            ')' => self.single(position, TokenKind::RParen),
            '{' => self.single(position, TokenKind::LBrace),
            '}' => self.single(position, TokenKind::RBrace),
            '[' => self.single(position, TokenKind::LBracket),
            ']' => self.single(position, TokenKind::RBracket),
            '"' => self.read_string(position),
            '`' => self.read_backtick(position),
            c if c.is_ascii_digit() => self.read_number(position),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(position),
            c => {
                self.consume_char();
                Token::new(TokenKind::Illegal, c.to_string(), position)
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            self.consume_while(|c| c.is_ascii_whitespace());
            if self.peek_char() == Some('/') && self.peek_next_char() == Some('/') {
                self.consume_while(|c| c != '\n');
                continue;
            }
            break;
        }
    }

    fn single(&mut self, position: Position, kind: TokenKind) -> Token {
        self.consume_char();
        Token::new(kind, kind.literal(), position)
    }

    /// Consumes the current char, then either `two` (if the next char is
    /// `expected`, consuming it too) or `one` with just the first char.
    fn two_char_or(
        &mut self,
        position: Position,
        expected: char,
        two: TokenKind,
        one: TokenKind,
    ) -> Token {
        let first = self.consume_char().unwrap_or_default();
        if self.peek_char() == Some(expected) {
            self.finish(position, two)
        } else if one == TokenKind::Illegal {
            Token::new(TokenKind::Illegal, first.to_string(), position)
        } else {
            Token::new(one, one.literal(), position)
        }
    }

    /// Consumes the pending second char of a two-char operator.
    fn finish(&mut self, position: Position, kind: TokenKind) -> Token {
        self.consume_char();
        Token::new(kind, kind.literal(), position)
    }

    fn after_operand(&self) -> bool {
        matches!(
            self.prev_kind,
            Some(
                TokenKind::Ident
                    | TokenKind::Int
                    | TokenKind::Float
                    | TokenKind::String
                    | TokenKind::Backtick
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::True
                    | TokenKind::False
            )
        )
    }

    fn read_identifier(&mut self, position: Position) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
        let full = &self.input[start..self.pos];

        let name = match full.find('.') {
            Some(dot) if !QUALIFIED_NAMES.contains(&full) => &full[..dot],
            _ => full,
        };
        if name.len() < full.len() {
            // Rewind past the dot and everything after it.
            self.pos = start;
            self.column = position.column;
            for _ in 0..name.chars().count() {
                self.consume_char();
            }
        }

        Token::new(lookup_keyword(name), name, position)
    }

    fn read_number(&mut self, position: Position) -> Token {
        let start = self.pos;

        if self.peek_char() == Some('0')
            && matches!(self.peek_next_char(), Some('x') | Some('b'))
        {
            self.consume_char();
            self.consume_char();
            self.consume_while(|c| c.is_ascii_alphanumeric());
            return Token::new(TokenKind::Int, &self.input[start..self.pos], position);
        }

        self.consume_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::Int;
        if self.peek_char() == Some('.')
            && self.peek_next_char().is_some_and(|c| c.is_ascii_digit())
        {
            kind = TokenKind::Float;
            self.consume_char();
            self.consume_while(|c| c.is_ascii_digit());
        }
        Token::new(kind, &self.input[start..self.pos], position)
    }

    fn read_string(&mut self, position: Position) -> Token {
        self.consume_char(); // opening quote
        let mut value = String::new();
        loop {
            match self.consume_char() {
                Some('"') => return Token::new(TokenKind::String, value, position),
                Some('\\') => match self.consume_char() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some(other) => value.push(other),
                    None => return Token::new(TokenKind::Illegal, value, position),
                },
                Some(ch) => value.push(ch),
                None => return Token::new(TokenKind::Illegal, value, position),
            }
        }
    }

    fn read_backtick(&mut self, position: Position) -> Token {
        self.consume_char(); // opening backtick
        let start = self.pos;
        self.consume_while(|c| c != '`');
        let value = &self.input[start..self.pos];
        match self.consume_char() {
            Some('`') => Token::new(TokenKind::Backtick, value, position),
            _ => Token::new(TokenKind::Illegal, value, position),
        }
    }

    /// Reads the body of a `/.../` literal; the leading slash has already been
    /// consumed. A `\/` escape produces a literal slash in the body.
    fn read_regexp(&mut self, position: Position) -> Token {
        let mut value = String::new();
        loop {
            match self.consume_char() {
                Some('/') => return Token::new(TokenKind::Regexp, value, position),
                Some('\\') => match self.consume_char() {
                    Some('/') => value.push('/'),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Token::new(TokenKind::Illegal, value, position),
                },
                Some(ch) => value.push(ch),
                None => return Token::new(TokenKind::Illegal, value, position),
            }
        }
    }

    fn consume_while<P>(&mut self, keep: P)
    where
        P: Fn(char) -> bool,
    {
        while let Some(c) = self.peek_char() {
            if !keep(c) {
                break;
            }
            self.consume_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

/// Drains the whole input, including the trailing EOF token.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    fn literals(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .into_iter()
            .map(|t| (t.kind, t.literal))
            .collect()
    }

    #[test]
    fn lexes_simple_program() {
        use TokenKind::*;
        let input = indoc! {r#"
            let five = 5;
            let add = fn(x, y) { x + y; };
        "#};
        let expected = vec![
            Let, Ident, Assign, Int, Semicolon, Let, Ident, Assign, Function, LParen, Ident,
            Comma, Ident, RParen, LBrace, Ident, Plus, Ident, Semicolon, RBrace, Semicolon, Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn greedy_multi_char_operators() {
        use TokenKind::*;
        let input = "== != <= >= && || ++ -- += -= *= /= ** .. ~= !~";
        let expected = vec![
            Eq, NotEq, LtEquals, GtEquals, And, Or, PlusPlus, MinusMinus, PlusEquals,
            MinusEquals, AsteriskEquals, SlashEquals, Pow, DotDot, Contains, NotContains, Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn skips_line_comments() {
        let input = indoc! {"
            // leading comment
            let a = 1; // trailing comment
            // only comment
        "};
        use TokenKind::*;
        assert_eq!(kinds(input), vec![Let, Ident, Assign, Int, Semicolon, Eof]);
    }

    #[test]
    fn number_literals_keep_their_text() {
        let tokens = literals("10 0x1f 0b101 3.14 1..5");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Int, "10".to_string()),
                (TokenKind::Int, "0x1f".to_string()),
                (TokenKind::Int, "0b101".to_string()),
                (TokenKind::Float, "3.14".to_string()),
                (TokenKind::Int, "1".to_string()),
                (TokenKind::DotDot, "..".to_string()),
                (TokenKind::Int, "5".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn string_escapes_are_processed() {
        let tokens = literals(r#""a\tb\n\"c\\""#);
        assert_eq!(tokens[0], (TokenKind::String, "a\tb\n\"c\\".to_string()));
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let tokens = tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
    }

    #[test]
    fn backtick_is_verbatim() {
        let tokens = literals("`ls -l | wc`");
        assert_eq!(tokens[0], (TokenKind::Backtick, "ls -l | wc".to_string()));
    }

    #[test]
    fn slash_is_division_after_an_operand() {
        use TokenKind::*;
        assert_eq!(kinds("a / b"), vec![Ident, Slash, Ident, Eof]);
        assert_eq!(kinds("10 / 2"), vec![Int, Slash, Int, Eof]);
        assert_eq!(kinds("(a) / 2"), vec![LParen, Ident, RParen, Slash, Int, Eof]);
    }

    #[test]
    fn slash_starts_a_regexp_elsewhere() {
        let tokens = literals(r#"if (name ~= /^steve$/) { }"#);
        assert!(tokens
            .iter()
            .any(|t| *t == (TokenKind::Regexp, "^steve$".to_string())));

        let tokens = literals(r"/(?i)cake\/pie/");
        assert_eq!(tokens[0], (TokenKind::Regexp, "(?i)cake/pie".to_string()));
    }

    #[test]
    fn unterminated_regexp_is_illegal() {
        let tokens = tokenize("x ~= /abc");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Illegal));
    }

    #[test]
    fn qualified_builtin_names_stay_whole() {
        let tokens = literals("math.sqrt(9)");
        assert_eq!(tokens[0], (TokenKind::Ident, "math.sqrt".to_string()));

        let tokens = literals("os.getenv(\"HOME\")");
        assert_eq!(tokens[0], (TokenKind::Ident, "os.getenv".to_string()));
    }

    #[test]
    fn unknown_dotted_names_split_into_method_calls() {
        use TokenKind::*;
        let input = "name.upper()";
        assert_eq!(
            kinds(input),
            vec![Ident, Period, Ident, LParen, RParen, Eof]
        );
        let tokens = literals(input);
        assert_eq!(tokens[0].1, "name");
        assert_eq!(tokens[2].1, "upper");
    }

    #[test]
    fn keywords_are_case_sensitive() {
        let tokens = literals("let LET Let");
        assert_eq!(tokens[0].0, TokenKind::Let);
        assert_eq!(tokens[1], (TokenKind::Ident, "LET".to_string()));
        assert_eq!(tokens[2], (TokenKind::Ident, "Let".to_string()));
    }

    #[test]
    fn stray_characters_are_illegal_not_fatal() {
        use TokenKind::*;
        assert_eq!(kinds("a @ b"), vec![Ident, Illegal, Ident, Eof]);
        assert_eq!(kinds("a & b"), vec![Ident, Illegal, Ident, Eof]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("let x = 1;\n  x = 2;");
        let second_x = &tokens[5];
        assert_eq!(second_x.literal, "x");
        assert_eq!(second_x.position.line, 2);
        assert_eq!(second_x.position.column, 3);
    }

    #[test]
    fn rejoining_literals_preserves_program_tokens() {
        let input = r#"let x = 10; if (x >= 2) { puts("big"); }"#;
        let rejoined = tokenize(input)
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| match t.kind {
                TokenKind::String => format!("{:?}", t.literal),
                _ => t.literal.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        let original = kinds(input);
        assert_eq!(kinds(&rejoined), original);
    }
}
