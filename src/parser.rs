//! Pratt parser turning the token stream into a syntax tree.
//!
//! The parser keeps a three-token window (previous/current/lookahead) and
//! dispatches on the current token kind through three fixed handler tables:
//! postfix first, then prefix, then infix handlers while the lookahead binds
//! tighter than the caller. Errors are accumulated rather than raised; the
//! host inspects [`Parser::errors`] after parsing and aborts before
//! evaluation when any are present.

pub mod ast;

use std::collections::HashMap;

use thiserror::Error;

use crate::lexer::Lexer;
use crate::parser::ast::{
    BlockStatement, CaseArm, Expression, Identifier, Program, Statement,
};
use crate::token::{Position, Precedence, Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at {position}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

type PrefixFn<'a> = fn(&mut Parser<'a>) -> Option<Expression>;
type InfixFn<'a> = fn(&mut Parser<'a>, Expression) -> Option<Expression>;
type PostfixFn<'a> = fn(&mut Parser<'a>) -> Option<Expression>;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    // Previous token, kept for postfix expressions (`x++`, `x--`).
    prev_token: Token,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,
    // Set while parsing a ternary; nested ternary expressions are illegal.
    tern: bool,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        let mut parser = Self {
            lexer,
            prev_token: Token::default(),
            cur_token: Token::default(),
            peek_token: Token::default(),
            errors: Vec::new(),
            tern: false,
        };
        // Prime current and lookahead.
        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while self.cur_token.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            }
            self.next_token();
        }
        program
    }

    fn next_token(&mut self) {
        self.prev_token = std::mem::replace(
            &mut self.cur_token,
            std::mem::replace(&mut self.peek_token, self.lexer.next_token()),
        );
    }

    fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(ParseError {
            message: message.into(),
            position: self.cur_token.position,
        });
    }

    fn cur_token_is(&self, kind: TokenKind) -> bool {
        self.cur_token.kind == kind
    }

    fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek_token.kind == kind
    }

    /// Advances when the lookahead has the expected kind, records an error
    /// otherwise.
    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_token_is(kind) {
            self.next_token();
            return true;
        }
        self.add_error(format!(
            "expected next token to be {}, got {} instead",
            kind.literal(),
            self.peek_token.literal
        ));
        false
    }

    // ---- statements -----------------------------------------------------

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Const => self.parse_const_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.swallow_until_semicolon("unterminated let statement")?;
        Some(Statement::Let { token, name, value })
    }

    fn parse_const_statement(&mut self) -> Option<Statement> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.swallow_until_semicolon("unterminated const statement")?;
        Some(Statement::Const { token, name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        let token = self.cur_token.clone();
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.swallow_until_semicolon("unterminated return statement")?;
        Some(Statement::Return { token, value })
    }

    /// `let`/`const`/`return` require a closing `;`; reaching EOF first is an
    /// error.
    fn swallow_until_semicolon(&mut self, diagnosis: &str) -> Option<()> {
        while !self.cur_token_is(TokenKind::Semicolon) {
            if self.cur_token_is(TokenKind::Eof) {
                self.add_error(diagnosis);
                return None;
            }
            self.next_token();
        }
        Some(())
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let token = self.cur_token.clone();
        let expression = self.parse_expression(Precedence::Lowest)?;
        while self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Statement::Expression { token, expression })
    }

    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        let token = self.cur_token.clone();
        let mut statements = Vec::new();
        self.next_token();
        while !self.cur_token_is(TokenKind::RBrace) {
            if self.cur_token_is(TokenKind::Eof) {
                self.add_error("unterminated block statement");
                return None;
            }
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }
        Some(BlockStatement { token, statements })
    }

    // ---- expression driver ----------------------------------------------

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        if let Some(postfix) = Self::postfix_fn(self.cur_token.kind) {
            return postfix(self);
        }
        let prefix = match Self::prefix_fn(self.cur_token.kind) {
            Some(prefix) => prefix,
            None => {
                let literal = self.cur_token.literal.clone();
                self.add_error(format!("no prefix parse function for '{literal}'"));
                return None;
            }
        };
        let mut left = prefix(self)?;

        while !self.peek_token_is(TokenKind::Semicolon)
            && precedence < self.peek_token.kind.precedence()
        {
            let infix = match Self::infix_fn(self.peek_token.kind) {
                Some(infix) => infix,
                None => return Some(left),
            };
            self.next_token();
            left = infix(self, left)?;
        }
        Some(left)
    }

    fn prefix_fn(kind: TokenKind) -> Option<PrefixFn<'a>> {
        match kind {
            TokenKind::Backtick => Some(Self::parse_backtick_literal),
            TokenKind::Bang | TokenKind::Minus => Some(Self::parse_prefix_expression),
            TokenKind::DefineFunction => Some(Self::parse_function_definition),
            TokenKind::Eof | TokenKind::Illegal => Some(Self::parse_broken),
            TokenKind::False | TokenKind::True => Some(Self::parse_boolean),
            TokenKind::Float => Some(Self::parse_float_literal),
            TokenKind::For => Some(Self::parse_for_loop),
            TokenKind::Foreach => Some(Self::parse_foreach),
            TokenKind::Function => Some(Self::parse_function_literal),
            TokenKind::Ident => Some(Self::parse_identifier),
            TokenKind::If => Some(Self::parse_if_expression),
            TokenKind::Int => Some(Self::parse_integer_literal),
            TokenKind::LBrace => Some(Self::parse_hash_literal),
            TokenKind::LBracket => Some(Self::parse_array_literal),
            TokenKind::LParen => Some(Self::parse_grouped_expression),
            TokenKind::Regexp => Some(Self::parse_regexp_literal),
            TokenKind::String => Some(Self::parse_string_literal),
            TokenKind::Switch => Some(Self::parse_switch_expression),
            _ => None,
        }
    }

    fn infix_fn(kind: TokenKind) -> Option<InfixFn<'a>> {
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Asterisk
            | TokenKind::Slash
            | TokenKind::Mod
            | TokenKind::Pow
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEquals
            | TokenKind::GtEquals
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Contains
            | TokenKind::NotContains
            | TokenKind::And
            | TokenKind::Or
            | TokenKind::DotDot => Some(Self::parse_infix_expression),
            TokenKind::Assign
            | TokenKind::PlusEquals
            | TokenKind::MinusEquals
            | TokenKind::AsteriskEquals
            | TokenKind::SlashEquals => Some(Self::parse_assign_expression),
            TokenKind::Question => Some(Self::parse_ternary_expression),
            TokenKind::LParen => Some(Self::parse_call_expression),
            TokenKind::LBracket => Some(Self::parse_index_expression),
            TokenKind::Period => Some(Self::parse_method_call_expression),
            _ => None,
        }
    }

    fn postfix_fn(kind: TokenKind) -> Option<PostfixFn<'a>> {
        match kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => Some(Self::parse_postfix_expression),
            _ => None,
        }
    }

    // ---- prefix handlers ------------------------------------------------

    /// Hit on EOF or an illegal token in expression position.
    fn parse_broken(&mut self) -> Option<Expression> {
        if self.cur_token_is(TokenKind::Eof) {
            self.add_error("unexpected end of input");
        } else {
            let literal = self.cur_token.literal.clone();
            self.add_error(format!("illegal token '{literal}'"));
        }
        None
    }

    fn current_identifier(&self) -> Identifier {
        Identifier {
            token: self.cur_token.clone(),
            value: self.cur_token.literal.clone(),
        }
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(self.current_identifier()))
    }

    fn parse_integer_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let literal = token.literal.as_str();
        let parsed = if let Some(hex) = literal.strip_prefix("0x") {
            i64::from_str_radix(hex, 16)
        } else if let Some(binary) = literal.strip_prefix("0b") {
            i64::from_str_radix(binary, 2)
        } else {
            literal.parse::<i64>()
        };
        match parsed {
            Ok(value) => Some(Expression::IntegerLiteral { token, value }),
            Err(_) => {
                self.add_error(format!("could not parse {literal:?} as integer"));
                None
            }
        }
    }

    fn parse_float_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        match token.literal.parse::<f64>() {
            Ok(value) => Some(Expression::FloatLiteral { token, value }),
            Err(_) => {
                let literal = token.literal;
                self.add_error(format!("could not parse {literal:?} as float"));
                None
            }
        }
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::BooleanLiteral {
            token: self.cur_token.clone(),
            value: self.cur_token_is(TokenKind::True),
        })
    }

    fn parse_string_literal(&mut self) -> Option<Expression> {
        Some(Expression::StringLiteral {
            token: self.cur_token.clone(),
            value: self.cur_token.literal.clone(),
        })
    }

    fn parse_backtick_literal(&mut self) -> Option<Expression> {
        Some(Expression::BacktickLiteral {
            token: self.cur_token.clone(),
            value: self.cur_token.literal.clone(),
        })
    }

    /// Splits a leading `(?flags)` group off the lexed regexp body.
    fn parse_regexp_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let mut pattern = token.literal.clone();
        let mut flags = String::new();
        if let Some(stripped) = pattern.strip_prefix("(?") {
            if let Some(close) = stripped.find(')') {
                flags = stripped[..close].to_string();
                pattern = stripped[close + 1..].to_string();
            }
        }
        Some(Expression::RegexpLiteral {
            token,
            pattern,
            flags,
        })
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let operator = token.kind;
        self.next_token();
        let right = Box::new(self.parse_expression(Precedence::Prefix)?);
        Some(Expression::Prefix {
            token,
            operator,
            right,
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expression::ArrayLiteral { token, elements })
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        let mut pairs = Vec::new();
        while !self.peek_token_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if !self.peek_token_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expression::HashLiteral { token, pairs })
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = Box::new(self.parse_expression(Precedence::Lowest)?);
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement()?;
        let mut alternative = None;
        if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            alternative = Some(self.parse_block_statement()?);
        }
        Some(Expression::If {
            token,
            condition,
            consequence,
            alternative,
        })
    }

    fn parse_for_loop(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let condition = Box::new(self.parse_expression(Precedence::Lowest)?);
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Expression::ForLoop {
            token,
            condition,
            body,
        })
    }

    /// `foreach v in iterable { ... }` or `foreach i, v in iterable { ... }`.
    fn parse_foreach(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        self.next_token();
        let mut index = None;
        let mut ident = self.cur_token.literal.clone();

        if self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            if !self.peek_token_is(TokenKind::Ident) {
                let got = self.peek_token.literal.clone();
                self.add_error(format!(
                    "second argument to foreach must be ident, got '{got}'"
                ));
                return None;
            }
            self.next_token();
            index = Some(ident);
            ident = self.cur_token.literal.clone();
        }

        if !self.expect_peek(TokenKind::In) {
            return None;
        }
        self.next_token();
        let value = Box::new(self.parse_expression(Precedence::Lowest)?);
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Expression::Foreach {
            token,
            index,
            ident,
            value,
            body,
        })
    }

    fn parse_switch_expression(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let value = Box::new(self.parse_expression(Precedence::Lowest)?);
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        self.next_token();

        let mut choices = Vec::new();
        while !self.cur_token_is(TokenKind::RBrace) {
            if self.cur_token_is(TokenKind::Eof) {
                self.add_error("unterminated switch statement");
                return None;
            }
            let arm_token = self.cur_token.clone();
            let mut default = false;
            let mut expressions = Vec::new();

            if self.cur_token_is(TokenKind::Default) {
                default = true;
            } else if self.cur_token_is(TokenKind::Case) {
                self.next_token();
                // `case default` is accepted as a default arm.
                if self.cur_token_is(TokenKind::Default) {
                    default = true;
                } else {
                    expressions.push(self.parse_expression(Precedence::Lowest)?);
                    while self.peek_token_is(TokenKind::Comma) {
                        self.next_token();
                        self.next_token();
                        expressions.push(self.parse_expression(Precedence::Lowest)?);
                    }
                }
            }

            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            let body = self.parse_block_statement()?;
            if !self.cur_token_is(TokenKind::RBrace) {
                self.add_error("expected case block to end with '}'");
                return None;
            }
            self.next_token();
            choices.push(CaseArm {
                token: arm_token,
                default,
                expressions,
                body,
            });
        }

        if choices.iter().filter(|choice| choice.default).count() > 1 {
            self.add_error("a switch-statement should only have one default block");
            return None;
        }
        Some(Expression::Switch {
            token,
            value,
            choices,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        let token = self.cur_token.clone();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let (defaults, parameters) = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Expression::FunctionLiteral {
            token,
            parameters,
            defaults,
            body,
        })
    }

    /// `function name(params) { body }`: like a function literal, but the
    /// evaluator also binds the name in the current environment.
    fn parse_function_definition(&mut self) -> Option<Expression> {
        self.next_token();
        let token = self.cur_token.clone();
        if token.kind != TokenKind::Ident {
            let literal = token.literal;
            self.add_error(format!(
                "expected function name to be IDENT, got '{literal}' instead"
            ));
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let (defaults, parameters) = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement()?;
        Some(Expression::FunctionDefine {
            token,
            name,
            parameters,
            defaults,
            body,
        })
    }

    fn parse_function_parameters(
        &mut self,
    ) -> Option<(HashMap<String, Expression>, Vec<Identifier>)> {
        let mut defaults = HashMap::new();
        let mut identifiers = Vec::new();

        if self.peek_token_is(TokenKind::RParen) {
            self.next_token();
            return Some((defaults, identifiers));
        }
        self.next_token();

        while !self.cur_token_is(TokenKind::RParen) {
            if self.cur_token_is(TokenKind::Eof) {
                self.add_error("unterminated function parameters");
                return None;
            }
            if !self.cur_token_is(TokenKind::Ident) {
                let literal = self.cur_token.literal.clone();
                self.add_error(format!(
                    "expected parameter name, got '{literal}' instead"
                ));
                return None;
            }
            let ident = self.current_identifier();
            identifiers.push(ident.clone());
            self.next_token();

            // `= expr` after the name supplies a default, evaluated at call
            // time in the callee's environment.
            if self.cur_token_is(TokenKind::Assign) {
                self.next_token();
                let default = self.parse_expression(Precedence::Lowest)?;
                defaults.insert(ident.value, default);
                self.next_token();
            }

            if self.cur_token_is(TokenKind::Comma) {
                self.next_token();
            }
        }

        Some((defaults, identifiers))
    }

    // ---- infix / postfix handlers ---------------------------------------

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        let operator = token.kind;
        let precedence = token.kind.precedence();
        self.next_token();
        let right = Box::new(self.parse_expression(precedence)?);
        Some(Expression::Infix {
            token,
            operator,
            left: Box::new(left),
            right,
        })
    }

    fn parse_assign_expression(&mut self, name: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        let name = match name {
            Expression::Identifier(ident) => ident,
            other => {
                self.add_error(format!(
                    "expected assign target to be IDENT, got '{other}' instead"
                ));
                return None;
            }
        };
        let operator = token.kind;
        self.next_token();
        let value = Box::new(self.parse_expression(Precedence::Lowest)?);
        Some(Expression::Assign {
            token,
            operator,
            name,
            value,
        })
    }

    fn parse_ternary_expression(&mut self, condition: Expression) -> Option<Expression> {
        if self.tern {
            self.add_error("nested ternary expressions are illegal");
            return None;
        }
        self.tern = true;
        let result = self.parse_ternary_branches(condition);
        self.tern = false;
        result
    }

    fn parse_ternary_branches(&mut self, condition: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        self.next_token(); // skip the '?'
        let precedence = self.cur_token.kind.precedence();
        let if_true = Box::new(self.parse_expression(precedence)?);
        if !self.expect_peek(TokenKind::Colon) {
            return None;
        }
        self.next_token();
        let if_false = Box::new(self.parse_expression(precedence)?);
        Some(Expression::Ternary {
            token,
            condition: Box::new(condition),
            if_true,
            if_false,
        })
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        self.next_token();
        let index = Box::new(self.parse_expression(Precedence::Lowest)?);
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expression::Index {
            token,
            left: Box::new(left),
            index,
        })
    }

    fn parse_method_call_expression(&mut self, object: Expression) -> Option<Expression> {
        let token = self.cur_token.clone();
        self.next_token();
        let name = self.parse_identifier()?;
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let call = Box::new(self.parse_call_expression(name)?);
        Some(Expression::ObjectCall {
            token,
            object: Box::new(object),
            call,
        })
    }

    /// `x++` / `x--`: consumes only the operator token; the operand is the
    /// previous token.
    fn parse_postfix_expression(&mut self) -> Option<Expression> {
        Some(Expression::Postfix {
            token: self.prev_token.clone(),
            operator: self.cur_token.kind,
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();
        if self.peek_token_is(end) {
            self.next_token();
            return Some(list);
        }
        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }
}

/// Parses a whole source string, returning the accumulated errors when any
/// part of it failed.
pub fn parse(input: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse_program();
    if parser.errors().is_empty() {
        Ok(program)
    } else {
        Err(parser.take_errors())
    }
}
