//! Syntax tree produced by the parser and walked by the interpreter.
//!
//! Every node keeps the token it was parsed from so evaluation errors can
//! name a source position. The `Display` impls render surface syntax that
//! parses back to a structurally identical tree.

use std::collections::HashMap;
use std::fmt;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Const {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Return {
        token: Token,
        value: Expression,
    },
    Expression {
        token: Token,
        expression: Expression,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub value: String,
}

/// One `case`/`default` arm of a switch expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub token: Token,
    pub default: bool,
    pub expressions: Vec<Expression>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    IntegerLiteral {
        token: Token,
        value: i64,
    },
    FloatLiteral {
        token: Token,
        value: f64,
    },
    BooleanLiteral {
        token: Token,
        value: bool,
    },
    StringLiteral {
        token: Token,
        value: String,
    },
    BacktickLiteral {
        token: Token,
        value: String,
    },
    RegexpLiteral {
        token: Token,
        pattern: String,
        flags: String,
    },
    ArrayLiteral {
        token: Token,
        elements: Vec<Expression>,
    },
    HashLiteral {
        token: Token,
        pairs: Vec<(Expression, Expression)>,
    },
    Prefix {
        token: Token,
        operator: TokenKind,
        right: Box<Expression>,
    },
    /// `x++` / `x--`; the token is the operand captured from the previous
    /// token, the operator is the only token this node consumed.
    Postfix {
        token: Token,
        operator: TokenKind,
    },
    Infix {
        token: Token,
        operator: TokenKind,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assign {
        token: Token,
        operator: TokenKind,
        name: Identifier,
        value: Box<Expression>,
    },
    Index {
        token: Token,
        left: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        token: Token,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ObjectCall {
        token: Token,
        object: Box<Expression>,
        call: Box<Expression>,
    },
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Ternary {
        token: Token,
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    ForLoop {
        token: Token,
        condition: Box<Expression>,
        body: BlockStatement,
    },
    Foreach {
        token: Token,
        index: Option<String>,
        ident: String,
        value: Box<Expression>,
        body: BlockStatement,
    },
    Switch {
        token: Token,
        value: Box<Expression>,
        choices: Vec<CaseArm>,
    },
    FunctionLiteral {
        token: Token,
        parameters: Vec<Identifier>,
        defaults: HashMap<String, Expression>,
        body: BlockStatement,
    },
    FunctionDefine {
        token: Token,
        name: Identifier,
        parameters: Vec<Identifier>,
        defaults: HashMap<String, Expression>,
        body: BlockStatement,
    },
}

impl Expression {
    /// The token this expression originated from.
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier(ident) => &ident.token,
            Expression::IntegerLiteral { token, .. }
            | Expression::FloatLiteral { token, .. }
            | Expression::BooleanLiteral { token, .. }
            | Expression::StringLiteral { token, .. }
            | Expression::BacktickLiteral { token, .. }
            | Expression::RegexpLiteral { token, .. }
            | Expression::ArrayLiteral { token, .. }
            | Expression::HashLiteral { token, .. }
            | Expression::Prefix { token, .. }
            | Expression::Postfix { token, .. }
            | Expression::Infix { token, .. }
            | Expression::Assign { token, .. }
            | Expression::Index { token, .. }
            | Expression::Call { token, .. }
            | Expression::ObjectCall { token, .. }
            | Expression::If { token, .. }
            | Expression::Ternary { token, .. }
            | Expression::ForLoop { token, .. }
            | Expression::Foreach { token, .. }
            | Expression::Switch { token, .. }
            | Expression::FunctionLiteral { token, .. }
            | Expression::FunctionDefine { token, .. } => token,
        }
    }
}

impl Statement {
    pub fn token(&self) -> &Token {
        match self {
            Statement::Let { token, .. }
            | Statement::Const { token, .. }
            | Statement::Return { token, .. }
            | Statement::Expression { token, .. } => token,
        }
    }
}

fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

fn format_parameters(
    parameters: &[Identifier],
    defaults: &HashMap<String, Expression>,
) -> String {
    parameters
        .iter()
        .map(|parameter| match defaults.get(&parameter.value) {
            Some(default) => format!("{} = {}", parameter.value, default),
            None => parameter.value.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.statements, " "))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value, .. } => write!(f, "let {} = {};", name.value, value),
            Statement::Const { name, value, .. } => {
                write!(f, "const {} = {};", name.value, value)
            }
            Statement::Return { value, .. } => write!(f, "return {};", value),
            Statement::Expression { expression, .. } => write!(f, "{};", expression),
        }
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} }}", join(&self.statements, " "))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl fmt::Display for CaseArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.default {
            write!(f, "default {}", self.body)
        } else {
            write!(f, "case {} {}", join(&self.expressions, ", "), self.body)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(ident) => f.write_str(&ident.value),
            Expression::IntegerLiteral { token, .. }
            | Expression::FloatLiteral { token, .. } => f.write_str(&token.literal),
            Expression::BooleanLiteral { value, .. } => write!(f, "{value}"),
            Expression::StringLiteral { value, .. } => {
                write!(f, "\"{}\"", escape_string(value))
            }
            Expression::BacktickLiteral { value, .. } => write!(f, "`{value}`"),
            Expression::RegexpLiteral { pattern, flags, .. } => {
                let body = pattern.replace('/', "\\/");
                if flags.is_empty() {
                    write!(f, "/{body}/")
                } else {
                    write!(f, "/(?{flags}){body}/")
                }
            }
            Expression::ArrayLiteral { elements, .. } => {
                write!(f, "[{}]", join(elements, ", "))
            }
            Expression::HashLiteral { pairs, .. } => {
                let rendered = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{rendered}}}")
            }
            Expression::Prefix {
                operator, right, ..
            } => write!(f, "({}{})", operator.literal(), right),
            Expression::Postfix { token, operator } => {
                write!(f, "{}{}", token.literal, operator.literal())
            }
            Expression::Infix {
                operator,
                left,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator.literal(), right),
            Expression::Assign {
                operator,
                name,
                value,
                ..
            } => write!(f, "{} {} {}", name.value, operator.literal(), value),
            Expression::Index { left, index, .. } => write!(f, "({left}[{index}])"),
            Expression::Call {
                function,
                arguments,
                ..
            } => write!(f, "{}({})", function, join(arguments, ", ")),
            Expression::ObjectCall { object, call, .. } => write!(f, "{object}.{call}"),
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if ({condition}) {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {alternative}")?;
                }
                Ok(())
            }
            Expression::Ternary {
                condition,
                if_true,
                if_false,
                ..
            } => write!(f, "({condition} ? {if_true} : {if_false})"),
            Expression::ForLoop {
                condition, body, ..
            } => write!(f, "for ({condition}) {body}"),
            Expression::Foreach {
                index,
                ident,
                value,
                body,
                ..
            } => {
                match index {
                    Some(index) => write!(f, "foreach {index}, {ident} in {value} {body}"),
                    None => write!(f, "foreach {ident} in {value} {body}"),
                }
            }
            Expression::Switch { value, choices, .. } => {
                write!(f, "switch ({value}) {{ {} }}", join(choices, " "))
            }
            Expression::FunctionLiteral {
                parameters,
                defaults,
                body,
                ..
            } => write!(f, "fn({}) {}", format_parameters(parameters, defaults), body),
            Expression::FunctionDefine {
                name,
                parameters,
                defaults,
                body,
                ..
            } => write!(
                f,
                "function {}({}) {}",
                name.value,
                format_parameters(parameters, defaults),
                body
            ),
        }
    }
}
