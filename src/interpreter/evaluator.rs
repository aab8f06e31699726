//! Recursive AST walk.
//!
//! Two sentinel values drive non-local control flow: `Value::Error`
//! short-circuits out of every construct unchanged, and `Value::Return`
//! unwinds until a function-call boundary (or the top level) unwraps it.

use std::collections::BTreeMap;
use std::process::Command;
use std::rc::Rc;

use crate::ast::{BlockStatement, Expression, Identifier, Program, Statement};
use crate::interpreter::Interpreter;
use crate::runtime::environment::AssignOutcome;
use crate::runtime::value::{Builtin, FunctionValue, HashKey};
use crate::runtime::{Env, Environment, Value};
use crate::token::{Token, TokenKind};

pub(super) fn eval_program(interp: &mut Interpreter, program: &Program, env: &Env) -> Value {
    let mut result = Value::Null;
    for statement in &program.statements {
        match eval_statement(interp, statement, env) {
            Value::Return(inner) => return *inner,
            error @ Value::Error(_) => return error,
            value => result = value,
        }
    }
    result
}

fn eval_statement(interp: &mut Interpreter, statement: &Statement, env: &Env) -> Value {
    match statement {
        Statement::Let { name, value, .. } => {
            let value = eval_expression(interp, value, env);
            if value.is_error() {
                return value;
            }
            match env.borrow_mut().declare(&name.value, value) {
                Ok(()) => Value::Null,
                Err(()) => Value::error_at(
                    &name.token,
                    format!("cannot redeclare constant {}", name.value),
                ),
            }
        }
        Statement::Const { name, value, .. } => {
            let value = eval_expression(interp, value, env);
            if value.is_error() {
                return value;
            }
            match env.borrow_mut().declare_const(&name.value, value) {
                Ok(()) => Value::Null,
                Err(()) => Value::error_at(
                    &name.token,
                    format!("cannot redeclare constant {}", name.value),
                ),
            }
        }
        Statement::Return { value, .. } => {
            let value = eval_expression(interp, value, env);
            if value.is_error() {
                return value;
            }
            Value::Return(Box::new(value))
        }
        Statement::Expression { expression, .. } => eval_expression(interp, expression, env),
    }
}

/// Blocks pass both sentinels through without unwrapping them.
fn eval_block(interp: &mut Interpreter, block: &BlockStatement, env: &Env) -> Value {
    let mut result = Value::Null;
    for statement in &block.statements {
        result = eval_statement(interp, statement, env);
        if matches!(result, Value::Return(_) | Value::Error(_)) {
            return result;
        }
    }
    result
}

fn eval_expression(interp: &mut Interpreter, expression: &Expression, env: &Env) -> Value {
    match expression {
        Expression::Identifier(ident) => eval_identifier(interp, ident, env),
        Expression::IntegerLiteral { value, .. } => Value::Integer(*value),
        Expression::FloatLiteral { value, .. } => Value::Float(*value),
        Expression::BooleanLiteral { value, .. } => Value::Boolean(*value),
        Expression::StringLiteral { value, .. } => Value::String(value.clone()),
        Expression::BacktickLiteral { token, value } => eval_backtick(token, value),
        // There is no regexp variant in the value universe: a regexp literal
        // evaluates to its canonical pattern string, which `~=`, `!~` and
        // `match` compile on use.
        Expression::RegexpLiteral { pattern, flags, .. } => {
            if flags.is_empty() {
                Value::String(pattern.clone())
            } else {
                Value::String(format!("(?{flags}){pattern}"))
            }
        }
        Expression::ArrayLiteral { elements, .. } => {
            match eval_expressions(interp, elements, env) {
                Ok(elements) => Value::array(elements),
                Err(error) => error,
            }
        }
        Expression::HashLiteral { token, pairs } => eval_hash_literal(interp, token, pairs, env),
        Expression::Prefix {
            token,
            operator,
            right,
        } => {
            let right = eval_expression(interp, right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix(token, *operator, right)
        }
        Expression::Postfix { token, operator } => eval_postfix(token, *operator, env),
        Expression::Infix {
            token,
            operator,
            left,
            right,
        } => {
            let left_value = eval_expression(interp, left, env);
            if left_value.is_error() {
                return left_value;
            }
            // && and || short-circuit on the left operand's truthiness and
            // yield the deciding operand, not a coerced boolean.
            match operator {
                TokenKind::And => {
                    if !left_value.is_truthy() {
                        return left_value;
                    }
                    return eval_expression(interp, right, env);
                }
                TokenKind::Or => {
                    if left_value.is_truthy() {
                        return left_value;
                    }
                    return eval_expression(interp, right, env);
                }
                _ => {}
            }
            let right_value = eval_expression(interp, right, env);
            if right_value.is_error() {
                return right_value;
            }
            eval_infix(token, *operator, left_value, right_value)
        }
        Expression::Assign {
            token,
            operator,
            name,
            value,
        } => eval_assign(interp, token, *operator, name, value, env),
        Expression::Index { token, left, index } => {
            let left = eval_expression(interp, left, env);
            if left.is_error() {
                return left;
            }
            let index = eval_expression(interp, index, env);
            if index.is_error() {
                return index;
            }
            eval_index(token, left, index)
        }
        Expression::Call {
            token,
            function,
            arguments,
        } => {
            let function = eval_expression(interp, function, env);
            if function.is_error() {
                return function;
            }
            let arguments = match eval_expressions(interp, arguments, env) {
                Ok(arguments) => arguments,
                Err(error) => return error,
            };
            apply_function(interp, token, function, arguments, env)
        }
        Expression::ObjectCall {
            token,
            object,
            call,
        } => eval_object_call(interp, token, object, call, env),
        Expression::If {
            condition,
            consequence,
            alternative,
            ..
        } => {
            let condition = eval_expression(interp, condition, env);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                eval_block(interp, consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(interp, alternative, env)
            } else {
                Value::Null
            }
        }
        Expression::Ternary {
            condition,
            if_true,
            if_false,
            ..
        } => {
            let condition = eval_expression(interp, condition, env);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                eval_expression(interp, if_true, env)
            } else {
                eval_expression(interp, if_false, env)
            }
        }
        Expression::ForLoop {
            condition, body, ..
        } => loop {
            let condition = eval_expression(interp, condition, env);
            if condition.is_error() {
                return condition;
            }
            if !condition.is_truthy() {
                return Value::Null;
            }
            let result = eval_block(interp, body, env);
            if matches!(result, Value::Return(_) | Value::Error(_)) {
                return result;
            }
        },
        Expression::Foreach {
            token,
            index,
            ident,
            value,
            body,
        } => eval_foreach(interp, token, index.as_deref(), ident, value, body, env),
        Expression::Switch {
            value, choices, ..
        } => {
            let subject = eval_expression(interp, value, env);
            if subject.is_error() {
                return subject;
            }
            for choice in choices.iter().filter(|choice| !choice.default) {
                for candidate in &choice.expressions {
                    let candidate = eval_expression(interp, candidate, env);
                    if candidate.is_error() {
                        return candidate;
                    }
                    if candidate.loosely_equals(&subject) {
                        return eval_block(interp, &choice.body, env);
                    }
                }
            }
            match choices.iter().find(|choice| choice.default) {
                Some(choice) => eval_block(interp, &choice.body, env),
                None => Value::Null,
            }
        }
        Expression::FunctionLiteral {
            parameters,
            defaults,
            body,
            ..
        } => Value::Function(Rc::new(FunctionValue {
            parameters: parameters.clone(),
            defaults: defaults.clone(),
            body: body.clone(),
            env: env.clone(),
        })),
        Expression::FunctionDefine {
            name,
            parameters,
            defaults,
            body,
            ..
        } => {
            let function = Value::Function(Rc::new(FunctionValue {
                parameters: parameters.clone(),
                defaults: defaults.clone(),
                body: body.clone(),
                env: env.clone(),
            }));
            match env.borrow_mut().declare(&name.value, function.clone()) {
                Ok(()) => function,
                Err(()) => Value::error_at(
                    &name.token,
                    format!("cannot redeclare constant {}", name.value),
                ),
            }
        }
    }
}

fn eval_identifier(interp: &mut Interpreter, ident: &Identifier, env: &Env) -> Value {
    if let Some(value) = env.borrow().get(&ident.value) {
        return value;
    }
    if let Some(func) = interp.builtin(&ident.value) {
        return Value::Builtin(Rc::new(Builtin {
            name: ident.value.clone(),
            func,
        }));
    }
    Value::error_at(
        &ident.token,
        format!("identifier not found: {}", ident.value),
    )
}

fn eval_expressions(
    interp: &mut Interpreter,
    expressions: &[Expression],
    env: &Env,
) -> Result<Vec<Value>, Value> {
    let mut values = Vec::with_capacity(expressions.len());
    for expression in expressions {
        let value = eval_expression(interp, expression, env);
        if value.is_error() {
            return Err(value);
        }
        values.push(value);
    }
    Ok(values)
}

fn eval_hash_literal(
    interp: &mut Interpreter,
    token: &Token,
    pairs: &[(Expression, Expression)],
    env: &Env,
) -> Value {
    let mut map = BTreeMap::new();
    for (key_expression, value_expression) in pairs {
        let key = eval_expression(interp, key_expression, env);
        if key.is_error() {
            return key;
        }
        let Some(key) = HashKey::from_value(&key) else {
            return Value::error_at(
                token,
                format!("unusable as hash key: {}", key.type_name()),
            );
        };
        let value = eval_expression(interp, value_expression, env);
        if value.is_error() {
            return value;
        }
        map.insert(key, value);
    }
    Value::hash(map)
}

fn eval_prefix(token: &Token, operator: TokenKind, right: Value) -> Value {
    match operator {
        TokenKind::Bang => Value::Boolean(!right.is_truthy()),
        TokenKind::Minus => match right {
            Value::Integer(n) => Value::Integer(n.wrapping_neg()),
            Value::Float(n) => Value::Float(-n),
            other => Value::error_at(
                token,
                format!("unknown operator: -{}", other.type_name()),
            ),
        },
        other => Value::error_at(
            token,
            format!("unknown prefix operator: {}", other.literal()),
        ),
    }
}

/// `x++` / `x--`: the operand is the token captured from before the
/// operator. The binding is updated in place; the expression evaluates to
/// the value before the update.
fn eval_postfix(token: &Token, operator: TokenKind, env: &Env) -> Value {
    let name = token.literal.as_str();
    let current = match env.borrow().get(name) {
        Some(value) => value,
        None => {
            return Value::error_at(token, format!("identifier not found: {name}"));
        }
    };
    let Value::Integer(n) = current else {
        return Value::error_at(
            token,
            format!(
                "unknown operator: {}{}",
                current.type_name(),
                operator.literal()
            ),
        );
    };
    let updated = match operator {
        TokenKind::PlusPlus => n.wrapping_add(1),
        _ => n.wrapping_sub(1),
    };
    match Environment::assign(env, name, Value::Integer(updated)) {
        AssignOutcome::Constant => {
            Value::error_at(token, format!("cannot assign to constant {name}"))
        }
        _ => Value::Integer(n),
    }
}

fn eval_assign(
    interp: &mut Interpreter,
    token: &Token,
    operator: TokenKind,
    name: &Identifier,
    value: &Expression,
    env: &Env,
) -> Value {
    let value = eval_expression(interp, value, env);
    if value.is_error() {
        return value;
    }

    // Compound forms desugar to `name = name <op> value`.
    let combined = match operator {
        TokenKind::Assign => value,
        _ => {
            let current = match env.borrow().get(&name.value) {
                Some(current) => current,
                None => {
                    return Value::error_at(
                        token,
                        format!("identifier not found: {}", name.value),
                    );
                }
            };
            let base = match operator {
                TokenKind::PlusEquals => TokenKind::Plus,
                TokenKind::MinusEquals => TokenKind::Minus,
                TokenKind::AsteriskEquals => TokenKind::Asterisk,
                _ => TokenKind::Slash,
            };
            let combined = eval_infix(token, base, current, value);
            if combined.is_error() {
                return combined;
            }
            combined
        }
    };

    match Environment::assign(env, &name.value, combined.clone()) {
        AssignOutcome::Constant => Value::error_at(
            token,
            format!("cannot assign to constant {}", name.value),
        ),
        _ => combined,
    }
}

fn eval_infix(token: &Token, operator: TokenKind, left: Value, right: Value) -> Value {
    use TokenKind::*;
    match operator {
        Eq => Value::Boolean(left.loosely_equals(&right)),
        NotEq => Value::Boolean(!left.loosely_equals(&right)),
        Contains => eval_regex_match(token, &left, &right, false),
        NotContains => eval_regex_match(token, &left, &right, true),
        Plus | Minus | Asterisk | Slash | Mod | Pow => {
            eval_arithmetic(token, operator, left, right)
        }
        Lt | Gt | LtEquals | GtEquals => eval_comparison(token, operator, left, right),
        DotDot => match (&left, &right) {
            (Value::Integer(low), Value::Integer(high)) => {
                let elements = (*low..=*high).map(Value::Integer).collect();
                Value::array(elements)
            }
            _ => Value::error_at(
                token,
                format!(
                    "unknown operator: {} .. {}",
                    left.type_name(),
                    right.type_name()
                ),
            ),
        },
        other => Value::error_at(
            token,
            format!("unknown operator: {}", other.literal()),
        ),
    }
}

fn eval_arithmetic(token: &Token, operator: TokenKind, left: Value, right: Value) -> Value {
    use TokenKind::*;
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            match operator {
                Plus => Value::Integer(a.wrapping_add(b)),
                Minus => Value::Integer(a.wrapping_sub(b)),
                Asterisk => Value::Integer(a.wrapping_mul(b)),
                Slash => {
                    if b == 0 {
                        return Value::error_at(token, "division by zero");
                    }
                    // i64::MIN / -1 errors instead of flipping sign.
                    match a.checked_div(b) {
                        Some(quotient) => Value::Integer(quotient),
                        None => Value::error_at(token, "integer overflow"),
                    }
                }
                Mod => {
                    if b == 0 {
                        return Value::error_at(token, "modulo by zero");
                    }
                    match a.checked_rem(b) {
                        Some(remainder) => Value::Integer(remainder),
                        None => Value::error_at(token, "integer overflow"),
                    }
                }
                _ => {
                    // Integer exponentiation stays integral.
                    let Ok(exponent) = u32::try_from(b) else {
                        return Value::error_at(token, "negative exponent");
                    };
                    match a.checked_pow(exponent) {
                        Some(power) => Value::Integer(power),
                        None => Value::error_at(token, "integer overflow"),
                    }
                }
            }
        }
        (Value::String(a), Value::String(b)) if operator == Plus => {
            Value::String(format!("{a}{b}"))
        }
        // String repetition works with the operands in either order.
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s))
            if operator == Asterisk =>
        {
            let count = usize::try_from(*n).unwrap_or(0);
            Value::String(s.repeat(count))
        }
        _ => match numeric_pair(&left, &right) {
            Some((a, b)) => match operator {
                Plus => Value::Float(a + b),
                Minus => Value::Float(a - b),
                Asterisk => Value::Float(a * b),
                Slash => Value::Float(a / b),
                Mod => Value::Float(a % b),
                _ => Value::Float(a.powf(b)),
            },
            None => mismatch_error(token, operator, &left, &right),
        },
    }
}

fn eval_comparison(token: &Token, operator: TokenKind, left: Value, right: Value) -> Value {
    use TokenKind::*;
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Value::Boolean(match operator {
            Lt => a < b,
            Gt => a > b,
            LtEquals => a <= b,
            _ => a >= b,
        });
    }
    match numeric_pair(&left, &right) {
        Some((a, b)) => Value::Boolean(match operator {
            Lt => a < b,
            Gt => a > b,
            LtEquals => a <= b,
            _ => a >= b,
        }),
        None => mismatch_error(token, operator, &left, &right),
    }
}

fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let promote = |value: &Value| match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    };
    Some((promote(left)?, promote(right)?))
}

fn mismatch_error(token: &Token, operator: TokenKind, left: &Value, right: &Value) -> Value {
    let (l, r) = (left.type_name(), right.type_name());
    if l != r {
        Value::error_at(
            token,
            format!("type mismatch: {l} {} {r}", operator.literal()),
        )
    } else {
        Value::error_at(
            token,
            format!("unknown operator: {l} {} {r}", operator.literal()),
        )
    }
}

/// `subject ~= pattern` / `subject !~ pattern`. The pattern side is a string
/// (regexp literals evaluate to their pattern string, flags inlined).
fn eval_regex_match(token: &Token, left: &Value, right: &Value, negate: bool) -> Value {
    let Value::String(subject) = left else {
        return Value::error_at(
            token,
            format!("regexp match requires a string subject, got {}", left.type_name()),
        );
    };
    let Value::String(pattern) = right else {
        return Value::error_at(
            token,
            format!("regexp match requires a string pattern, got {}", right.type_name()),
        );
    };
    match regex::Regex::new(pattern) {
        Ok(compiled) => {
            let matched = compiled.is_match(subject);
            Value::Boolean(matched != negate)
        }
        Err(error) => Value::error_at(token, format!("invalid regular expression: {error}")),
    }
}

fn eval_index(token: &Token, left: Value, index: Value) -> Value {
    match (&left, &index) {
        (Value::Array(elements), Value::Integer(i)) => match usize::try_from(*i) {
            Ok(i) => elements.get(i).cloned().unwrap_or(Value::Null),
            Err(_) => Value::Null,
        },
        (Value::Array(_), other) => Value::error_at(
            token,
            format!("array index must be an integer, got {}", other.type_name()),
        ),
        (Value::Hash(pairs), key) => match HashKey::from_value(key) {
            Some(key) => pairs.get(&key).cloned().unwrap_or(Value::Null),
            None => Value::error_at(
                token,
                format!("unusable as hash key: {}", key.type_name()),
            ),
        },
        (Value::String(s), Value::Integer(i)) => match usize::try_from(*i) {
            Ok(i) => s
                .chars()
                .nth(i)
                .map(|ch| Value::String(ch.to_string()))
                .unwrap_or(Value::Null),
            Err(_) => Value::Null,
        },
        (Value::String(_), other) => Value::error_at(
            token,
            format!("string index must be an integer, got {}", other.type_name()),
        ),
        _ => Value::error_at(
            token,
            format!("index operator not supported: {}", left.type_name()),
        ),
    }
}

pub(super) fn apply_function(
    interp: &mut Interpreter,
    token: &Token,
    function: Value,
    arguments: Vec<Value>,
    env: &Env,
) -> Value {
    match function {
        Value::Function(function) => {
            if arguments.len() > function.parameters.len() {
                return Value::error_at(
                    token,
                    format!(
                        "too many arguments. got={}, want={}",
                        arguments.len(),
                        function.parameters.len()
                    ),
                );
            }
            // Fresh frame over the *definition-time* environment.
            let frame = Environment::new_enclosed(&function.env);
            for (position, parameter) in function.parameters.iter().enumerate() {
                if let Some(argument) = arguments.get(position) {
                    let _ = frame.borrow_mut().declare(&parameter.value, argument.clone());
                    continue;
                }
                // Defaults are evaluated in the callee frame in declaration
                // order, so later defaults can reference earlier parameters.
                let Some(default) = function.defaults.get(&parameter.value) else {
                    return Value::error_at(
                        token,
                        format!("missing argument: {}", parameter.value),
                    );
                };
                let default = eval_expression(interp, default, &frame);
                if default.is_error() {
                    return default;
                }
                let _ = frame.borrow_mut().declare(&parameter.value, default);
            }
            match eval_block(interp, &function.body, &frame) {
                Value::Return(inner) => *inner,
                other => other,
            }
        }
        Value::Builtin(builtin) => (builtin.func)(interp, token, env, arguments),
        other => Value::error_at(
            token,
            format!("not a function: {}", other.type_name()),
        ),
    }
}

/// `receiver.method(args...)`: type handler first, then a user-registered
/// `<typename>.<method>` function with the receiver prepended.
fn eval_object_call(
    interp: &mut Interpreter,
    token: &Token,
    object: &Expression,
    call: &Expression,
    env: &Env,
) -> Value {
    let Expression::Call {
        function,
        arguments,
        ..
    } = call
    else {
        return Value::error_at(token, "malformed method call");
    };
    let Expression::Identifier(method) = function.as_ref() else {
        return Value::error_at(token, "method name must be an identifier");
    };

    // Qualified built-ins (`math . sqrt(2)` written with a stray dot) resolve
    // by the concatenated identifier, provided nothing shadows the left side.
    if let Expression::Identifier(prefix) = object {
        let qualified = format!("{}.{}", prefix.value, method.value);
        if env.borrow().get(&prefix.value).is_none() {
            if let Some(func) = interp.builtin(&qualified) {
                let arguments = match eval_expressions(interp, arguments, env) {
                    Ok(arguments) => arguments,
                    Err(error) => return error,
                };
                return (func)(interp, token, env, arguments);
            }
        }
    }

    let receiver = eval_expression(interp, object, env);
    if receiver.is_error() {
        return receiver;
    }
    let arguments = match eval_expressions(interp, arguments, env) {
        Ok(arguments) => arguments,
        Err(error) => return error,
    };

    if let Some(result) = receiver.invoke_method(&method.value, token, env, &arguments) {
        return result;
    }

    let qualified = format!("{}.{}", receiver.type_name(), method.value);
    if let Some(function) = env.borrow().get(&qualified) {
        let mut with_receiver = Vec::with_capacity(arguments.len() + 1);
        with_receiver.push(receiver);
        with_receiver.extend(arguments);
        return apply_function(interp, token, function, with_receiver, env);
    }

    Value::error_at(
        token,
        format!(
            "failed to invoke method: {} on {}",
            method.value,
            receiver.type_name()
        ),
    )
}

fn eval_foreach(
    interp: &mut Interpreter,
    token: &Token,
    index: Option<&str>,
    ident: &str,
    value: &Expression,
    body: &BlockStatement,
    env: &Env,
) -> Value {
    let iterable = eval_expression(interp, value, env);
    if iterable.is_error() {
        return iterable;
    }

    let items: Vec<(Value, Value)> = match &iterable {
        Value::Array(elements) => elements
            .iter()
            .enumerate()
            .map(|(i, element)| (Value::Integer(i as i64), element.clone()))
            .collect(),
        Value::Hash(pairs) => pairs
            .iter()
            .map(|(key, value)| (key.to_value(), value.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, ch)| (Value::Integer(i as i64), Value::String(ch.to_string())))
            .collect(),
        other => {
            return Value::error_at(
                token,
                format!("foreach is not supported over {}", other.type_name()),
            );
        }
    };

    let mut permitted: Vec<String> = Vec::with_capacity(2);
    if let Some(index) = index {
        permitted.push(index.to_string());
    }
    permitted.push(ident.to_string());

    for (key, value) in items {
        // A fresh frame per iteration; only the loop variables bind locally.
        let scope = Environment::new_temporary_scope(env, permitted.clone());
        if let Some(index) = index {
            Environment::set(&scope, index, key);
        }
        Environment::set(&scope, ident, value);
        let result = eval_block(interp, body, &scope);
        if matches!(result, Value::Return(_) | Value::Error(_)) {
            return result;
        }
    }
    Value::Null
}

/// Backtick literals shell out via `sh -c`, blocking until the child exits,
/// and yield a hash with the captured `stdout` and `stderr`.
fn eval_backtick(token: &Token, command: &str) -> Value {
    match Command::new("sh").arg("-c").arg(command).output() {
        Ok(output) => {
            let mut pairs = BTreeMap::new();
            pairs.insert(
                HashKey::String("stdout".to_string()),
                Value::String(String::from_utf8_lossy(&output.stdout).into_owned()),
            );
            pairs.insert(
                HashKey::String("stderr".to_string()),
                Value::String(String::from_utf8_lossy(&output.stderr).into_owned()),
            );
            Value::hash(pairs)
        }
        Err(error) => Value::error_at(token, format!("failed to run command: {error}")),
    }
}
