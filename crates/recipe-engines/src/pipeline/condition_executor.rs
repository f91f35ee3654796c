// crates/recipe-engines/src/pipeline/condition_executor.rs
//! Condition evaluation module
//!
//! Evaluates the `condition:` expression of a step against the recipe context.
//! Supports boolean operators, comparisons, parentheses, literals and dotted
//! context paths. Nothing else is executed.
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "||") and)*
//! and        := unary (("and" | "&&") unary)*
//! unary      := ("not" | "!") unary | comparison
//! comparison := operand (("==" | "!=" | "<" | "<=" | ">" | ">=") operand)?
//! operand    := "(" expr ")" | literal | path
//! ```
//!
//! Lookup failures, bad syntax and ordering of incomparable values are errors,
//! never `false`.

use log::debug;
use recipe_core::{ConditionError, RecipeContext};
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Compare(CompareOp),
    Literal(Value),
    Path(String),
}

/// Evaluates step conditions
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Parses and evaluates `expression`.
    pub fn evaluate(expression: &str, context: &RecipeContext) -> Result<bool, ConditionError> {
        debug!("Evaluating condition: {}", expression);
        let expr = Self::parse(expression)?;
        let result = eval_bool(&expr, context)?;
        debug!("Condition '{}' evaluated to: {}", expression, result);
        Ok(result)
    }

    /// Parses without evaluating. Used to validate recipes up front.
    pub fn parse(expression: &str) -> Result<Expr, ConditionError> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Err(syntax_error(expression, "expression is empty"));
        }
        let mut parser = Parser {
            expression,
            tokens,
            position: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(syntax_error(
                expression,
                &format!("unexpected trailing token {:?}", token),
            ));
        }
        Ok(expr)
    }
}

fn syntax_error(expression: &str, reason: &str) -> ConditionError {
    ConditionError::Syntax {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            _ if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Compare(CompareOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Compare(CompareOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, next == Some('=')) {
                    ('<', true) => CompareOp::Le,
                    ('<', false) => CompareOp::Lt,
                    (_, true) => CompareOp::Ge,
                    (_, false) => CompareOp::Gt,
                };
                tokens.push(Token::Compare(op));
                i += if next == Some('=') { 2 } else { 1 };
            }
            '"' | '\'' => {
                let (text, consumed) = read_string(expression, &chars[i..])?;
                tokens.push(Token::Literal(Value::String(text)));
                i += consumed;
            }
            _ if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Literal(parse_number(expression, &text)?));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(keyword_or_path(word));
            }
            other => {
                return Err(syntax_error(
                    expression,
                    &format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_path(word: String) -> Token {
    match word.as_str() {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "true" | "True" => Token::Literal(Value::Bool(true)),
        "false" | "False" => Token::Literal(Value::Bool(false)),
        "null" | "None" => Token::Literal(Value::Null),
        _ => Token::Path(word),
    }
}

/// Reads a quoted string starting at `chars[0]`. Returns the text and the
/// number of characters consumed, quotes included.
fn read_string(expression: &str, chars: &[char]) -> Result<(String, usize), ConditionError> {
    let quote = chars[0];
    let mut text = String::new();
    let mut i = 1;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| syntax_error(expression, "unterminated escape"))?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }

    Err(syntax_error(expression, "unterminated string literal"))
}

fn parse_number(expression: &str, text: &str) -> Result<Value, ConditionError> {
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| syntax_error(expression, &format!("invalid number '{}'", text)))
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let left = self.parse_operand()?;
        if let Some(Token::Compare(op)) = self.peek() {
            let op = *op;
            self.advance();
            let right = self.parse_operand()?;
            return Ok(Expr::Compare(Box::new(left), op, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_operand(&mut self) -> Result<Expr, ConditionError> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(syntax_error(self.expression, "missing closing parenthesis")),
                }
            }
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Path(path)) => Ok(Expr::Path(path)),
            Some(token) => Err(syntax_error(
                self.expression,
                &format!("expected a value, found {:?}", token),
            )),
            None => Err(syntax_error(self.expression, "unexpected end of expression")),
        }
    }
}

fn eval_bool(expr: &Expr, context: &RecipeContext) -> Result<bool, ConditionError> {
    match expr {
        Expr::Not(inner) => Ok(!eval_bool(inner, context)?),
        Expr::And(left, right) => Ok(eval_bool(left, context)? && eval_bool(right, context)?),
        Expr::Or(left, right) => Ok(eval_bool(left, context)? || eval_bool(right, context)?),
        Expr::Compare(left, op, right) => {
            let left = eval_value(left, context)?;
            let right = eval_value(right, context)?;
            compare(&left, *op, &right)
        }
        Expr::Literal(_) | Expr::Path(_) => Ok(truthy(&eval_value(expr, context)?)),
    }
}

fn eval_value(expr: &Expr, context: &RecipeContext) -> Result<Value, ConditionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => Ok(context.lookup(path)?),
        other => Ok(Value::Bool(eval_bool(other, context)?)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool, ConditionError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        CompareOp::Eq => Ok(ordering.map_or_else(|| left == right, Ordering::is_eq)),
        CompareOp::Ne => Ok(ordering.map_or_else(|| left != right, Ordering::is_ne)),
        _ => {
            let ordering = ordering.ok_or_else(|| ConditionError::TypeMismatch {
                left: describe(left),
                op: op.symbol(),
                right: describe(right),
            })?;
            Ok(match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        let short: String = text.chars().take(40).collect();
        format!("{}...", short)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::ContextError;
    use serde_json::json;

    fn context() -> RecipeContext {
        let mut ctx = RecipeContext::new();
        ctx.set("classification", json!({"is_qa": true, "score": 0.8, "label": "bug"}));
        ctx.set("count", json!(3));
        ctx.set("raw", "plain text");
        ctx.set("empty", "");
        ctx
    }

    fn eval(expression: &str) -> Result<bool, ConditionError> {
        ConditionEvaluator::evaluate(expression, &context())
    }

    #[test]
    fn test_boolean_field_and_equality() {
        assert!(eval("classification.is_qa").unwrap());
        assert!(eval("classification.is_qa == true").unwrap());
        assert!(!eval("classification.is_qa == false").unwrap());
        assert!(eval("classification.label == 'bug'").unwrap());
        assert!(eval("classification.label != \"feature\"").unwrap());
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(eval("count > 2").unwrap());
        assert!(eval("count >= 3 && count <= 3").unwrap());
        assert!(eval("classification.score < 1").unwrap());
        assert!(eval("count == 3.0").unwrap());
        assert!(eval("count > -1").unwrap());
    }

    #[test]
    fn test_logical_operators_and_precedence() {
        assert!(eval("not classification.is_qa or count == 3").unwrap());
        assert!(eval("!(classification.is_qa and count == 4)").unwrap());
        assert!(eval("count == 1 or count == 2 or count == 3").unwrap());
        assert!(!eval("count == 3 and (raw == 'x' || false)").unwrap());
    }

    #[test]
    fn test_truthiness_of_plain_values() {
        assert!(eval("raw").unwrap());
        assert!(!eval("empty").unwrap());
        assert!(!eval("null").unwrap());
    }

    #[test]
    fn test_missing_variable_raises() {
        let err = eval("missing.flag == true").unwrap_err();
        assert_eq!(
            err,
            ConditionError::Lookup(ContextError::MissingVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_field_on_plain_string_raises() {
        let err = eval("raw.is_qa").unwrap_err();
        assert!(matches!(
            err,
            ConditionError::Lookup(ContextError::NotStructured { .. })
        ));
    }

    #[test]
    fn test_ordering_mismatch_raises() {
        let err = eval("classification.label > 3").unwrap_err();
        assert!(matches!(err, ConditionError::TypeMismatch { op: ">", .. }));
    }

    #[test]
    fn test_syntax_errors() {
        for expression in ["", "count ==", "(count == 3", "count == 3)", "count = 3", "'open"] {
            let err = ConditionEvaluator::parse(expression).unwrap_err();
            assert!(
                matches!(err, ConditionError::Syntax { .. }),
                "{expression:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_structure() {
        let expr = ConditionEvaluator::parse("a.b == 'x' and not c").unwrap();
        assert_eq!(
            expr,
            Expr::And(
                Box::new(Expr::Compare(
                    Box::new(Expr::Path("a.b".to_string())),
                    CompareOp::Eq,
                    Box::new(Expr::Literal(json!("x")))
                )),
                Box::new(Expr::Not(Box::new(Expr::Path("c".to_string()))))
            )
        );
    }
}
