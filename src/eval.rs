use crate::format::{decimal_exponent, format_number};
use bigdecimal::{BigDecimal, One, ToPrimitive, Zero};
use std::iter::Peekable;
use std::str::FromStr;
use thiserror::Error;

/// Largest integer exponent `^` accepts.
const MAX_EXPONENT: i64 = 1000;
/// Decimal exponent range of values the calculator can hold, matching the
/// range of an IEEE 754 double.
pub const MAX_DECIMAL_EXPONENT: i64 = 308;
pub const MIN_DECIMAL_EXPONENT: i64 = -308;

/// Evaluates `input` and returns the exact value.
pub fn eval(input: &str) -> Result<BigDecimal, EvalError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(EvalError::EmptyInput);
    }
    let mut token_iter = tokens.into_iter().peekable();
    let parse_tree = parse_expr(&mut token_iter)?;
    match token_iter.next() {
        None => eval_tree(&parse_tree),
        Some(Token::ParenClose) => Err(ParseError::UnmatchedParens.into()),
        Some(_) => Err(ParseError::UnmatchedToken.into()),
    }
}

/// Evaluates `expression` and formats the result with the calculator's
/// fixed precision and exponent window.
pub fn evaluate(expression: &str) -> Result<String, EvalError> {
    eval(expression).map(|value| format_number(&value))
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Unable to lex the provided expression")]
    LexError(#[from] LexError),
    #[error("Unable to parse the provided expression")]
    ParseError(#[from] ParseError),
    #[error("Can not evaluate empty input")]
    EmptyInput,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Can not take the square root of a negative number")]
    NegativeSquareRoot,
    #[error("Exponent must be an integer")]
    NonIntegerExponent,
    #[error("Exponent exceeds {}", MAX_EXPONENT)]
    ExponentTooLarge,
    #[error("Result is too large")]
    Overflow,
    #[error("Result is too small")]
    Underflow,
}

#[derive(Error, Debug)]
pub enum LexError {
    #[error("The token \"{0}\" is not allowed")]
    IllegalToken(String),
    #[error("\"{0}\" is not a number")]
    IllegalNumber(String),
    #[error("The input must be ASCII")]
    NonAsciiInput,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Input contains unmatched parenthesis")]
    UnmatchedParens,
    #[error("Input contains unmatched token")]
    UnmatchedToken,
    #[error("Expected binary operator")]
    ExpectedBinaryOperator,
    #[error("Function \"{0}\" must be followed by parenthesis")]
    ExpectedCall(String),
    #[error("Unknown function \"{0}\"")]
    UnknownFunction(String),
    #[error("Can not parse empty input")]
    EmptyInput,
}

/// Single operand transforms applied to the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperation {
    Reciprocal,
    Square,
    Cube,
    SquareRoot,
}

impl UnaryOperation {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "reciprocal" => Some(Self::Reciprocal),
            "power-2" => Some(Self::Square),
            "power-3" => Some(Self::Cube),
            "square-root" => Some(Self::SquareRoot),
            _ => None,
        }
    }
}

/// Two operand operators that can be pending between key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }
}

/// Builds the expression text for `operation` applied to `operand`.
pub fn format_unary(operation: UnaryOperation, operand: &str) -> String {
    match operation {
        UnaryOperation::Reciprocal => format!("1 / ({})", operand),
        UnaryOperation::Square => format!("({}) ^ 2", operand),
        UnaryOperation::Cube => format!("({}) ^ 3", operand),
        UnaryOperation::SquareRoot => format!("sqrt({})", operand),
    }
}

/// Like [`format_unary`] but keyed by operation id. Unknown ids leave the
/// operand as it is.
pub fn format_unary_id(id: &str, operand: &str) -> String {
    match UnaryOperation::from_id(id) {
        Some(operation) => format_unary(operation, operand),
        None => operand.to_string(),
    }
}

pub fn format_binary(left: &str, operator: BinaryOperator, right: &str) -> String {
    format!("({}) {} ({})", left, operator.symbol(), right)
}

#[derive(Debug)]
enum Token {
    Number(BigDecimal),
    Ident(String),
    ParenStart,
    ParenClose,
    Plus,
    Minus,
    Mul,
    Div,
    Pow,
}

const POW_PRECEDENCE: usize = 2;

impl Token {
    fn op_precedence(&self) -> Option<usize> {
        match self {
            Token::Plus | Token::Minus => Some(0),
            Token::Mul | Token::Div => Some(1),
            Token::Pow => Some(POW_PRECEDENCE),
            _ => None,
        }
    }

    fn is_right_assoc(&self) -> bool {
        matches!(self, Token::Pow)
    }
}

#[derive(Debug)]
enum ParseTree {
    Number(BigDecimal),
    Neg(Box<ParseTree>),
    Sqrt(Box<ParseTree>),
    Plus(Box<ParseTree>, Box<ParseTree>),
    Sub(Box<ParseTree>, Box<ParseTree>),
    Mul(Box<ParseTree>, Box<ParseTree>),
    Div(Box<ParseTree>, Box<ParseTree>),
    Pow(Box<ParseTree>, Box<ParseTree>),
}

impl ParseTree {
    fn apply(self: Box<Self>, op: Token, other: Box<Self>) -> Result<Box<ParseTree>, ParseError> {
        let applied = match op {
            Token::Plus => Self::Plus(self, other),
            Token::Minus => Self::Sub(self, other),
            Token::Mul => Self::Mul(self, other),
            Token::Div => Self::Div(self, other),
            Token::Pow => Self::Pow(self, other),
            _ => return Err(ParseError::ExpectedBinaryOperator),
        };
        Ok(Box::new(applied))
    }
}

fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    if !input.is_ascii() {
        return Err(LexError::NonAsciiInput);
    }
    let bytes = input.as_bytes();
    let mut result = vec![];
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte.is_ascii_whitespace() {
            idx += 1;
            continue;
        }
        let token = match byte {
            b'(' => Token::ParenStart,
            b')' => Token::ParenClose,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Mul,
            b'/' => Token::Div,
            b'^' => Token::Pow,
            b'0'..=b'9' | b'.' => {
                let (number, end_idx) = parse_number(idx, input)?;
                result.push(Token::Number(number));
                idx = end_idx;
                continue;
            }
            b'a'..=b'z' | b'A'..=b'Z' => {
                let end_idx = scan_while(bytes, idx, |b| b.is_ascii_alphabetic());
                result.push(Token::Ident(input[idx..end_idx].to_ascii_lowercase()));
                idx = end_idx;
                continue;
            }
            unknown => {
                return Err(LexError::IllegalToken(
                    String::from_utf8_lossy(&[unknown]).into_owned(),
                ))
            }
        };
        result.push(token);
        idx += 1;
    }

    Ok(result)
}

fn scan_while(bytes: &[u8], start_idx: usize, pred: impl Fn(u8) -> bool) -> usize {
    let mut end_idx = start_idx;
    while end_idx < bytes.len() && pred(bytes[end_idx]) {
        end_idx += 1;
    }
    end_idx
}

/// Lexes a number starting at `start_idx`, including an optional exponent
/// suffix such as `e+20`. Returns the number and the index after it.
fn parse_number(start_idx: usize, input: &str) -> Result<(BigDecimal, usize), LexError> {
    let bytes = input.as_bytes();
    let mut end_idx = scan_while(bytes, start_idx, |b| matches!(b, b'0'..=b'9' | b'.'));

    if matches!(bytes.get(end_idx).copied(), Some(b'e') | Some(b'E')) {
        let mut exp_idx = end_idx + 1;
        if matches!(bytes.get(exp_idx).copied(), Some(b'+') | Some(b'-')) {
            exp_idx += 1;
        }
        if matches!(bytes.get(exp_idx).copied(), Some(b'0'..=b'9')) {
            end_idx = scan_while(bytes, exp_idx, |b| b.is_ascii_digit());
        }
    }

    let literal = &input[start_idx..end_idx];
    let illegal = || LexError::IllegalNumber(literal.to_string());
    let (mantissa, exponent) = match literal.find(|c| c == 'e' || c == 'E') {
        Some(pos) => (&literal[..pos], &literal[pos..]),
        None => (literal, ""),
    };
    if mantissa.matches('.').count() > 1 || !mantissa.bytes().any(|b| b.is_ascii_digit()) {
        return Err(illegal());
    }
    // "5." and ".5" are valid entries, so spell them out before parsing.
    let mut normalized = String::with_capacity(literal.len() + 1);
    if mantissa.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(mantissa.trim_end_matches('.'));
    normalized.push_str(exponent);

    let number = BigDecimal::from_str(&normalized).map_err(|_| illegal())?;
    Ok((number, end_idx))
}

fn parse_expr(input: &mut Peekable<impl Iterator<Item = Token>>) -> Result<Box<ParseTree>, ParseError> {
    let primary = parse_primary(input)?;
    parse_expr_rec(primary, input, 0)
}

fn parse_expr_rec(
    mut lhs: Box<ParseTree>,
    input: &mut Peekable<impl Iterator<Item = Token>>,
    min_precedence: usize,
) -> Result<Box<ParseTree>, ParseError> {
    while let Some(op_prec) = input.peek().and_then(Token::op_precedence) {
        if op_prec < min_precedence {
            break;
        }
        let op = input.next().ok_or(ParseError::EmptyInput)?;
        let mut rhs = parse_primary(input)?;
        while let Some(lookahead) = input.peek() {
            let lookahead_prec = match lookahead.op_precedence() {
                Some(prec) => prec,
                None => break,
            };
            let binds_tighter = lookahead_prec > op_prec
                || (lookahead.is_right_assoc() && lookahead_prec == op_prec);
            if !binds_tighter {
                break;
            }
            rhs = parse_expr_rec(rhs, input, lookahead_prec)?;
        }
        lhs = lhs.apply(op, rhs)?;
    }
    Ok(lhs)
}

fn parse_parenthesized(
    input: &mut Peekable<impl Iterator<Item = Token>>,
) -> Result<Box<ParseTree>, ParseError> {
    let inner = parse_expr(input)?;
    match input.next() {
        Some(Token::ParenClose) => Ok(inner),
        _ => Err(ParseError::UnmatchedParens),
    }
}

fn parse_primary(
    input: &mut Peekable<impl Iterator<Item = Token>>,
) -> Result<Box<ParseTree>, ParseError> {
    match input.next() {
        Some(Token::ParenStart) => parse_parenthesized(input),
        Some(Token::Number(num)) => Ok(Box::new(ParseTree::Number(num))),
        Some(Token::Minus) => {
            // -x ^ 2 is -(x ^ 2)
            let operand = parse_primary(input)?;
            let operand = parse_expr_rec(operand, input, POW_PRECEDENCE)?;
            Ok(Box::new(ParseTree::Neg(operand)))
        }
        Some(Token::Ident(name)) => match input.next() {
            Some(Token::ParenStart) => {
                let argument = parse_parenthesized(input)?;
                match name.as_str() {
                    "sqrt" => Ok(Box::new(ParseTree::Sqrt(argument))),
                    _ => Err(ParseError::UnknownFunction(name)),
                }
            }
            _ => Err(ParseError::ExpectedCall(name)),
        },
        Some(_) => Err(ParseError::UnmatchedToken),
        None => Err(ParseError::EmptyInput),
    }
}

fn eval_tree(parse_tree: &ParseTree) -> Result<BigDecimal, EvalError> {
    let value = match parse_tree {
        ParseTree::Number(num) => num.clone(),
        ParseTree::Neg(tree) => -eval_tree(tree)?,
        ParseTree::Sqrt(tree) => eval_tree(tree)?
            .sqrt()
            .ok_or(EvalError::NegativeSquareRoot)?,
        ParseTree::Plus(left, right) => eval_tree(left)? + eval_tree(right)?,
        ParseTree::Sub(left, right) => eval_tree(left)? - eval_tree(right)?,
        ParseTree::Mul(left, right) => eval_tree(left)? * eval_tree(right)?,
        ParseTree::Div(left, right) => divide(eval_tree(left)?, eval_tree(right)?)?,
        ParseTree::Pow(base, exponent) => pow(eval_tree(base)?, &eval_tree(exponent)?)?,
    };
    check_range(value)
}

fn check_range(value: BigDecimal) -> Result<BigDecimal, EvalError> {
    match decimal_exponent(&value) {
        Some(exponent) if exponent > MAX_DECIMAL_EXPONENT => Err(EvalError::Overflow),
        Some(exponent) if exponent < MIN_DECIMAL_EXPONENT => Err(EvalError::Underflow),
        _ => Ok(value),
    }
}

fn divide(left: BigDecimal, right: BigDecimal) -> Result<BigDecimal, EvalError> {
    if right.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(left / right)
}

fn pow(base: BigDecimal, exponent: &BigDecimal) -> Result<BigDecimal, EvalError> {
    if !exponent.is_integer() {
        return Err(EvalError::NonIntegerExponent);
    }
    let exponent = exponent
        .to_i64()
        .filter(|exp| exp.abs() <= MAX_EXPONENT)
        .ok_or(EvalError::ExponentTooLarge)?;

    let mut result = BigDecimal::one();
    let mut square = base;
    let mut remaining = exponent.abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = &result * &square;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = &square * &square;
        }
    }

    if exponent < 0 {
        divide(BigDecimal::one(), result)
    } else {
        Ok(result)
    }
}
