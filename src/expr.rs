//! Expression engine.
//!
//! A restricted expression grammar evaluated against a layered scope:
//! literals, identifiers, member access, indexing, list/object literals,
//! arithmetic, comparison, logical operators, the ternary and calls.
//! Parsing fails hard; evaluation never does — an absent identifier is
//! null, and operators coerce the way a dynamic language would.

use crate::component::{lookup_in_host, InstanceRef};
use crate::error::{Result, WeftError, ERR_EXPR_SYNTAX};
use crate::scope::Scope;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    ObjectLit(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A parsed expression plus its original source, kept for diagnostics and
/// for directives (`model`) that need the raw identifier path.
#[derive(Clone)]
pub struct Expression {
    pub source: String,
    ast: Expr,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({:?})", self.source)
    }
}

impl Expression {
    pub fn parse(source: &str) -> Result<Expression> {
        let tokens = tokenize(source)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let ast = parser.parse_expr(0)?;
        if parser.pos != parser.tokens.len() {
            return Err(WeftError::new(
                ERR_EXPR_SYNTAX,
                format!("Unexpected trailing input in expression: `{}`", source),
            ));
        }
        Ok(Expression {
            source: source.to_string(),
            ast,
        })
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// The dotted identifier path (`a` or `a.b.c`) if the expression is one,
    /// used by the `model` directive.
    pub fn identifier_path(&self) -> Option<Vec<String>> {
        fn walk(expr: &Expr, out: &mut Vec<String>) -> bool {
            match expr {
                Expr::Ident(name) => {
                    out.push(name.clone());
                    true
                }
                Expr::Member(base, name) => {
                    if !walk(base, out) {
                        return false;
                    }
                    out.push(name.clone());
                    true
                }
                _ => false,
            }
        }
        let mut path = Vec::new();
        if walk(&self.ast, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    /// Evaluate against the host component and scope chain. Infallible:
    /// lookup misses, bad indexing and calls on non-functions yield null.
    pub fn eval(&self, host: &InstanceRef, scope: &Rc<Scope>) -> Value {
        let val = eval_expr(&self.ast, host, scope);
        log::debug!("eval `{}` -> {:?}", self.source, val);
        val
    }
}

fn eval_expr(expr: &Expr, host: &InstanceRef, scope: &Rc<Scope>) -> Value {
    match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Number(n) => Value::Number(*n),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Ident(name) => scope
            .lookup(name)
            .or_else(|| lookup_in_host(host, name))
            .unwrap_or(Value::Null),
        Expr::Member(base, name) => eval_expr(base, host, scope).get_member(name),
        Expr::Index(base, index) => {
            let idx = eval_expr(index, host, scope);
            eval_expr(base, host, scope).get_index(&idx)
        }
        Expr::List(items) => {
            Value::List(items.iter().map(|e| eval_expr(e, host, scope)).collect())
        }
        Expr::ObjectLit(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, e)| (k.clone(), eval_expr(e, host, scope)))
                .collect(),
        ),
        Expr::Unary(op, operand) => {
            let v = eval_expr(operand, host, scope);
            match op {
                UnaryOp::Not => Value::Bool(!v.truthy()),
                UnaryOp::Neg => Value::Number(-v.as_number()),
            }
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, host, scope),
        Expr::Ternary(cond, then, alt) => {
            if eval_expr(cond, host, scope).truthy() {
                eval_expr(then, host, scope)
            } else {
                eval_expr(alt, host, scope)
            }
        }
        Expr::Call(callee, args) => {
            let target = eval_expr(callee, host, scope);
            let argv: Vec<Value> = args.iter().map(|a| eval_expr(a, host, scope)).collect();
            match target {
                Value::Function(f) => f(&argv),
                _ => Value::Null,
            }
        }
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, host: &InstanceRef, scope: &Rc<Scope>) -> Value {
    // Short-circuit forms return the deciding operand, not a bool
    match op {
        BinOp::And => {
            let l = eval_expr(lhs, host, scope);
            return if l.truthy() {
                eval_expr(rhs, host, scope)
            } else {
                l
            };
        }
        BinOp::Or => {
            let l = eval_expr(lhs, host, scope);
            return if l.truthy() {
                l
            } else {
                eval_expr(rhs, host, scope)
            };
        }
        _ => {}
    }
    let l = eval_expr(lhs, host, scope);
    let r = eval_expr(rhs, host, scope);
    match op {
        BinOp::Add => match (&l, &r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Value::Str(format!("{}{}", l.display_string(), r.display_string()))
            }
            (Value::List(a), Value::List(b)) => {
                let mut joined = a.clone();
                joined.extend(b.iter().cloned());
                Value::List(joined)
            }
            _ => Value::Number(l.as_number() + r.as_number()),
        },
        BinOp::Sub => Value::Number(l.as_number() - r.as_number()),
        BinOp::Mul => Value::Number(l.as_number() * r.as_number()),
        BinOp::Div => Value::Number(l.as_number() / r.as_number()),
        BinOp::Mod => Value::Number(l.as_number() % r.as_number()),
        BinOp::Eq => Value::Bool(l.loose_eq(&r)),
        BinOp::Ne => Value::Bool(!l.loose_eq(&r)),
        BinOp::Lt => compare(&l, &r, |o| o == std::cmp::Ordering::Less),
        BinOp::Le => compare(&l, &r, |o| o != std::cmp::Ordering::Greater),
        BinOp::Gt => compare(&l, &r, |o| o == std::cmp::Ordering::Greater),
        BinOp::Ge => compare(&l, &r, |o| o != std::cmp::Ordering::Less),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn compare(l: &Value, r: &Value, pick: fn(std::cmp::Ordering) -> bool) -> Value {
    // String-to-string comparisons are lexicographic, everything else numeric
    if let (Value::Str(a), Value::Str(b)) = (l, r) {
        return Value::Bool(pick(a.cmp(b)));
    }
    let (a, b) = (l.as_number(), r.as_number());
    match a.partial_cmp(&b) {
        Some(ord) => Value::Bool(pick(ord)),
        None => Value::Bool(false),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKENIZER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Str(String),
    Ident(String),
    // punctuation and operators
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

fn syntax_error(source_hint: impl Into<String>) -> WeftError {
    WeftError::new(ERR_EXPR_SYNTAX, source_hint)
}

fn tokenize(source: &str) -> Result<Vec<Tok>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Tok::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Tok::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Tok::RBrace);
                i += 1;
            }
            ',' => {
                tokens.push(Tok::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Tok::Colon);
                i += 1;
            }
            '.' => {
                tokens.push(Tok::Dot);
                i += 1;
            }
            '?' => {
                tokens.push(Tok::Question);
                i += 1;
            }
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Tok::Percent);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::NotEq);
                    i += 2;
                } else {
                    tokens.push(Tok::Not);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::EqEq);
                    i += 2;
                } else {
                    return Err(syntax_error(format!(
                        "Assignment is not allowed in expressions: `{}`",
                        source
                    )));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Le);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ge);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Tok::AndAnd);
                    i += 2;
                } else {
                    return Err(syntax_error(format!("Stray `&` in expression: `{}`", source)));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Tok::OrOr);
                    i += 2;
                } else {
                    return Err(syntax_error(format!("Stray `|` in expression: `{}`", source)));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('n') => s.push('\n'),
                                Some('t') => s.push('\t'),
                                Some(&esc) => s.push(esc),
                                None => {
                                    return Err(syntax_error(format!(
                                        "Unterminated string in expression: `{}`",
                                        source
                                    )))
                                }
                            }
                            i += 2;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(syntax_error(format!(
                                "Unterminated string in expression: `{}`",
                                source
                            )))
                        }
                    }
                }
                tokens.push(Tok::Str(s));
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    // a dot not followed by a digit is member access
                    if chars[i] == '.'
                        && !chars
                            .get(i + 1)
                            .map(|d| d.is_ascii_digit())
                            .unwrap_or(false)
                    {
                        break;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax_error(format!("Bad number literal `{}`", text)))?;
                tokens.push(Tok::Number(n));
            }
            _ if is_ident_start(c) => {
                let start = i;
                i += 1;
                while i < chars.len() && is_ident_part(chars[i]) {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(Tok::Ident(name));
            }
            _ => {
                return Err(syntax_error(format!(
                    "Unexpected character `{}` in expression: `{}`",
                    c, source
                )))
            }
        }
    }

    Ok(tokens)
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// True when the whole string is a single identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_ident_part)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRATT PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, tok: Tok) -> Result<()> {
        match self.next() {
            Some(found) if found == tok => Ok(()),
            other => Err(syntax_error(format!(
                "Expected {:?}, found {:?}",
                tok, other
            ))),
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek() {
                Some(tok) => tok.clone(),
                None => break,
            };

            // Postfix: member access, indexing, calls bind tightest
            match op {
                Tok::Dot => {
                    self.next();
                    match self.next() {
                        Some(Tok::Ident(name)) => lhs = Expr::Member(Box::new(lhs), name),
                        other => {
                            return Err(syntax_error(format!(
                                "Expected member name after `.`, found {:?}",
                                other
                            )))
                        }
                    }
                    continue;
                }
                Tok::LBracket => {
                    self.next();
                    let index = self.parse_expr(0)?;
                    self.expect(Tok::RBracket)?;
                    lhs = Expr::Index(Box::new(lhs), Box::new(index));
                    continue;
                }
                Tok::LParen => {
                    self.next();
                    let mut args = Vec::new();
                    if self.peek() != Some(&Tok::RParen) {
                        loop {
                            args.push(self.parse_expr(0)?);
                            if self.peek() == Some(&Tok::Comma) {
                                self.next();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Tok::RParen)?;
                    lhs = Expr::Call(Box::new(lhs), args);
                    continue;
                }
                _ => {}
            }

            // Ternary, lowest precedence, right associative
            if op == Tok::Question {
                if min_bp > 1 {
                    break;
                }
                self.next();
                let then = self.parse_expr(0)?;
                self.expect(Tok::Colon)?;
                let alt = self.parse_expr(1)?;
                lhs = Expr::Ternary(Box::new(lhs), Box::new(then), Box::new(alt));
                continue;
            }

            let (bin_op, bp) = match op {
                Tok::OrOr => (BinOp::Or, 2),
                Tok::AndAnd => (BinOp::And, 3),
                Tok::EqEq => (BinOp::Eq, 4),
                Tok::NotEq => (BinOp::Ne, 4),
                Tok::Lt => (BinOp::Lt, 5),
                Tok::Le => (BinOp::Le, 5),
                Tok::Gt => (BinOp::Gt, 5),
                Tok::Ge => (BinOp::Ge, 5),
                Tok::Plus => (BinOp::Add, 6),
                Tok::Minus => (BinOp::Sub, 6),
                Tok::Star => (BinOp::Mul, 7),
                Tok::Slash => (BinOp::Div, 7),
                Tok::Percent => (BinOp::Mod, 7),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.next();
            let rhs = self.parse_expr(bp + 1)?;
            lhs = Expr::Binary(bin_op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Tok::Number(n)) => Ok(Expr::Number(n)),
            Some(Tok::Str(s)) => Ok(Expr::Str(s)),
            Some(Tok::Ident(name)) => match name.as_str() {
                "null" | "undefined" => Ok(Expr::Null),
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                _ => Ok(Expr::Ident(name)),
            },
            Some(Tok::Not) => Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_prefix()?))),
            Some(Tok::Minus) => Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_prefix()?))),
            Some(Tok::LParen) => {
                let inner = self.parse_expr(0)?;
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Tok::RBracket) {
                    loop {
                        items.push(self.parse_expr(0)?);
                        if self.peek() == Some(&Tok::Comma) {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Tok::RBracket)?;
                Ok(Expr::List(items))
            }
            Some(Tok::LBrace) => {
                let mut entries = Vec::new();
                if self.peek() != Some(&Tok::RBrace) {
                    loop {
                        let key = match self.next() {
                            Some(Tok::Ident(name)) => name,
                            Some(Tok::Str(s)) => s,
                            other => {
                                return Err(syntax_error(format!(
                                    "Expected object key, found {:?}",
                                    other
                                )))
                            }
                        };
                        self.expect(Tok::Colon)?;
                        entries.push((key, self.parse_expr(0)?));
                        if self.peek() == Some(&Tok::Comma) {
                            self.next();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Tok::RBrace)?;
                Ok(Expr::ObjectLit(entries))
            }
            other => Err(syntax_error(format!(
                "Unexpected token in expression: {:?}",
                other
            ))),
        }
    }
}
