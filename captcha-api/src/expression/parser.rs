use crate::error::{CaptchaError, Result};

/// Nesting limit for parentheses and chained negations.
const MAX_DEPTH: usize = 64;
/// Longest token sequence accepted; keeps the tree shallow enough to walk
/// recursively.
const MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(i128),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Int(i128),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn unsupported(msg: impl Into<String>) -> CaptchaError {
    CaptchaError::UnsupportedConstruct(msg.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            '0'..='9' => {
                let mut end = start + 1;
                while let Some(&(i, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let value = input[start..end]
                    .parse::<i128>()
                    .map_err(|_| CaptchaError::ArithmeticOverflow)?;
                Token::Int(value)
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => return Err(unsupported(format!("unexpected character '{other}'"))),
        };

        tokens.push(token);
        if tokens.len() > MAX_TOKENS {
            return Err(unsupported(format!(
                "expression longer than {MAX_TOKENS} tokens"
            )));
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(unsupported(format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    // unary := '-' unary | primary
    fn unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(Token::Minus) {
            self.advance();
            self.descend()?;
            let operand = self.unary()?;
            self.ascend();
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary()
    }

    // primary := INT | '(' expr ')'
    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Int(value)) => Ok(Expr::Literal(value)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.ascend();
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(unsupported(format!("expected ')', found {other:?}"))),
                    None => Err(unsupported("unclosed parenthesis")),
                }
            }
            Some(other) => Err(unsupported(format!("unexpected token {other:?}"))),
            None => Err(unsupported("unexpected end of expression")),
        }
    }
}

/// Parse a sanitized expression into a tree.
pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
        depth: 0,
    };

    let tree = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(unsupported(format!("trailing token {extra:?}")));
    }
    Ok(tree)
}
