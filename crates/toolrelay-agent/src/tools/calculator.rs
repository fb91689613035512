//! `calculate` tool: arithmetic expression evaluator.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary (('**' | '^') unary)?
//! primary := number | '(' expr ')'
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::base::{require_string, Tool};

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform a mathematical calculation"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate, e.g. \"2 + 2\" or \"10 * 5\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let expression = require_string(&args, "expression")?;

        match evaluate(&expression) {
            Some(result) => {
                debug!(expression = %expression, result, "evaluated");
                Ok(json!({ "expression": expression, "result": number_value(result) }))
            }
            None => Ok(json!({ "expression": expression, "error": "Invalid expression" })),
        }
    }
}

/// Evaluate `input`. `None` when it does not parse or the result is not finite.
pub fn evaluate(input: &str) -> Option<f64> {
    let mut parser = Parser {
        src: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Whole numbers become JSON integers (`4`, not `4.0`).
fn number_value(n: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < MAX_EXACT {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// Deepest nesting of parentheses, signs and powers the parser accepts.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.src.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Option<f64> {
        let mut acc = self.term()?;
        loop {
            if self.eat("+") {
                acc += self.term()?;
            } else if self.eat("-") {
                acc -= self.term()?;
            } else {
                return Some(acc);
            }
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut acc = self.unary()?;
        loop {
            // `**` is power, not two multiplications
            if self.peek() == Some(b'*') && !self.src[self.pos..].starts_with(b"**") {
                self.pos += 1;
                acc *= self.unary()?;
            } else if self.eat("/") {
                acc /= self.unary()?;
            } else if self.eat("%") {
                acc %= self.unary()?;
            } else {
                return Some(acc);
            }
        }
    }

    // every nesting path (parens, sign runs, power chains) recurses through here
    fn unary(&mut self) -> Option<f64> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Option<f64> {
        if self.eat("-") {
            Some(-self.unary()?)
        } else if self.eat("+") {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Option<f64> {
        let base = self.primary()?;
        if self.eat("**") || self.eat("^") {
            let exponent = self.unary()?;
            Some(base.powf(exponent))
        } else {
            Some(base)
        }
    }

    fn primary(&mut self) -> Option<f64> {
        if self.eat("(") {
            let inner = self.expr()?;
            return self.eat(")").then_some(inner);
        }

        self.skip_ws();
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'.')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}
