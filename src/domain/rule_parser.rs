//! Rule and indicator text parser.
//!
//! Grammar:
//! ```text
//! rules     := rule (';' rule)*
//! rule      := field operator number
//! field     := ident ('.' ident)?
//! operator  := '>=' | '<=' | '==' | '>' | '<' | 'crosses_above' | 'crosses_below'
//! indicator := NAME ('(' number (',' number)* ')')?
//! ```
//!
//! Errors carry the character offset so callers can point at the problem.

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::rule::{Rule, RuleOperator};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error(format!("unexpected trailing input '{}'", self.peek_word()))),
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_ident(&mut self, what: &str) -> Result<&'a str, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error(format!("expected {}, found '{}'", what, self.peek_word())));
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_field(&mut self) -> Result<String, ParseError> {
        let key = self.parse_ident("indicator field")?;
        if self.peek() == Some('.') {
            self.advance();
            let sub = self.parse_ident("sub-field")?;
            return Ok(format!("{}.{}", key, sub));
        }
        Ok(key.to_string())
    }

    fn parse_operator(&mut self) -> Result<RuleOperator, ParseError> {
        self.skip_whitespace();
        let remaining = self.remaining();
        for op in RuleOperator::ALL {
            let symbol = op.symbol();
            let Some(head) = remaining.get(..symbol.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(symbol) {
                continue;
            }
            let joined_word = remaining[symbol.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
            if op.is_crossover() && joined_word {
                continue;
            }
            self.pos += symbol.len();
            return Ok(op);
        }
        Err(self.error(format!(
            "expected operator (>, <, >=, <=, ==, crosses_above, crosses_below), found '{}'",
            self.peek_word()
        )))
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        let field = self.parse_field()?;
        let operator = self.parse_operator()?;
        let value = self.parse_number()?;
        Ok(Rule {
            field,
            operator,
            value,
        })
    }

    fn parse_indicator(&mut self) -> Result<IndicatorKind, ParseError> {
        self.skip_whitespace();
        let name_pos = self.pos;
        let name = self.parse_ident("indicator name")?.to_ascii_uppercase();

        let mut args: Vec<f64> = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance();
            self.skip_whitespace();
            if self.peek() != Some(')') {
                loop {
                    args.push(self.parse_number()?);
                    self.skip_whitespace();
                    if self.peek() == Some(',') {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect_char(')')?;
        }

        let arity = |expected: usize| -> Result<(), ParseError> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(ParseError {
                    message: format!(
                        "{} takes {} parameter(s), found {}",
                        name,
                        expected,
                        args.len()
                    ),
                    position: name_pos,
                })
            }
        };
        let period = |value: f64| -> Result<usize, ParseError> {
            if value.fract() == 0.0 && value >= 1.0 {
                Ok(value as usize)
            } else {
                Err(ParseError {
                    message: format!("{} periods must be whole numbers >= 1, found {}", name, value),
                    position: name_pos,
                })
            }
        };

        match name.as_str() {
            "SMA" => {
                arity(1)?;
                Ok(IndicatorKind::Sma { period: period(args[0])? })
            }
            "EMA" => {
                arity(1)?;
                Ok(IndicatorKind::Ema { period: period(args[0])? })
            }
            "RSI" => {
                arity(1)?;
                Ok(IndicatorKind::Rsi { period: period(args[0])? })
            }
            "ATR" => {
                arity(1)?;
                Ok(IndicatorKind::Atr { period: period(args[0])? })
            }
            "MACD" => {
                arity(3)?;
                Ok(IndicatorKind::Macd {
                    fast: period(args[0])?,
                    slow: period(args[1])?,
                    signal: period(args[2])?,
                })
            }
            "BOLLINGER" | "BB" => {
                arity(2)?;
                Ok(IndicatorKind::Bollinger {
                    period: period(args[0])?,
                    k: args[1],
                })
            }
            "STOCHASTIC" | "STOCH" => {
                arity(2)?;
                Ok(IndicatorKind::Stochastic {
                    k_period: period(args[0])?,
                    d_period: period(args[1])?,
                })
            }
            "VWAP" => {
                arity(0)?;
                Ok(IndicatorKind::Vwap)
            }
            _ => Err(ParseError {
                message: format!(
                    "unknown indicator '{}' (expected SMA, EMA, RSI, MACD, BOLLINGER, STOCHASTIC, ATR, VWAP)",
                    name
                ),
                position: name_pos,
            }),
        }
    }
}

/// Parse a single rule such as `macd.histogram crosses_above 0`.
pub fn parse_rule(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    let rule = parser.parse_rule()?;
    parser.expect_end()?;
    Ok(rule)
}

/// Parse a `;`-separated rule list. Blank segments are skipped; error
/// positions are relative to the whole input.
pub fn parse_rules(input: &str) -> Result<Vec<Rule>, ParseError> {
    let mut rules = Vec::new();
    let mut offset = 0;
    for segment in input.split(';') {
        if !segment.trim().is_empty() {
            let rule = parse_rule(segment).map_err(|e| ParseError {
                message: e.message,
                position: e.position + offset,
            })?;
            rules.push(rule);
        }
        offset += segment.len() + 1;
    }
    Ok(rules)
}

/// Parse an indicator definition such as `MACD(12,26,9)` or `VWAP`.
pub fn parse_indicator(input: &str) -> Result<IndicatorKind, ParseError> {
    let mut parser = Parser::new(input);
    let kind = parser.parse_indicator()?;
    parser.expect_end()?;
    Ok(kind)
}
