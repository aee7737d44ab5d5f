use super::ast::{CompareOp, Comparison, Direction, Expr};
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::ParseError;
use crate::units;
use wxalarm_common::fields::Field;

/// Parse a condition string into an expression tree.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the offending part of `src`. No partial
/// tree is ever returned.
///
/// # Examples
///
/// ```
/// use wxalarm_alert::condition::parse;
///
/// assert!(parse("temperature > 85F && humidity < 40").is_ok());
/// assert!(parse("temperature > 85F &&").is_err());
/// assert!(parse("humidity").is_err());
/// ```
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let src = src.trim();
    if src.is_empty() {
        return Err(ParseError::Empty);
    }
    let tokens = tokenize(src)?;
    check_connectives(src, &tokens)?;

    let mut parser = Parser {
        src,
        tokens: &tokens,
        pos: 0,
    };
    let mut expr = parser.term()?;
    while let Some(tok) = parser.peek() {
        let kind = tok.kind.clone();
        parser.pos += 1;
        let rhs = parser.term()?;
        expr = match kind {
            TokenKind::And => Expr::And(Box::new(expr), Box::new(rhs)),
            _ => Expr::Or(Box::new(expr), Box::new(rhs)),
        };
    }
    Ok(expr)
}

fn is_connective(tok: &Token<'_>) -> bool {
    matches!(tok.kind, TokenKind::And | TokenKind::Or)
}

/// Structural checks on `&&`/`||` placement, done before any term is parsed
/// so that `x && && y` reports the empty operand rather than the bare `x`.
fn check_connectives(src: &str, tokens: &[Token<'_>]) -> Result<(), ParseError> {
    if let Some(first) = tokens.first().filter(|t| is_connective(t)) {
        return Err(ParseError::LeadingConnective(first.text.to_string()));
    }
    if let Some(last) = tokens.last().filter(|t| is_connective(t)) {
        return Err(ParseError::TrailingConnective(last.text.to_string()));
    }
    for pair in tokens.windows(2) {
        if is_connective(&pair[0]) && is_connective(&pair[1]) {
            let span = pair[0].span.start..pair[1].span.end;
            return Err(ParseError::EmptyOperand(src[span].to_string()));
        }
    }
    Ok(())
}

struct Parser<'s, 't> {
    src: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
}

impl<'s, 't> Parser<'s, 't> {
    fn peek(&self) -> Option<&'t Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token<'s>> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Source text covered by tokens `from..self.pos`.
    fn text_since(&self, from: usize) -> &'s str {
        let start = self.tokens.get(from).map_or(self.src.len(), |t| t.span.start);
        let end = self.tokens[..self.pos]
            .last()
            .map_or(start, |t| t.span.end)
            .max(start);
        &self.src[start..end]
    }

    fn at_term_end(&self) -> bool {
        self.peek().map_or(true, is_connective)
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of condition".to_string(), |t| t.text.to_string()),
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let direction = match self.peek() {
            Some(t) if t.kind == TokenKind::Star => Some(Direction::Any),
            Some(t) if t.kind == TokenKind::CompOp && t.text == ">" => Some(Direction::Increase),
            Some(t) if t.kind == TokenKind::CompOp && t.text == "<" => Some(Direction::Decrease),
            Some(t) if t.kind == TokenKind::Word => None,
            _ => return Err(self.unexpected("a field name or change-detection prefix")),
        };

        if let Some(direction) = direction {
            self.pos += 1;
            let field = self.field_name()?;
            if !self.at_term_end() {
                return Err(self.unexpected("'&&', '||' or end of condition after change detection"));
            }
            return Ok(Expr::ChangeDetect { field, direction });
        }

        let start = self.pos;
        let field = self.field_name()?;
        let op = match self.peek() {
            Some(t) if t.kind == TokenKind::CompOp => {
                self.pos += 1;
                t.text.parse::<CompareOp>().map_err(|_| self.unexpected("a comparison operator"))?
            }
            None => return Err(ParseError::MissingComparison(self.text_since(start).to_string())),
            Some(t) if is_connective(t) => {
                return Err(ParseError::MissingComparison(self.text_since(start).to_string()))
            }
            Some(_) => return Err(self.unexpected("a comparison operator")),
        };

        if self.at_term_end() {
            return Err(ParseError::MissingValue(self.text_since(start).to_string()));
        }
        let number = match self.next() {
            Some(t) if t.kind == TokenKind::Number => t,
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("a number"));
            }
        };
        let literal: f64 = number
            .text
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| ParseError::InvalidNumber(number.text.to_string()))?;

        let suffix = match self.peek() {
            Some(t) if t.kind == TokenKind::Word => {
                self.pos += 1;
                Some(t.text)
            }
            _ => None,
        };
        let literal_text = &self.src[number.span.start..self.tokens[self.pos - 1].span.end];
        let (canonical, unit) = units::normalize(field, literal, suffix, literal_text)?;

        if !self.at_term_end() {
            return Err(self.unexpected("'&&', '||' or end of condition"));
        }

        Ok(Expr::Comparison(Comparison {
            field,
            op,
            literal,
            unit,
            canonical,
        }))
    }

    /// One or more words joined with `_`, so `wind speed` names `wind_speed`.
    fn field_name(&mut self) -> Result<Field, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Word) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected("a field name"));
        }
        let name = self.text_since(start);
        Field::lookup(name).ok_or_else(|| ParseError::UnknownField(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    #[test]
    fn parses_comparison_with_unit() {
        let expr = parse("temperature > 85F").unwrap();
        let Expr::Comparison(c) = expr else {
            panic!("expected comparison");
        };
        assert_eq!(c.field, Field::Temperature);
        assert_eq!(c.op, CompareOp::GreaterThan);
        assert_eq!(c.literal, 85.0);
        assert_eq!(c.unit, Some(Unit::Fahrenheit));
        assert!((c.canonical - 29.444_444).abs() < 1e-5);
    }

    #[test]
    fn connectives_are_left_associative() {
        let expr = parse("humidity > 80 && temp > 30 || *lightning_count").unwrap();
        let Expr::Or(lhs, rhs) = expr else {
            panic!("expected Or at the root");
        };
        assert!(matches!(*lhs, Expr::And(_, _)));
        assert!(matches!(
            *rhs,
            Expr::ChangeDetect {
                field: Field::LightningCount,
                direction: Direction::Any
            }
        ));
    }

    #[test]
    fn change_detection_prefixes() {
        assert_eq!(
            parse(">rain_rate").unwrap(),
            Expr::ChangeDetect {
                field: Field::RainRate,
                direction: Direction::Increase
            }
        );
        assert_eq!(
            parse("< lightning_distance").unwrap(),
            Expr::ChangeDetect {
                field: Field::LightningDistance,
                direction: Direction::Decrease
            }
        );
    }

    #[test]
    fn multi_word_field_names() {
        let Expr::Comparison(c) = parse("wind speed >= 25 mph").unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.field, Field::WindSpeed);
        assert_eq!(c.unit, Some(Unit::Mph));
    }

    #[test]
    fn negative_literals() {
        let Expr::Comparison(c) = parse("temp < -5C").unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(c.canonical, -5.0);
    }

    #[test]
    fn structural_errors_name_the_connective() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(
            parse("&& humidity > 3"),
            Err(ParseError::LeadingConnective("&&".into()))
        );
        assert_eq!(
            parse("humidity > 3 ||"),
            Err(ParseError::TrailingConnective("||".into()))
        );
        assert_eq!(
            parse("humidity > 3 &&   || uv > 2"),
            Err(ParseError::EmptyOperand("&&   ||".into()))
        );
        assert_eq!(
            parse("x && && y"),
            Err(ParseError::EmptyOperand("&& &&".into()))
        );
    }

    #[test]
    fn term_errors() {
        assert_eq!(
            parse("dewpoint > 10"),
            Err(ParseError::UnknownField("dewpoint".into()))
        );
        assert_eq!(
            parse("humidity"),
            Err(ParseError::MissingComparison("humidity".into()))
        );
        assert_eq!(
            parse("humidity >"),
            Err(ParseError::MissingValue("humidity >".into()))
        );
        assert!(matches!(
            parse("humidity > high"),
            Err(ParseError::Unexpected { expected: "a number", .. })
        ));
        assert!(matches!(
            parse("*lightning_count > 3"),
            Err(ParseError::Unexpected { .. })
        ));
        assert!(matches!(parse("*"), Err(ParseError::Unexpected { .. })));
        assert!(matches!(
            parse("humidity > 1.2.3"),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn unit_mismatch_is_a_parse_error() {
        let err = parse("humidity > 40F").unwrap_err();
        assert!(matches!(err, ParseError::Unit(_)));
        assert!(err.to_string().contains("40F"));
    }
}
