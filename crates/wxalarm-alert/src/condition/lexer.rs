use crate::error::ParseError;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Field name or unit suffix.
    Word,
    Number,
    /// One of `> < >= <= == !=`.
    CompOp,
    Star,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Range<usize>,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                i += 2;
                TokenKind::And
            }
            b'|' if bytes.get(i + 1) == Some(&b'|') => {
                i += 2;
                TokenKind::Or
            }
            b'>' | b'<' | b'=' | b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                } else if c == b'>' || c == b'<' {
                    i += 1;
                } else {
                    return Err(ParseError::InvalidCharacter(c as char, i));
                }
                TokenKind::CompOp
            }
            b'*' => {
                i += 1;
                TokenKind::Star
            }
            b'-' | b'.' | b'0'..=b'9' => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                TokenKind::Number
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                i += 1;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'/')
                {
                    i += 1;
                }
                TokenKind::Word
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or('?');
                return Err(ParseError::InvalidCharacter(ch, i));
            }
        };

        tokens.push(Token {
            kind,
            text: &src[start..i],
            span: start..i,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn splits_number_from_unit_suffix() {
        let tokens = tokenize("temperature>85F").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, ["temperature", ">", "85", "F"]);
        assert_eq!(tokens[2].span, 12..14);
    }

    #[test]
    fn unit_with_slash_is_one_word() {
        assert_eq!(
            kinds("wind_speed >= 10m/s"),
            [TokenKind::Word, TokenKind::CompOp, TokenKind::Number, TokenKind::Word]
        );
    }

    #[test]
    fn change_prefix_and_connectives() {
        assert_eq!(
            kinds("*lightning_count || >rain_rate"),
            [
                TokenKind::Star,
                TokenKind::Word,
                TokenKind::Or,
                TokenKind::CompOp,
                TokenKind::Word
            ]
        );
    }

    #[test]
    fn single_ampersand_is_rejected() {
        assert_eq!(
            tokenize("a & b"),
            Err(ParseError::InvalidCharacter('&', 2))
        );
        assert!(tokenize("temp = 3").is_err());
    }
}
