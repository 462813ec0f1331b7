//! Canonicalization of option text before comparison.
//!
//! MySQL echoes table options back in its own layout: partition clauses
//! come wrapped in version comments (`/*!50500 ... */`), with doubled
//! spaces and line breaks that differ from what was declared. Values are
//! compared only after passing through [`canonicalize`].

use crate::options::{OptionKey, OptionValue};

/// Errors raised when option text cannot be canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// A quoted literal is never closed.
    #[error("unterminated quoted literal starting at byte {0}")]
    UnterminatedQuote(usize),

    /// A comment is never closed.
    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),

    /// A `*/` appears without an opening comment.
    #[error("unexpected comment terminator at byte {0}")]
    UnexpectedCommentEnd(usize),

    /// Parentheses do not balance.
    #[error("unbalanced parenthesis at byte {0}")]
    UnbalancedParenthesis(usize),
}

/// A lexical unit of an options clause.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
    Open,
    Close,
    Comma,
    Equals,
}

/// Splits an options clause into tokens, dropping whitespace and
/// comments. Version comment markers are dropped but their content kept.
struct ClauseLexer<'a> {
    input: &'a str,
    pos: usize,
    version_comments: Vec<usize>,
    parens: Vec<usize>,
}

impl<'a> ClauseLexer<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            version_comments: Vec::new(),
            parens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokenize(mut self) -> Result<Vec<Token<'a>>, NormalizeError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let start = self.pos;

            if c.is_whitespace() {
                self.advance();
            } else if self.rest().starts_with("/*!") {
                self.pos += 3;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                self.version_comments.push(start);
            } else if self.rest().starts_with("/*") {
                match self.rest()[2..].find("*/") {
                    Some(end) => self.pos += 2 + end + 2,
                    None => return Err(NormalizeError::UnterminatedComment(start)),
                }
            } else if self.rest().starts_with("*/") {
                if self.version_comments.pop().is_none() {
                    return Err(NormalizeError::UnexpectedCommentEnd(start));
                }
                self.pos += 2;
            } else if matches!(c, '\'' | '"' | '`') {
                tokens.push(self.quoted(c)?);
            } else if c == '(' {
                self.advance();
                self.parens.push(start);
                tokens.push(Token::Open);
            } else if c == ')' {
                self.advance();
                if self.parens.pop().is_none() {
                    return Err(NormalizeError::UnbalancedParenthesis(start));
                }
                tokens.push(Token::Close);
            } else if c == ',' {
                self.advance();
                tokens.push(Token::Comma);
            } else if c == '=' {
                self.advance();
                tokens.push(Token::Equals);
            } else {
                tokens.push(self.word());
            }
        }

        if let Some(start) = self.version_comments.pop() {
            return Err(NormalizeError::UnterminatedComment(start));
        }
        if let Some(start) = self.parens.pop() {
            return Err(NormalizeError::UnbalancedParenthesis(start));
        }

        Ok(tokens)
    }

    /// Reads a quoted literal. A doubled quote or a backslash escape does
    /// not terminate it.
    fn quoted(&mut self, quote: char) -> Result<Token<'a>, NormalizeError> {
        let start = self.pos;
        self.advance();

        loop {
            match self.advance() {
                None => return Err(NormalizeError::UnterminatedQuote(start)),
                Some('\\') if quote != '`' => {
                    if self.advance().is_none() {
                        return Err(NormalizeError::UnterminatedQuote(start));
                    }
                }
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance();
                    } else {
                        return Ok(Token::Quoted(&self.input[start..self.pos]));
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn word(&mut self) -> Token<'a> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace()
                || matches!(c, '(' | ')' | ',' | '=' | '\'' | '"' | '`')
                || self.rest().starts_with("/*")
                || self.rest().starts_with("*/")
            {
                break;
            }
            self.advance();
        }
        Token::Word(&self.input[start..self.pos])
    }
}

/// Canonicalizes a raw options string or partition clause.
///
/// Version comment markers are stripped, plain comments removed, unquoted
/// words upper-cased and spacing rebuilt from tokens: nothing around `=`,
/// after `(`, or before `(`, `)` and `,`; one space after `,` and between
/// words. Quoted literals are kept byte for byte. The result is a fixed
/// point: normalizing it again returns it unchanged.
///
/// # Errors
///
/// Fails on unterminated quotes or comments and unbalanced parentheses.
pub fn normalize_clause(text: &str) -> Result<String, NormalizeError> {
    let tokens = ClauseLexer::new(text).tokenize()?;

    let mut out = String::with_capacity(text.len());
    let mut prev: Option<&Token<'_>> = None;

    for token in &tokens {
        let spaced = match (prev, token) {
            (None, _) => false,
            (_, Token::Open | Token::Close | Token::Comma | Token::Equals) => false,
            (Some(Token::Open | Token::Equals), _) => false,
            _ => true,
        };
        if spaced {
            out.push(' ');
        }

        match token {
            Token::Word(word) => out.push_str(&word.to_ascii_uppercase()),
            Token::Quoted(literal) => out.push_str(literal),
            Token::Open => out.push('('),
            Token::Close => out.push(')'),
            Token::Comma => out.push(','),
            Token::Equals => out.push('='),
        }
        prev = Some(token);
    }

    Ok(out)
}

/// Returns the comparison form of an option value.
///
/// Engine, charset and collation compare case-insensitively; raw options
/// and partition clauses go through [`normalize_clause`]. Comments,
/// primary keys and unknown keys compare as given.
///
/// # Errors
///
/// Fails when clause text cannot be tokenized, see [`normalize_clause`].
pub fn canonicalize(key: &OptionKey, value: &OptionValue) -> Result<OptionValue, NormalizeError> {
    match (key, value) {
        (OptionKey::Engine | OptionKey::Charset | OptionKey::Collation, OptionValue::Text(text)) => {
            Ok(OptionValue::Text(text.trim().to_ascii_lowercase()))
        }
        (OptionKey::Options | OptionKey::Partition, OptionValue::Text(text)) => {
            normalize_clause(text).map(OptionValue::Text)
        }
        _ => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARED: &str = "/*!50500 PARTITION BY RANGE COLUMNS(created_at)\n\
        (PARTITION p201610 VALUES LESS THAN ('2016-10-01') ENGINE = InnoDB,\n \
        PARTITION p201611 VALUES LESS THAN ('2016-11-01') ENGINE = InnoDB) */";

    const ECHOED: &str = "/*!50500 PARTITION BY RANGE  COLUMNS(created_at)\n\
        (PARTITION p201610 VALUES LESS THAN ('2016-10-01') ENGINE = InnoDB,\n \
        PARTITION p201611 VALUES LESS THAN ('2016-11-01') ENGINE = InnoDB) */";

    #[test]
    fn test_partition_formatting_differences_are_equal() {
        assert_ne!(DECLARED, ECHOED);
        assert_eq!(
            normalize_clause(DECLARED).unwrap(),
            normalize_clause(ECHOED).unwrap()
        );
    }

    #[test]
    fn test_partition_canonical_form() {
        assert_eq!(
            normalize_clause(DECLARED).unwrap(),
            "PARTITION BY RANGE COLUMNS(CREATED_AT)(PARTITION P201610 VALUES LESS THAN('2016-10-01') \
             ENGINE=INNODB, PARTITION P201611 VALUES LESS THAN('2016-11-01') ENGINE=INNODB)"
        );
    }

    #[test]
    fn test_version_comment_is_optional() {
        let bare = "PARTITION BY HASH (id) PARTITIONS 4";
        let wrapped = "/*!50100 PARTITION BY HASH (id)\nPARTITIONS 4 */";
        assert_eq!(
            normalize_clause(bare).unwrap(),
            normalize_clause(wrapped).unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        for text in [
            DECLARED,
            ECHOED,
            "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            "ROW_FORMAT = COMPRESSED  KEY_BLOCK_SIZE=8",
            "COMMENT='it''s  spaced' /* note */ ENGINE=MyISAM",
            "",
        ] {
            let once = normalize_clause(text).unwrap();
            let twice = normalize_clause(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {text:?}");
        }
    }

    #[test]
    fn test_quoted_literals_untouched() {
        assert_eq!(
            normalize_clause("COMMENT = 'Mixed  Case, (kept)'").unwrap(),
            "COMMENT='Mixed  Case, (kept)'"
        );
    }

    #[test]
    fn test_spacing_around_equals() {
        assert_eq!(
            normalize_clause("ENGINE = InnoDB").unwrap(),
            normalize_clause("ENGINE=InnoDB").unwrap()
        );
    }

    #[test]
    fn test_different_partitions_stay_different() {
        let other = DECLARED.replace("2016-11-01", "2016-12-01");
        assert_ne!(
            normalize_clause(DECLARED).unwrap(),
            normalize_clause(&other).unwrap()
        );
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            normalize_clause("COMMENT='oops"),
            Err(NormalizeError::UnterminatedQuote(8))
        );
    }

    #[test]
    fn test_unterminated_version_comment() {
        assert_eq!(
            normalize_clause("/*!50100 PARTITION BY HASH(id)"),
            Err(NormalizeError::UnterminatedComment(0))
        );
    }

    #[test]
    fn test_stray_comment_end() {
        assert!(matches!(
            normalize_clause("PARTITION BY HASH(id) */"),
            Err(NormalizeError::UnexpectedCommentEnd(_))
        ));
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        assert!(matches!(
            normalize_clause("PARTITION BY HASH(id"),
            Err(NormalizeError::UnbalancedParenthesis(_))
        ));
        assert!(matches!(
            normalize_clause("PARTITION BY HASH id)"),
            Err(NormalizeError::UnbalancedParenthesis(_))
        ));
    }

    #[test]
    fn test_canonicalize_by_kind() {
        assert_eq!(
            canonicalize(&OptionKey::Engine, &OptionValue::from("InnoDB")).unwrap(),
            OptionValue::from("innodb")
        );
        assert_eq!(
            canonicalize(&OptionKey::Comment, &OptionValue::from("Keep  Me")).unwrap(),
            OptionValue::from("Keep  Me")
        );
        assert_eq!(
            canonicalize(
                &OptionKey::Other("row_format".to_string()),
                &OptionValue::from("Dynamic")
            )
            .unwrap(),
            OptionValue::from("Dynamic")
        );
    }
}
