//! DQL Lexer.

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind and payload.
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `@`
    At,
    /// `~`
    Tilde,
    /// A lone `.`, which terminates schema lines.
    Dot,
    /// Bare or `<angle-bracketed>` name. Names may contain dots.
    Identifier(String),
    /// Double-quoted string with escapes resolved.
    String(String),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// Hex entity id such as `0x1f`.
    Hex(u64),
    /// `/pattern/flags`.
    Regex {
        /// Pattern text between the slashes.
        pattern: String,
        /// Trailing flag letters.
        flags: String,
    },
    /// Something the lexer could not read.
    Invalid(String),
}

/// Converts DQL text into tokens.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    /// Reads every token. Comments (`# ...`) and whitespace are skipped.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_trivia();
        let (position, c) = self.chars.next()?;
        let kind = match c {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '@' => TokenKind::At,
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,
            '"' => self.read_string(),
            '/' => self.read_regex(),
            '<' => self.read_bracketed_name(position),
            '-' if self.peek_is(|c| c.is_ascii_digit()) => self.read_number(position),
            c if c.is_ascii_digit() => self.read_number(position),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(position),
            other => TokenKind::Invalid(other.to_string()),
        };
        Some(Token { kind, position })
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '#' {
                while let Some((_, c)) = self.chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_is(&mut self, pred: impl Fn(char) -> bool) -> bool {
        self.chars.peek().is_some_and(|&(_, c)| pred(c))
    }

    fn is_name_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn read_identifier(&mut self, start: usize) -> TokenKind {
        let mut end = start + 1;
        loop {
            match self.chars.peek() {
                Some(&(i, c)) if Self::is_name_char(c) => {
                    self.chars.next();
                    end = i + c.len_utf8();
                }
                // A dot only continues a name when a name character follows.
                Some(&(i, '.'))
                    if self.source[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(Self::is_name_char) =>
                {
                    self.chars.next();
                    end = i + 1;
                }
                Some(&(i, '@')) => match Self::language_tag(&self.source[i + 1..]) {
                    Some(len) => {
                        for _ in 0..=len {
                            self.chars.next();
                        }
                        end = i + 1 + len;
                    }
                    None => break,
                },
                _ => break,
            }
        }
        TokenKind::Identifier(self.source[start..end].to_string())
    }

    /// Length of a language tag (`en`, `pt-BR`) at the start of `rest`.
    /// A name followed by `(` is a directive, not a tag.
    fn language_tag(rest: &str) -> Option<usize> {
        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        (!rest[len..].starts_with('(')).then_some(len)
    }

    fn read_bracketed_name(&mut self, start: usize) -> TokenKind {
        for (i, c) in self.chars.by_ref() {
            if c == '>' {
                return TokenKind::Identifier(self.source[start + 1..i].to_string());
            }
        }
        TokenKind::Invalid(self.source[start..].to_string())
    }

    fn read_number(&mut self, start: usize) -> TokenKind {
        let rest = &self.source[start..];
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.chars.next();
            let mut end = start + 2;
            while let Some(&(i, c)) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    self.chars.next();
                    end = i + 1;
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&self.source[start + 2..end], 16)
                .map_or_else(|_| TokenKind::Invalid(rest[..end - start].to_string()), TokenKind::Hex);
        }

        let mut end = start + 1;
        let mut is_float = false;
        while let Some(&(i, c)) = self.chars.peek() {
            let fraction_dot = c == '.'
                && !is_float
                && self.source[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|n| n.is_ascii_digit());
            if c.is_ascii_digit() || fraction_dot || c == 'e' || c == 'E' {
                is_float |= c == '.' || c == 'e' || c == 'E';
                self.chars.next();
                end = i + 1;
            } else {
                break;
            }
        }
        let text = &self.source[start..end];
        if is_float {
            text.parse()
                .map_or_else(|_| TokenKind::Invalid(text.to_string()), TokenKind::Float)
        } else {
            text.parse()
                .map_or_else(|_| TokenKind::Invalid(text.to_string()), TokenKind::Integer)
        }
    }

    fn read_string(&mut self) -> TokenKind {
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '"' => return TokenKind::String(value),
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                other => value.push(other),
            }
        }
        TokenKind::Invalid(format!("unterminated string \"{value}"))
    }

    fn read_regex(&mut self) -> TokenKind {
        let mut pattern = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '/' => {
                    let mut flags = String::new();
                    while let Some(&(_, f)) = self.chars.peek() {
                        if f.is_ascii_alphabetic() {
                            flags.push(f);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    return TokenKind::Regex { pattern, flags };
                }
                '\\' => {
                    // Keep escapes for the regex engine, except an escaped slash.
                    match self.chars.next() {
                        Some((_, '/')) => pattern.push('/'),
                        Some((_, other)) => {
                            pattern.push('\\');
                            pattern.push(other);
                        }
                        None => break,
                    }
                }
                other => pattern.push(other),
            }
        }
        TokenKind::Invalid(format!("unterminated regex /{pattern}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_punctuation_and_names() {
        assert_eq!(
            kinds("{ q(func: uid(0x1f)) { dgraph.type } }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Identifier("q".into()),
                TokenKind::LParen,
                TokenKind::Identifier("func".into()),
                TokenKind::Colon,
                TokenKind::Identifier("uid".into()),
                TokenKind::LParen,
                TokenKind::Hex(0x1f),
                TokenKind::RParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Identifier("dgraph.type".into()),
                TokenKind::RBrace,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("12 -3 2.5 1e3"),
            vec![
                TokenKind::Integer(12),
                TokenKind::Integer(-3),
                TokenKind::Float(2.5),
                TokenKind::Float(1000.0),
            ]
        );
    }

    #[test]
    fn test_strings_and_regex() {
        assert_eq!(
            kinds(r#""a \"b\"" /^Ab.*$/i"#),
            vec![
                TokenKind::String("a \"b\"".into()),
                TokenKind::Regex {
                    pattern: "^Ab.*$".into(),
                    flags: "i".into()
                },
            ]
        );
    }

    #[test]
    fn test_schema_line_terminator() {
        assert_eq!(
            kinds("User.name: string ."),
            vec![
                TokenKind::Identifier("User.name".into()),
                TokenKind::Colon,
                TokenKind::Identifier("string".into()),
                TokenKind::Dot,
            ]
        );
        assert_eq!(
            kinds("age: int."),
            vec![
                TokenKind::Identifier("age".into()),
                TokenKind::Colon,
                TokenKind::Identifier("int".into()),
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_bracketed_names_and_comments() {
        assert_eq!(
            kinds("<Branch.proj> # trailing\n ~<Project.name>"),
            vec![
                TokenKind::Identifier("Branch.proj".into()),
                TokenKind::Tilde,
                TokenKind::Identifier("Project.name".into()),
            ]
        );
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(
            kinds("name@en name@pt-BR q(func: has(name)) @filter(x)"),
            vec![
                TokenKind::Identifier("name@en".into()),
                TokenKind::Identifier("name@pt-BR".into()),
                TokenKind::Identifier("q".into()),
                TokenKind::LParen,
                TokenKind::Identifier("func".into()),
                TokenKind::Colon,
                TokenKind::Identifier("has".into()),
                TokenKind::LParen,
                TokenKind::Identifier("name".into()),
                TokenKind::RParen,
                TokenKind::RParen,
                TokenKind::At,
                TokenKind::Identifier("filter".into()),
                TokenKind::LParen,
                TokenKind::Identifier("x".into()),
                TokenKind::RParen,
            ]
        );
        assert_eq!(
            kinds("title@filter(x)")[..2],
            [
                TokenKind::Identifier("title".into()),
                TokenKind::At,
            ]
        );
    }
}
