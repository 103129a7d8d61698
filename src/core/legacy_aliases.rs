//! # Legacy Alias Files
//!
//! Reads `<group>.aliases.drushrc.php` and `<name>.alias.drushrc.php` files.
//! These are executable PHP, but in practice they only ever assign array
//! literals, so they are read with a small tokenizer and a recursive-descent
//! parser instead of an interpreter:
//!
//! ```php
//! $aliases['dev'] = array(
//!   'root' => '/var/www/dev',
//!   'remote-host' => 'dev.example.com',
//! );
//! $aliases['live']['root'] = '/var/www/live';
//! ```
//!
//! Statements that do not assign into `$aliases` or `$options` are skipped.
//! Anything malformed inside an assignment is an error.

use crate::{
    constants::{LEGACY_GROUP_ALIAS_SUFFIX, LEGACY_SINGLE_ALIAS_SUFFIX},
    models::AliasRecord,
};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Number, Value};
use std::path::Path;
use thiserror::Error;

/// An error in a legacy alias file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LegacyParseError {
    /// 1-based line of the offending token.
    pub line: usize,
    /// What went wrong.
    pub message: String,
    pub kind: LegacyErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyErrorKind {
    /// Malformed PHP. The whole file is rejected.
    Syntax,
    /// Well-formed PHP this reader cannot evaluate, such as a function call,
    /// a constant or an operator. Only the enclosing statement is dropped.
    Unsupported,
}

type LegacyResult<T> = Result<T, LegacyParseError>;

// --- TOKENIZER ---

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Variable(String),
    Str(String),
    Number(String),
    Ident(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Arrow,
    Comma,
    Assign,
    Semicolon,
    Minus,
    Other(char),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

fn tokenize(text: &str) -> LegacyResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    let at = |idx: usize| chars.get(idx).copied();

    while let Some(c) = at(i) {
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '<' if text_at(&chars, i, "<?php") => i += 5,
            '<' if text_at(&chars, i, "<?") => i += 2,
            '?' if at(i + 1) == Some('>') => i += 2,
            '/' if at(i + 1) == Some('/') => i = skip_line(&chars, i),
            '#' => i = skip_line(&chars, i),
            '/' if at(i + 1) == Some('*') => {
                i += 2;
                loop {
                    match at(i) {
                        None => {
                            return Err(LegacyParseError {
                                line,
                                message: "unterminated block comment".to_string(),
                                kind: LegacyErrorKind::Syntax,
                            });
                        }
                        Some('*') if at(i + 1) == Some('/') => {
                            i += 2;
                            break;
                        }
                        Some(ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            i += 1;
                        }
                    }
                }
            }
            '\'' | '"' => {
                let start_line = line;
                let (value, next, newlines) = read_string(&chars, i, c).ok_or_else(|| {
                    LegacyParseError {
                        line: start_line,
                        message: "unterminated string literal".to_string(),
                        kind: LegacyErrorKind::Syntax,
                    }
                })?;
                tokens.push(Token {
                    tok: Tok::Str(value),
                    line: start_line,
                });
                line += newlines;
                i = next;
            }
            '$' => {
                let end = ident_end(&chars, i + 1);
                let name: String = chars.get(i + 1..end).unwrap_or_default().iter().collect();
                if name.is_empty() {
                    tokens.push(Token { tok: Tok::Other('$'), line });
                    i += 1;
                } else {
                    tokens.push(Token { tok: Tok::Variable(name), line });
                    i = end;
                }
            }
            c if c.is_ascii_digit() => {
                let mut end = i;
                while at(end).is_some_and(|d| d.is_ascii_digit() || d == '.') {
                    end += 1;
                }
                let number: String = chars.get(i..end).unwrap_or_default().iter().collect();
                tokens.push(Token { tok: Tok::Number(number), line });
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = ident_end(&chars, i);
                let ident: String = chars.get(i..end).unwrap_or_default().iter().collect();
                tokens.push(Token { tok: Tok::Ident(ident), line });
                i = end;
            }
            '=' if at(i + 1) == Some('>') => {
                tokens.push(Token { tok: Tok::Arrow, line });
                i += 2;
            }
            _ => {
                let tok = match c {
                    '[' => Tok::LBracket,
                    ']' => Tok::RBracket,
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    ',' => Tok::Comma,
                    '=' => Tok::Assign,
                    ';' => Tok::Semicolon,
                    '-' => Tok::Minus,
                    other => Tok::Other(other),
                };
                tokens.push(Token { tok, line });
                i += 1;
            }
        }
    }

    Ok(tokens)
}

fn text_at(chars: &[char], i: usize, needle: &str) -> bool {
    needle
        .chars()
        .enumerate()
        .all(|(offset, n)| chars.get(i + offset) == Some(&n))
}

fn skip_line(chars: &[char], mut i: usize) -> usize {
    while chars.get(i).is_some_and(|c| *c != '\n') {
        i += 1;
    }
    i
}

fn ident_end(chars: &[char], mut i: usize) -> usize {
    while chars
        .get(i)
        .is_some_and(|c| c.is_alphanumeric() || *c == '_')
    {
        i += 1;
    }
    i
}

/// Reads a quoted string starting at `start` (the opening quote).
/// Returns the unescaped value, the index after the closing quote and the
/// number of newlines crossed.
fn read_string(chars: &[char], start: usize, quote: char) -> Option<(String, usize, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    let mut newlines = 0;

    loop {
        let c = *chars.get(i)?;
        match c {
            c if c == quote => return Some((out, i + 1, newlines)),
            '\\' => {
                let next = *chars.get(i + 1)?;
                let escaped = match (quote, next) {
                    (_, '\\') => Some('\\'),
                    (q, n) if q == n => Some(n),
                    ('"', 'n') => Some('\n'),
                    ('"', 't') => Some('\t'),
                    ('"', 'r') => Some('\r'),
                    ('"', '$') => Some('$'),
                    _ => None,
                };
                match escaped {
                    Some(e) => {
                        out.push(e);
                        i += 2;
                    }
                    None => {
                        out.push('\\');
                        i += 1;
                    }
                }
            }
            other => {
                if other == '\n' {
                    newlines += 1;
                }
                out.push(other);
                i += 1;
            }
        }
    }
}

// --- PARSER ---

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        self.pos += 1;
        tok
    }

    fn error<T>(&self, message: impl Into<String>) -> LegacyResult<T> {
        Err(LegacyParseError {
            line: self.line(),
            message: message.into(),
            kind: LegacyErrorKind::Syntax,
        })
    }

    fn previous_line(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map_or_else(|| self.line(), |t| t.line)
    }

    /// Reports against the token just consumed.
    fn error_at_previous<T>(&self, message: impl Into<String>) -> LegacyResult<T> {
        Err(LegacyParseError {
            line: self.previous_line(),
            message: message.into(),
            kind: LegacyErrorKind::Syntax,
        })
    }

    fn unsupported<T>(&self, line: usize, message: impl Into<String>) -> LegacyResult<T> {
        Err(LegacyParseError {
            line,
            message: message.into(),
            kind: LegacyErrorKind::Unsupported,
        })
    }

    /// Is the next token a binary operator (`.`, `+`, `?` ...)?
    fn at_operator(&self) -> bool {
        match self.peek() {
            Some(Tok::Minus) => true,
            Some(Tok::Other(c)) => matches!(c, '.' | '+' | '*' | '/' | '%' | '?' | ':' | '|' | '&'),
            _ => false,
        }
    }

    fn unsupported_operator<T>(&self) -> LegacyResult<T> {
        let op = match self.peek() {
            Some(Tok::Minus) => '-',
            Some(Tok::Other(c)) => *c,
            _ => '?',
        };
        self.unsupported(self.line(), format!("unsupported operator '{}'", op))
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> LegacyResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("expected {}, found {:?}", what, self.peek()))
        }
    }

    /// Skips to just after the next top-level `;`.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.advance() {
            match tok {
                Tok::LParen | Tok::LBracket => depth += 1,
                Tok::RParen | Tok::RBracket => depth = depth.saturating_sub(1),
                Tok::Semicolon if depth == 0 => return,
                _ => {}
            }
        }
    }

    /// `[key][key]... = value ;` after the variable name.
    fn parse_assignment(&mut self) -> LegacyResult<Option<(Vec<String>, Value)>> {
        let mut keys = Vec::new();
        while self.peek() == Some(&Tok::LBracket) {
            self.pos += 1;
            let key = match self.advance() {
                Some(Tok::Str(s)) | Some(Tok::Number(s)) | Some(Tok::Ident(s)) => s,
                other => return self.error_at_previous(format!("expected array key, found {:?}", other)),
            };
            self.expect(&Tok::RBracket, "']'")?;
            keys.push(key);
        }

        if self.peek() != Some(&Tok::Assign) {
            // `$aliases[] = ...`, `$aliases += ...`, function calls and so on.
            self.skip_statement();
            return Ok(None);
        }
        self.pos += 1;

        let value = self.parse_value()?;
        if self.at_operator() {
            return self.unsupported_operator();
        }
        self.expect(&Tok::Semicolon, "';'")?;
        Ok(Some((keys, value)))
    }

    fn parse_value(&mut self) -> LegacyResult<Value> {
        match self.advance() {
            Some(Tok::Str(s)) => Ok(Value::String(s)),
            Some(Tok::Number(n)) => Ok(number_value(&n)),
            Some(Tok::Minus) => match self.advance() {
                Some(Tok::Number(n)) => Ok(number_value(&format!("-{}", n))),
                other => self.error_at_previous(format!("expected number after '-', found {:?}", other)),
            },
            Some(Tok::LBracket) => self.parse_array_items(&Tok::RBracket),
            Some(Tok::Ident(ident)) => match ident.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                "array" => {
                    self.expect(&Tok::LParen, "'(' after array")?;
                    self.parse_array_items(&Tok::RParen)
                }
                _ => self.unsupported(self.previous_line(), format!("unsupported expression '{}'", ident)),
            },
            Some(Tok::Variable(name)) => {
                self.unsupported(self.previous_line(), format!("unsupported variable '${}'", name))
            }
            other => self.error_at_previous(format!("expected a value, found {:?}", other)),
        }
    }

    /// Items up to and including `close`. A list with no keys becomes a
    /// sequence; otherwise a mapping, with keyless items numbered.
    fn parse_array_items(&mut self, close: &Tok) -> LegacyResult<Value> {
        let mut items: Vec<(Option<Value>, Value)> = Vec::new();

        loop {
            if self.peek() == Some(close) {
                self.pos += 1;
                break;
            }

            let first = self.parse_value()?;
            if self.peek() == Some(&Tok::Arrow) {
                self.pos += 1;
                let value = self.parse_value()?;
                items.push((Some(first), value));
            } else {
                items.push((None, first));
            }

            if self.at_operator() {
                return self.unsupported_operator();
            }
            match self.peek() {
                Some(Tok::Comma) => self.pos += 1,
                Some(t) if t == close => {}
                other => return self.error(format!("expected ',' or end of array, found {:?}", other)),
            }
        }

        if items.iter().all(|(k, _)| k.is_none()) {
            return Ok(Value::Sequence(items.into_iter().map(|(_, v)| v).collect()));
        }

        let mut map = Mapping::new();
        let mut next_index: u64 = 0;
        for (key, value) in items {
            let key = match key {
                Some(Value::Number(n)) => {
                    if let Some(idx) = n.as_u64() {
                        next_index = next_index.max(idx + 1);
                    }
                    Value::String(n.to_string())
                }
                Some(k) => k,
                None => {
                    let k = Value::String(next_index.to_string());
                    next_index += 1;
                    k
                }
            };
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }
}

fn number_value(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        Value::Number(Number::from(i))
    } else if let Ok(f) = text.parse::<f64>() {
        Value::Number(Number::from(f))
    } else {
        Value::String(text.to_string())
    }
}

/// Sets `value` at `keys` inside `root`, creating intermediate mappings.
fn assign_path(root: &mut Mapping, keys: &[String], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };

    let mut current = root;
    for key in parents {
        let slot = current
            .entry(Value::String(key.clone()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !slot.is_mapping() {
            *slot = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(Value::String(last.clone()), value);
}

/// The raw assignments of a legacy file.
#[derive(Debug, Default)]
struct LegacyAssignments {
    aliases: Mapping,
    options: Mapping,
    skipped: Vec<LegacyParseError>,
}

fn parse_assignments(text: &str) -> LegacyResult<LegacyAssignments> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let mut out = LegacyAssignments::default();

    while let Some(tok) = parser.advance() {
        let target = match tok {
            Tok::Variable(name) if name == "aliases" => &mut out.aliases,
            Tok::Variable(name) if name == "options" => &mut out.options,
            Tok::Semicolon => continue,
            _ => {
                parser.skip_statement();
                continue;
            }
        };

        let assignment = match parser.parse_assignment() {
            Ok(assignment) => assignment,
            Err(e) if e.kind == LegacyErrorKind::Unsupported => {
                parser.skip_statement();
                out.skipped.push(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some((keys, value)) = assignment {
            if keys.is_empty() {
                // `$aliases = array(...)` replaces everything assigned so far.
                match value {
                    Value::Mapping(map) => *target = map,
                    _ => return parser.error_at_previous("top-level assignment must be an array"),
                }
            } else {
                assign_path(target, &keys, value);
            }
        }
    }

    Ok(out)
}

// --- NORMALISATION ---

/// Converts one legacy alias definition into the uniform record shape.
fn normalize_record(value: &Value) -> Option<AliasRecord> {
    let Value::Mapping(map) = value else {
        return None;
    };

    let mut record = AliasRecord::new();
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            continue;
        };
        let key = match key {
            "remote-host" => "host",
            "remote-user" => "user",
            other => other,
        };
        record.insert(key, value.clone());
    }
    Some(record)
}

/// What kind of legacy file a path is, and the name derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyFileKind {
    /// `<group>.aliases.drushrc.php`: aliases are named `@<group>.<name>`.
    Group(String),
    /// `<name>.alias.drushrc.php`: aliases are named `@<name>`.
    Single(String),
}

impl LegacyFileKind {
    /// Classifies a path by its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if let Some(group) = name.strip_suffix(LEGACY_GROUP_ALIAS_SUFFIX) {
            return Some(Self::Group(group.to_string()));
        }
        name.strip_suffix(LEGACY_SINGLE_ALIAS_SUFFIX)
            .map(|single| Self::Single(single.to_string()))
    }
}

/// The aliases read from a legacy file.
#[derive(Debug, Default)]
pub struct LegacyAliases {
    /// Canonical alias name -> record.
    pub aliases: IndexMap<String, AliasRecord>,
    /// Statements that were dropped because they use PHP this reader does
    /// not evaluate.
    pub skipped: Vec<LegacyParseError>,
}

/// Parses a legacy file into canonical alias name -> record.
pub fn parse_legacy_aliases(
    kind: &LegacyFileKind,
    text: &str,
) -> Result<LegacyAliases, LegacyParseError> {
    let assignments = parse_assignments(text)?;
    let mut out = IndexMap::new();

    for (name, definition) in &assignments.aliases {
        let Some(name) = name.as_str() else {
            continue;
        };
        let Some(record) = normalize_record(definition) else {
            log::warn!("Legacy alias '{}' is not an array; skipping it", name);
            continue;
        };
        let canonical = match kind {
            LegacyFileKind::Group(group) => format!("@{}.{}", group, name),
            LegacyFileKind::Single(_) => format!("@{}", name),
        };
        out.insert(canonical, record);
    }

    if let LegacyFileKind::Single(single) = kind
        && !assignments.options.is_empty()
    {
        let canonical = format!("@{}", single);
        if let Some(record) = normalize_record(&Value::Mapping(assignments.options)) {
            out.entry(canonical).or_insert(record);
        }
    }

    Ok(LegacyAliases {
        aliases: out,
        skipped: assignments.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_FILE: &str = r#"<?php
/**
 * Example group aliases.
 */
$aliases['dev'] = array(
  'root' => '/var/www/dev',
  'uri' => "dev.example.com",
  'remote-host' => 'dev.example.com', // trailing comment
  'remote-user' => 'deploy',
  'path-aliases' => array('%files' => 'sites/default/files'),
  'ssh-options' => '-p 2222',
);

# Short array syntax works too.
$aliases['live'] = [
  'root' => '/var/www/live',
  'command-specific' => ['sql-sync' => ['no-cache' => TRUE]],
  'databases' => [1, 2, -3],
];
$aliases['live']['uri'] = 'example.com';
if (file_exists('/tmp/x')) { include '/tmp/x'; }
"#;

    #[test]
    fn test_group_file_yields_normalized_records() {
        let kind = LegacyFileKind::Group("example".to_string());
        let aliases = parse_legacy_aliases(&kind, GROUP_FILE).unwrap().aliases;

        let names: Vec<_> = aliases.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["@example.dev", "@example.live"]);

        let dev = aliases.get("@example.dev").unwrap();
        assert_eq!(dev.root(), Some("/var/www/dev"));
        assert_eq!(dev.host(), Some("dev.example.com"));
        assert_eq!(dev.user(), Some("deploy"));
        assert!(dev.get("remote-host").is_none());
        assert!(matches!(dev.get("path-aliases"), Some(Value::Mapping(_))));

        let live = aliases.get("@example.live").unwrap();
        assert_eq!(live.uri(), Some("example.com"));
        assert!(!live.is_remote());
        assert!(matches!(live.get("databases"), Some(Value::Sequence(s)) if s.len() == 3));
    }

    #[test]
    fn test_single_file_with_options() {
        let text = "<?php\n$options['root'] = '/srv/site';\n$options['uri'] = 'site.local';\n";
        let kind = LegacyFileKind::Single("site".to_string());
        let aliases = parse_legacy_aliases(&kind, text).unwrap().aliases;
        assert_eq!(aliases.len(), 1);
        let site = aliases.get("@site").unwrap();
        assert_eq!(site.root(), Some("/srv/site"));
        assert_eq!(site.uri(), Some("site.local"));
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            LegacyFileKind::from_path(Path::new("/a/group.aliases.drushrc.php")),
            Some(LegacyFileKind::Group("group".to_string()))
        );
        assert_eq!(
            LegacyFileKind::from_path(Path::new("/a/one.alias.drushrc.php")),
            Some(LegacyFileKind::Single("one".to_string()))
        );
        assert_eq!(LegacyFileKind::from_path(Path::new("/a/one.site.yml")), None);
    }

    #[test]
    fn test_string_escapes() {
        let text = r#"<?php $aliases['x'] = array('root' => 'it\'s', 'uri' => "a\"b\n");"#;
        let kind = LegacyFileKind::Group("g".to_string());
        let aliases = parse_legacy_aliases(&kind, text).unwrap().aliases;
        let x = aliases.get("@g.x").unwrap();
        assert_eq!(x.root(), Some("it's"));
        assert_eq!(x.uri(), Some("a\"b\n"));
    }

    #[test]
    fn test_malformed_array_reports_line() {
        let text = "<?php\n$aliases['dev'] = array(\n  'root' => ,\n);\n";
        let kind = LegacyFileKind::Group("g".to_string());
        let err = parse_legacy_aliases(&kind, text).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let kind = LegacyFileKind::Group("g".to_string());
        assert!(parse_legacy_aliases(&kind, "<?php $aliases['a'] = 'oops;").is_err());
    }

    #[test]
    fn test_unsupported_expressions_drop_only_their_statement() {
        // --- Setup ---
        let text = r#"<?php
$aliases['computed'] = array(
  'root' => dirname(__FILE__) . '/web',
  'uri' => 'computed.local',
);
$aliases['joined'] = array('root' => '/srv' . '/joined');
$aliases['base'] = array('root' => '/srv/base');
$aliases['child'] = $aliases['base'] + array('uri' => 'child.local');
$aliases['base']['uri'] = BASE_URI;
$aliases['plain'] = ['root' => '/srv/plain'];
"#;
        let kind = LegacyFileKind::Group("g".to_string());

        // --- Execute ---
        let parsed = parse_legacy_aliases(&kind, text).unwrap();

        // --- Assert ---
        let names: Vec<_> = parsed.aliases.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["@g.base", "@g.plain"]);
        assert_eq!(parsed.aliases["@g.base"].root(), Some("/srv/base"));
        assert_eq!(parsed.aliases["@g.base"].uri(), None);

        let lines: Vec<usize> = parsed.skipped.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 6, 8, 9]);
        assert!(parsed.skipped.iter().all(|e| e.kind == LegacyErrorKind::Unsupported));
    }

    #[test]
    fn test_structural_errors_stay_fatal_after_a_skipped_statement() {
        let text = "<?php\n$aliases['a'] = FOO;\n$aliases['b'] = array('root' => '/b' 'x');\n";
        let kind = LegacyFileKind::Group("g".to_string());
        let err = parse_legacy_aliases(&kind, text).unwrap_err();
        assert_eq!(err.kind, LegacyErrorKind::Syntax);
        assert_eq!(err.line, 3);
    }
}
