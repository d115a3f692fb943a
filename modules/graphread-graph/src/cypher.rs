//! Local analysis of Cypher templates.
//!
//! The runner never interprets a query; it only needs two facts about it before
//! talking to the database: which `$placeholders` must be bound, and which
//! columns the final `RETURN` projects (and in what order). Both are found with
//! a small tokenizer that skips string literals, comments and backquoted names.

use std::collections::BTreeSet;

use graphread_common::QueryError;

/// Placeholders and projected columns of a query template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShape {
    pub placeholders: BTreeSet<String>,
    pub columns: Vec<String>,
}

impl QueryShape {
    pub fn parse(template: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(template);
        let placeholders = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                Kind::Param(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        let columns = projection(template, &tokens)?;
        Ok(Self {
            placeholders,
            columns,
        })
    }
}

/// Names of every `$placeholder` referenced by the template.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    tokenize(template)
        .into_iter()
        .filter_map(|t| match t.kind {
            Kind::Param(name) => Some(name),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Word { quoted: bool },
    Param(String),
    Str,
    Open,
    Close,
    Comma,
    Semicolon,
    Other(char),
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

impl Token {
    fn is_keyword(&self, src: &str, keyword: &str) -> bool {
        matches!(self.kind, Kind::Word { quoted: false })
            && src[self.start..self.end].eq_ignore_ascii_case(keyword)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn tokenize(src: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let end_of = |i: usize| chars.get(i).map(|(pos, _)| *pos).unwrap_or(src.len());
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i].1 == '*' && chars.get(i + 1).map(|(_, c)| *c) == Some('/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else if c == '\'' || c == '"' {
            i += 1;
            while i < chars.len() && chars[i].1 != c {
                if chars[i].1 == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(chars.len());
            tokens.push(Token {
                kind: Kind::Str,
                start,
                end: end_of(i),
            });
        } else if c == '`' {
            i = skip_backquoted(&chars, i);
            tokens.push(Token {
                kind: Kind::Word { quoted: true },
                start,
                end: end_of(i),
            });
        } else if c == '$' {
            i += 1;
            let name = if chars.get(i).map(|(_, c)| *c) == Some('`') {
                let open = i;
                i = skip_backquoted(&chars, i);
                unquote(&src[end_of(open)..end_of(i)]).to_string()
            } else {
                let from = i;
                while i < chars.len() && is_ident_char(chars[i].1) {
                    i += 1;
                }
                src[end_of(from)..end_of(i)].to_string()
            };
            let kind = if name.is_empty() {
                Kind::Other('$')
            } else {
                Kind::Param(name)
            };
            tokens.push(Token {
                kind,
                start,
                end: end_of(i),
            });
        } else if is_ident_char(c) {
            while i < chars.len() && is_ident_char(chars[i].1) {
                i += 1;
            }
            tokens.push(Token {
                kind: Kind::Word { quoted: false },
                start,
                end: end_of(i),
            });
        } else {
            let kind = match c {
                '(' | '[' | '{' => Kind::Open,
                ')' | ']' | '}' => Kind::Close,
                ',' => Kind::Comma,
                ';' => Kind::Semicolon,
                other => Kind::Other(other),
            };
            i += 1;
            tokens.push(Token {
                kind,
                start,
                end: end_of(i),
            });
        }
    }

    tokens
}

/// Index just past the closing backquote of the name starting at `i`.
/// A doubled backquote inside the name is an escaped backquote.
fn skip_backquoted(chars: &[(usize, char)], mut i: usize) -> usize {
    i += 1;
    while i < chars.len() {
        if chars[i].1 == '`' {
            if chars.get(i + 1).map(|(_, c)| *c) == Some('`') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(raw)
}

/// Columns of the last top-level RETURN, in projection order.
fn projection(src: &str, tokens: &[Token]) -> Result<Vec<String>, QueryError> {
    let mut depth = 0usize;
    let mut return_at = None;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            Kind::Open => depth += 1,
            Kind::Close => depth = depth.saturating_sub(1),
            _ => {
                if depth == 0
                    && token.is_keyword(src, "RETURN")
                    && !is_name_position(src, tokens, idx)
                {
                    return_at = Some(idx);
                }
            }
        }
    }
    let Some(return_at) = return_at else {
        return Err(QueryError::MissingReturn);
    };

    let mut rest = &tokens[return_at + 1..];
    if rest.first().is_some_and(|t| t.is_keyword(src, "DISTINCT")) {
        rest = &rest[1..];
    }

    let mut items: Vec<&[Token]> = Vec::new();
    let mut depth = 0usize;
    let mut item_start = 0;
    let mut item_end = rest.len();
    for (idx, token) in rest.iter().enumerate() {
        match token.kind {
            Kind::Open => depth += 1,
            Kind::Close => depth = depth.saturating_sub(1),
            Kind::Comma if depth == 0 => {
                items.push(&rest[item_start..idx]);
                item_start = idx + 1;
            }
            Kind::Semicolon if depth == 0 => {
                item_end = idx;
                break;
            }
            _ if depth == 0 && ends_projection(src, rest, idx) => {
                item_end = idx;
                break;
            }
            _ => {}
        }
    }
    if item_start <= item_end {
        items.push(&rest[item_start..item_end]);
    }

    let mut columns = Vec::new();
    for item in items.into_iter().filter(|item| !item.is_empty()) {
        columns.push(column_name(src, item)?);
    }
    if columns.is_empty() {
        return Err(QueryError::MissingReturn);
    }
    Ok(columns)
}

/// A word right after `.` or `AS` is a property or alias name, never a clause keyword.
fn is_name_position(src: &str, tokens: &[Token], idx: usize) -> bool {
    idx > 0 && {
        let prev = &tokens[idx - 1];
        prev.kind == Kind::Other('.') || prev.is_keyword(src, "AS")
    }
}

fn ends_projection(src: &str, tokens: &[Token], idx: usize) -> bool {
    if is_name_position(src, tokens, idx) {
        return false;
    }
    let token = &tokens[idx];
    if token.is_keyword(src, "SKIP") || token.is_keyword(src, "LIMIT") || token.is_keyword(src, "UNION") {
        return true;
    }
    token.is_keyword(src, "ORDER")
        && tokens
            .get(idx + 1)
            .is_some_and(|next| next.is_keyword(src, "BY"))
}

fn column_name(src: &str, item: &[Token]) -> Result<String, QueryError> {
    let first = &item[0];
    let last = &item[item.len() - 1];

    if item.len() == 1 && first.kind == Kind::Other('*') {
        return Err(QueryError::UnsupportedProjection("*".to_string()));
    }

    if item.len() >= 3 && item[item.len() - 2].is_keyword(src, "AS") {
        if let Kind::Word { quoted } = last.kind {
            let alias = &src[last.start..last.end];
            let alias = if quoted {
                unquote(alias).replace("``", "`")
            } else {
                alias.to_string()
            };
            return Ok(alias);
        }
    }

    Ok(src[first.start..last.end].trim().to_string())
}
