//! Cypher text helpers: identifier quoting and the read/write classifier.
//!
//! The classifier is a keyword scan, not a parser. It is good enough to keep
//! accidental writes off the read tool; it is not a security boundary.

use neo4j_mcp_core::StatementKind;

use crate::error::{GraphError, Result};

/// Keywords that make a statement mutating.
const WRITE_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "FOREACH", "LOAD",
];

/// Procedure prefixes (lower-case) known to write.
const WRITE_PROCEDURES: &[&str] = &[
    "apoc.create.",
    "apoc.merge.",
    "apoc.refactor.",
    "apoc.periodic.",
    "apoc.atomic.",
    "apoc.nodes.delete",
    "apoc.schema.assert",
    "db.create.",
    "db.index.fulltext.createnodeindex",
    "db.index.fulltext.createrelationshipindex",
    "db.index.fulltext.drop",
];

const SCHEMA_OBJECTS: &[&str] = &["INDEX", "CONSTRAINT"];

/// Quote a label, relationship type, or property key for interpolation.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(GraphError::invalid("identifier must not be empty"));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote several identifiers, rejecting an empty list.
pub fn quote_all(names: &[String], what: &str) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(GraphError::invalid(format!("{what} must not be empty")));
    }
    names.iter().map(|n| quote_identifier(n)).collect()
}

/// Result of classifying a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: StatementKind,
    /// The keyword or procedure that made the statement a write.
    pub keyword: Option<String>,
}

impl Classification {
    pub fn is_read(&self) -> bool {
        self.kind == StatementKind::Read
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    /// Property access, map projection, label, or parameter name.
    qualified: bool,
}

/// Classify a statement as read, write, or schema.
pub fn classify(statement: &str) -> Classification {
    let words = scan_words(statement);
    let keywords: Vec<(String, &Word)> = words
        .iter()
        .filter(|w| !w.qualified)
        .map(|w| (w.text.to_ascii_uppercase(), w))
        .collect();

    if let [(first, _), rest @ ..] = keywords.as_slice() {
        if (first == "CREATE" || first == "DROP")
            && rest
                .iter()
                .take(3)
                .any(|(k, _)| SCHEMA_OBJECTS.contains(&k.as_str()))
        {
            return Classification {
                kind: StatementKind::Schema,
                keyword: Some(first.clone()),
            };
        }
    }

    for (i, (upper, _)) in keywords.iter().enumerate() {
        if WRITE_KEYWORDS.contains(&upper.as_str()) {
            return write(upper);
        }
        if upper == "IN" && keywords.get(i + 1).is_some_and(|(k, _)| k == "TRANSACTIONS") {
            return write("IN TRANSACTIONS");
        }
        if upper == "CALL" {
            if let Some((_, proc_word)) = keywords.get(i + 1) {
                let name = proc_word.text.to_ascii_lowercase();
                if WRITE_PROCEDURES.iter().any(|p| name.starts_with(p)) {
                    return write(&proc_word.text);
                }
            }
        }
    }

    Classification {
        kind: StatementKind::Read,
        keyword: None,
    }
}

fn write(keyword: &str) -> Classification {
    Classification {
        kind: StatementKind::Write,
        keyword: Some(keyword.to_string()),
    }
}

/// Whether a statement must run in an implicit (auto-commit) transaction:
/// `CALL { ... } IN TRANSACTIONS` or the older `USING PERIODIC COMMIT`.
pub fn requires_auto_commit(statement: &str) -> bool {
    let keywords: Vec<String> = scan_words(statement)
        .into_iter()
        .filter(|w| !w.qualified)
        .map(|w| w.text.to_ascii_uppercase())
        .collect();
    keywords.windows(2).any(|pair| {
        matches!(
            (pair[0].as_str(), pair[1].as_str()),
            ("IN", "TRANSACTIONS") | ("USING", "PERIODIC")
        )
    })
}

/// The first keyword of a statement, upper-cased.
pub fn leading_keyword(statement: &str) -> Option<String> {
    scan_words(statement)
        .into_iter()
        .find(|w| !w.qualified)
        .map(|w| w.text.to_ascii_uppercase())
}

/// Split a statement into words, skipping literals, comments, and quoted names.
fn scan_words(statement: &str) -> Vec<Word> {
    let chars: Vec<char> = statement.chars().collect();
    let mut words = Vec::new();
    let mut i = 0;
    let mut prev_significant: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i = skip_string(&chars, i, c);
                prev_significant = Some(c);
            }
            '`' => {
                i = skip_backtick(&chars, i);
                prev_significant = Some('`');
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric()
                        || chars[i] == '_'
                        || (chars[i] == '.'
                            && chars
                                .get(i + 1)
                                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_')))
                {
                    i += 1;
                }
                let qualified = matches!(prev_significant, Some('.') | Some(':') | Some('$'));
                words.push(Word {
                    text: chars[start..i].iter().collect(),
                    qualified,
                });
                prev_significant = Some('a');
            }
            c if c.is_whitespace() => i += 1,
            _ => {
                prev_significant = Some(c);
                i += 1;
            }
        }
    }
    words
}

fn skip_string(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn skip_backtick(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '`' {
            if chars.get(i + 1) == Some(&'`') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}
