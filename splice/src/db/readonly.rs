use crate::error::{Result, SpliceError};

/// Statement kinds the gateway will execute.
const ALLOWED_LEADING: &[&str] = &["SELECT", "WITH", "PRAGMA", "EXPLAIN"];

/// Keyword tokens that mutate the store or its attachment state. Matched as
/// whole words outside string literals and comments, so identifiers like
/// `created_at` pass.
const MUTATING_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "ATTACH", "DETACH", "REPLACE",
    "VACUUM", "REINDEX",
];

/// Verify that `sql` is a single read-only statement. Called before the store
/// is touched; any violation is a `RejectedStatement`.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let stripped = strip_literals_and_comments(sql);

    let statements: Vec<&str> = stripped
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if statements.is_empty() {
        return Err(SpliceError::RejectedStatement(
            "Empty SQL statement".to_string(),
        ));
    }
    if statements.len() > 1 {
        return Err(SpliceError::RejectedStatement(
            "Multiple SQL statements are not allowed; submit a single query".to_string(),
        ));
    }

    let statement = statements[0];
    let leading = first_word(statement).to_uppercase();
    if !ALLOWED_LEADING.contains(&leading.as_str()) {
        return Err(SpliceError::RejectedStatement(format!(
            "Only SELECT, WITH, PRAGMA and EXPLAIN statements are allowed, got '{leading}'"
        )));
    }

    for word in words(&stripped) {
        let upper = word.to_uppercase();
        if MUTATING_KEYWORDS.contains(&upper.as_str()) {
            return Err(SpliceError::RejectedStatement(format!(
                "Statement contains mutating keyword '{upper}'; only read-only queries are allowed"
            )));
        }
    }

    Ok(())
}

/// Replace the contents of string literals, quoted identifiers and comments
/// with spaces so keyword scanning only sees real SQL tokens.
fn strip_literals_and_comments(sql: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        SingleQuote,
        DoubleQuote,
        Backtick,
        Bracket,
        LineComment,
        BlockComment,
    }

    let mut state = State::Normal;
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::SingleQuote;
                    out.push(' ');
                }
                '"' => {
                    state = State::DoubleQuote;
                    out.push(' ');
                }
                '`' => {
                    state = State::Backtick;
                    out.push(' ');
                }
                '[' => {
                    state = State::Bracket;
                    out.push(' ');
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    out.push(' ');
                }
                other => out.push(other),
            },
            State::SingleQuote => {
                if c == '\'' {
                    // '' escapes a quote inside the literal
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        state = State::Normal;
                    }
                }
                out.push(' ');
            }
            State::DoubleQuote => {
                if c == '"' {
                    state = State::Normal;
                }
                out.push(' ');
            }
            State::Backtick => {
                if c == '`' {
                    state = State::Normal;
                }
                out.push(' ');
            }
            State::Bracket => {
                if c == ']' {
                    state = State::Normal;
                }
                out.push(' ');
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                }
                out.push(' ');
            }
        }
    }

    out
}

fn first_word(statement: &str) -> &str {
    statement
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty())
        .unwrap_or("")
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
}
