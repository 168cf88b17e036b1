//! Statement guard for agent-issued SQL

use dbkey_core::{DatabaseConfig, Error, Result};

/// SQL operations recognised by the guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlOperation {
    Select,
    Show,
    Describe,
    Explain,
    Insert,
    Update,
    Delete,
    Replace,
    /// CREATE, DROP, ALTER, TRUNCATE, RENAME
    Ddl,
    Unknown,
}

impl SqlOperation {
    /// Classify a statement by its leading keyword.
    ///
    /// A `WITH` prefix is classified by the statement that follows the
    /// common table expressions. Text that cannot be scanned is `Unknown`.
    pub fn classify(sql: &str) -> Self {
        match Scan::new(sql) {
            Ok(scan) => Self::from_words(&scan.words),
            Err(_) => SqlOperation::Unknown,
        }
    }

    fn from_words(words: &[Word]) -> Self {
        let Some(first) = words.first() else {
            return SqlOperation::Unknown;
        };

        if !first.is("WITH") {
            return Self::from_keyword(&first.text);
        }

        // CTE bodies sit in parentheses, so the main statement is the first
        // statement keyword back at the WITH clause's own depth
        words[1..]
            .iter()
            .filter(|word| word.depth == first.depth)
            .find_map(|word| match Self::from_keyword(&word.text) {
                op @ (SqlOperation::Select
                | SqlOperation::Insert
                | SqlOperation::Update
                | SqlOperation::Delete
                | SqlOperation::Replace) => Some(op),
                _ => None,
            })
            .unwrap_or(SqlOperation::Unknown)
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => SqlOperation::Select,
            "SHOW" => SqlOperation::Show,
            "DESCRIBE" | "DESC" => SqlOperation::Describe,
            "EXPLAIN" => SqlOperation::Explain,
            "INSERT" => SqlOperation::Insert,
            "UPDATE" => SqlOperation::Update,
            "DELETE" => SqlOperation::Delete,
            "REPLACE" => SqlOperation::Replace,
            "CREATE" | "DROP" | "ALTER" | "TRUNCATE" | "RENAME" => SqlOperation::Ddl,
            _ => SqlOperation::Unknown,
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            SqlOperation::Select
                | SqlOperation::Show
                | SqlOperation::Describe
                | SqlOperation::Explain
        )
    }
}

/// A bare word outside quotes and comments, with its parenthesis depth
#[derive(Debug)]
struct Word {
    text: String,
    depth: usize,
}

impl Word {
    fn is(&self, keyword: &str) -> bool {
        self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Lexical view of a statement: quoted text and comments are skipped
#[derive(Debug, Default)]
struct Scan {
    words: Vec<Word>,
    semicolons: usize,
    line_comment: bool,
}

impl Scan {
    fn new(sql: &str) -> Result<Self> {
        let mut scan = Scan::default();
        let mut depth = 0usize;
        let mut word = String::new();
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                continue;
            }
            scan.end_word(&mut word, depth);

            match c {
                '\'' | '"' | '`' => {
                    let mut closed = false;
                    while let Some(inner) = chars.next() {
                        if inner == '\\' && c != '`' {
                            chars.next();
                        } else if inner == c {
                            // Doubled quote is an escaped quote
                            if chars.peek() == Some(&c) {
                                chars.next();
                            } else {
                                closed = true;
                                break;
                            }
                        }
                    }
                    if !closed {
                        return Err(Error::QueryRejected("unterminated quoted text".to_string()));
                    }
                }
                // MySQL only treats "-- " as a comment when whitespace follows
                '-' if starts_line_comment(&chars) => {
                    scan.line_comment = true;
                    chars.by_ref().find(|&next| next == '\n');
                }
                '#' => {
                    scan.line_comment = true;
                    chars.by_ref().find(|&next| next == '\n');
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    // MySQL executes the body of /*! ... */
                    if chars.peek() == Some(&'!') {
                        return Err(Error::QueryRejected(
                            "executable comments are not allowed".to_string(),
                        ));
                    }
                    let mut previous = '\0';
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if previous == '*' && next == '/' {
                            closed = true;
                            break;
                        }
                        previous = next;
                    }
                    if !closed {
                        return Err(Error::QueryRejected("unterminated comment".to_string()));
                    }
                }
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        Error::QueryRejected("unbalanced parentheses".to_string())
                    })?;
                }
                ';' => scan.semicolons += 1,
                _ => {}
            }
        }
        scan.end_word(&mut word, depth);

        if depth != 0 {
            return Err(Error::QueryRejected("unbalanced parentheses".to_string()));
        }
        Ok(scan)
    }

    fn end_word(&mut self, word: &mut String, depth: usize) {
        if !word.is_empty() {
            self.words.push(Word {
                text: std::mem::take(word),
                depth,
            });
        }
    }

    /// True if `keyword` appears outside every parenthesized group
    fn has_top_level(&self, keyword: &str) -> bool {
        self.words
            .iter()
            .any(|word| word.depth == 0 && word.is(keyword))
    }
}

fn starts_line_comment(rest: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let mut ahead = rest.clone();
    ahead.next() == Some('-') && ahead.next().is_none_or(char::is_whitespace)
}

/// Limits applied to every query sent through a [`crate::ConnectionHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Reject INSERT/UPDATE/DELETE/REPLACE (default: true)
    pub read_only: bool,
    /// LIMIT appended to SELECTs that have none (default: 100)
    pub max_rows: usize,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            read_only: true,
            max_rows: 100,
        }
    }
}

impl From<&DatabaseConfig> for QueryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            read_only: config.read_only,
            max_rows: config.max_rows,
        }
    }
}

impl QueryPolicy {
    /// Create a policy that also allows INSERT, UPDATE, DELETE and REPLACE
    pub fn with_write_enabled() -> Self {
        Self {
            read_only: false,
            ..Default::default()
        }
    }

    /// Validate `sql` and return the statement to execute.
    ///
    /// Exactly one statement is accepted. DDL is always rejected. SELECTs
    /// without a top-level LIMIT get `LIMIT max_rows` appended.
    pub fn prepare(&self, sql: &str) -> Result<String> {
        let statement = sql.trim().trim_end_matches(';').trim_end();
        if statement.is_empty() {
            return Err(Error::QueryRejected("empty statement".to_string()));
        }

        let scan = Scan::new(statement)?;
        if scan.semicolons > 0 {
            return Err(Error::QueryRejected(
                "only a single statement is allowed".to_string(),
            ));
        }

        let operation = SqlOperation::from_words(&scan.words);
        match operation {
            SqlOperation::Ddl => {
                return Err(Error::QueryRejected(
                    "schema changes are not allowed".to_string(),
                ));
            }
            SqlOperation::Unknown => {
                return Err(Error::QueryRejected(
                    "unrecognised statement type".to_string(),
                ));
            }
            op if self.read_only && !op.is_read_only() => {
                return Err(Error::QueryRejected(format!(
                    "{:?} statements are not allowed in read-only mode",
                    op
                )));
            }
            SqlOperation::Select if self.read_only && scan.has_top_level("INTO") => {
                return Err(Error::QueryRejected(
                    "SELECT ... INTO is not allowed in read-only mode".to_string(),
                ));
            }
            _ => {}
        }

        if operation == SqlOperation::Select && !scan.has_top_level("LIMIT") {
            // A trailing line comment would swallow the clause
            let separator = if scan.line_comment { "\n" } else { " " };
            Ok(format!("{}{}LIMIT {}", statement, separator, self.max_rows))
        } else {
            Ok(statement.to_string())
        }
    }
}

/// Check a table or column name before it is spliced into SQL.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(Error::QueryRejected(format!("invalid identifier: {:?}", name)))
    }
}
