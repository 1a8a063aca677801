//! # SQL Recognition and Highlighting
//!
//! Strings that look like SQL are rendered as formatted, colorized queries
//! instead of plain strings.
//!
//! Keywords come in two tiers:
//!
//! - **Clauses** (`SELECT`, `FROM`, `WHERE`, `ORDER BY`, ...): start a new line, bold blue
//! - **Operators and types** (`AND`, `NULL`, `VARCHAR`, ...): bold green
//!
//! A keyword only counts when it stands between delimiters: whitespace, `,`,
//! `(` before and whitespace, `,`, `)` after. Operators may also touch `=`.
//! `/* comments */` are grayed out and `**markers**` are flagged red.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::Config;
use crate::render::escape_html;

const CLAUSE_KEYWORDS: &str = r"CREATE\s+TABLE|CREATE(?:\s+UNIQUE)?\s+INDEX|SELECT|SHOW|TABLE|STATUS|FULL|COLUMNS|JOIN|UPDATE|INSERT(?:\s+INTO)?|REPLACE(?:\s+INTO)?|DELETE|FROM|WHERE|HAVING|GROUP\s+BY|ORDER\s+BY|LIMIT|OFFSET|SET|VALUES|LEFT\s+JOIN|INNER\s+JOIN|TRUNCATE";

const OPERATOR_KEYWORDS: &str = r"ALL|DISTINCT|DISTINCTROW|AS|USING|ON|AND|OR|IN|IS|NOT|NULL|LIKE|TRUE|FALSE|INTEGER|CLOB|VARCHAR|DATETIME|TIME|DATE|INT|SMALLINT|BIGINT|BOOL|BOOLEAN|DECIMAL|FLOAT|TEXT|DEFAULT|AUTOINCREMENT|DESC|PRIMARY\s+KEY";

/// Column at which long queries are wrapped.
pub const WRAP_WIDTH: usize = 100;

const BREAK: &str = "<br>";

static TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?si)(/\*.+?\*/)|(\*\*.+?\*\*)|\b({CLAUSE_KEYWORDS})\b|\b({OPERATOR_KEYWORDS})\b"
    ))
    .expect("SQL token pattern is valid")
});

// Clause keywords whose optional second word may be dropped
static SHORT_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:INSERT|REPLACE)\b").expect("short clause pattern is valid"));

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"([ \t]*\r?\n){2,}").expect("blank line pattern is valid"));

static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("space pattern is valid"));

/// Kind of a recognised SQL token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind
{
    /// `/* ... */`
    Comment,
    /// `** ... **`
    Error,
    /// Clause keyword, starts a new line.
    Clause,
    /// Operator or type keyword.
    Operator,
}

impl TokenKind
{
    fn from_captures(caps: &Captures<'_>) -> Option<Self>
    {
        if caps.get(1).is_some() {
            Some(TokenKind::Comment)
        } else if caps.get(2).is_some() {
            Some(TokenKind::Error)
        } else if caps.get(3).is_some() {
            Some(TokenKind::Clause)
        } else if caps.get(4).is_some() {
            Some(TokenKind::Operator)
        } else {
            None
        }
    }

    /// Whether a match at `range` of `text` stands between valid delimiters.
    ///
    /// The edges of the text count as delimiters.
    fn is_delimited(self, text: &str, range: &Range<usize>) -> bool
    {
        let before = text[..range.start].chars().next_back();
        let after = text[range.end..].chars().next();
        match self {
            TokenKind::Comment | TokenKind::Error => true,
            TokenKind::Clause => {
                before.map_or(true, |c| c.is_whitespace() || c == ',' || c == '(')
                    && after.map_or(true, |c| c.is_whitespace() || c == ',' || c == ')')
            }
            TokenKind::Operator => {
                before.map_or(true, |c| c.is_whitespace() || matches!(c, ',' | '(' | '='))
                    && after.map_or(true, |c| c.is_whitespace() || matches!(c, ',' | ')' | '='))
            }
        }
    }
}

/// A token found in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token
{
    /// Byte range in the scanned text.
    pub range: Range<usize>,
    /// What was found.
    pub kind: TokenKind,
}

/// Find every delimited token in `text`, left to right, without overlaps.
pub fn tokenize(text: &str) -> Vec<Token>
{
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = TOKENS.captures_at(text, pos) else {
            break;
        };
        let (Some(whole), Some(kind)) = (caps.get(0), TokenKind::from_captures(&caps)) else {
            break;
        };

        let range = whole.range();
        if kind.is_delimited(text, &range) {
            pos = range.end;
            tokens.push(Token { range, kind });
        } else if let Some(range) = shorter_clause(text, &range, kind) {
            pos = range.end;
            tokens.push(Token { range, kind });
        } else {
            // Retry one character further so a shorter keyword can still match
            pos = range.start + text[range.start..].chars().next().map_or(1, char::len_utf8);
        }
    }

    tokens
}

/// `INSERT INTO(` fails the delimiter check, but `INSERT` on its own may pass.
fn shorter_clause(text: &str, range: &Range<usize>, kind: TokenKind) -> Option<Range<usize>>
{
    if kind != TokenKind::Clause {
        return None;
    }
    let short = SHORT_CLAUSE.find(&text[range.start..])?;
    let short = range.start..range.start + short.end();
    (short.end < range.end && kind.is_delimited(text, &short)).then_some(short)
}

/// Whether `text` contains at least one recognised SQL token.
///
/// ```rust
/// use dbgr_core::sql::looks_like_sql;
///
/// assert!(looks_like_sql("SELECT * FROM dual WHERE 1=1;"));
/// assert!(!looks_like_sql("hello world"));
/// ```
pub fn looks_like_sql(text: &str) -> bool
{
    !tokenize(&text.to_uppercase()).is_empty()
}

/// Render `sql` as highlighted HTML.
///
/// Long queries are wrapped at [`WRAP_WIDTH`] columns, blank lines and long
/// runs of spaces are collapsed, and every clause keyword except the first
/// starts a new line. Text that is not a token is HTML-escaped.
pub fn highlight(sql: &str) -> String
{
    let padded = format!(" {sql} ");
    let wrapped = word_wrap(&padded, WRAP_WIDTH);
    let collapsed = BLANK_LINES.replace_all(&wrapped, "\n");
    let text = collapsed.replace("VARCHAR(", "VARCHAR (").replace("            ", " ");

    let mut html = String::with_capacity(text.len() * 2);
    let mut last = 0;
    for token in tokenize(&text) {
        html.push_str(&escape_html(&text[last..token.range.start]));
        let matched = &text[token.range.clone()];
        match token.kind {
            TokenKind::Comment => {
                html.push_str(&format!("<em style=\"color:gray\">{}</em>", escape_html(matched)));
            }
            TokenKind::Error => {
                html.push_str(&format!("<strong style=\"color:red\">{}</strong>", escape_html(matched)));
            }
            TokenKind::Clause => {
                html.push_str(BREAK);
                html.push_str(&format!("<strong style=\"color:blue\">{}</strong>", matched.to_uppercase()));
            }
            TokenKind::Operator => {
                html.push_str(&format!("<strong style=\"color:green\">{}</strong>", matched.to_uppercase()));
            }
        }
        last = token.range.end;
    }
    html.push_str(&escape_html(&text[last..]));

    let html = html.replacen(BREAK, "", 1);
    format!("<span class='dump'>{}</span>", html.trim())
}

/// Deep link that opens `sql` in the configured Adminer instance.
///
/// Returns `None` unless both `adminerUrlLink` and `adminerDatabaseName` are set.
pub fn adminer_link(sql: &str, config: &Config) -> Option<String>
{
    let url = config.adminer_url_link.as_deref()?;
    let database = config.adminer_database_name.as_deref()?;
    let username = config.adminer_username.as_deref().unwrap_or("develop");
    let query = HORIZONTAL_SPACE.replace_all(sql, " ");

    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("username", username)
        .append_pair("db", database)
        .append_pair("sql", query.trim())
        .finish();

    Some(format!(
        "<a class=\"debug-sql-link\" target=\"_blank\" href=\"{}?{}\">Open in Adminer</a>",
        escape_html(url),
        escape_html(&params)
    ))
}

/// Greedy word wrap that never splits words, keeping existing line breaks.
fn word_wrap(text: &str, width: usize) -> String
{
    let mut out = String::with_capacity(text.len() + text.len() / width.max(1));
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut column = 0;
        for (j, word) in line.split(' ').enumerate() {
            let len = word.chars().count();
            if j > 0 {
                if column + 1 + len > width && column > 0 {
                    out.push('\n');
                    column = 0;
                } else {
                    out.push(' ');
                    column += 1;
                }
            }
            out.push_str(word);
            column += len;
        }
    }
    out
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_clause_keywords_need_delimiters()
    {
        let tokens = tokenize(" SELECT a FROM b ");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Clause));

        assert!(tokenize("=SELECT").is_empty());
        assert_eq!(tokenize("=NULL")[0].kind, TokenKind::Operator);
    }

    #[test]
    fn test_multi_word_keywords()
    {
        let text = " ORDER BY id ";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&text[tokens[0].range.clone()], "ORDER BY");
    }

    #[test]
    fn test_optional_second_word_is_dropped_when_undelimited()
    {
        let text = "x INSERT INTO(a)";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&text[tokens[0].range.clone()], "INSERT");
        assert!(looks_like_sql(text));

        let html = highlight("INSERT INTO(a) VALUES (1)");
        assert!(html.starts_with("<span class='dump'><strong style=\"color:blue\">INSERT</strong> INTO(a)"));
    }

    #[test]
    fn test_operator_beside_equals()
    {
        let text = "a=NULL";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&text[tokens[0].range.clone()], "NULL");
    }

    #[test]
    fn test_word_wrap()
    {
        assert_eq!(word_wrap("aaa bbb ccc", 7), "aaa bbb\nccc");
        assert_eq!(word_wrap("a\nb", 7), "a\nb");
        assert_eq!(word_wrap("abcdefghij x", 4), "abcdefghij\nx");
    }

    #[test]
    fn test_highlight_escapes_literals()
    {
        let html = highlight("SELECT * FROM t WHERE a < '<b>'");
        assert!(html.contains("&lt; &#039;&lt;b&gt;&#039;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_highlight_comments_and_markers()
    {
        let html = highlight("SELECT 1 /* why */ **oops**");
        assert!(html.contains("<em style=\"color:gray\">/* why */</em>"));
        assert!(html.contains("<strong style=\"color:red\">**oops**</strong>"));
    }
}
