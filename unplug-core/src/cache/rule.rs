//! Rewrite rules
//!
//! A rule is a fixed group of directive lines that is inserted, compared and
//! removed as one unit. Every rule built here is a single `RewriteRule`, but
//! the rules section is scanned in strides of the rule's line count so longer
//! units stay comparable.

/// A rewrite rule as it appears in the managed section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    lines: Vec<String>,
}

impl Rule {
    /// Serve `target` for the literal `path`, with or without a trailing slash
    pub fn file(path: &str, target: &str) -> Self {
        Self::from_lines(vec![format!("RewriteRule ^{}/?$ {} [L]", escape_pattern(path), target)])
    }

    /// Serve `target` for anything matching `pattern`, used verbatim
    pub fn regexp(pattern: &str, target: &str) -> Self {
        Self::from_lines(vec![format!("RewriteRule {} {} [L]", pattern, target)])
    }

    /// Redirect the literal `path` to `location`
    pub fn redirect(path: &str, location: &str, status: u16) -> Self {
        Self::from_lines(vec![format!(
            "RewriteRule ^{}/?$ {} [R={}]",
            escape_pattern(path),
            location,
            status
        )])
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines in this rule
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// Quote a literal path for use inside a rewrite pattern.
///
/// Regex metacharacters get a backslash; whitespace becomes a hex escape so
/// the directive stays one token.
pub fn escape_pattern(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 8);

    for c in path.chars() {
        match c {
            '.' | '\\' | '+' | '*' | '?' | '[' | '^' | ']' | '$' | '(' | ')' | '{' | '}' | '='
            | '!' | '<' | '>' | '|' | ':' | '-' | '#' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\0' => escaped.push_str("\\000"),
            c if c.is_whitespace() && c.is_ascii() => {
                escaped.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_whitespace() => {
                escaped.push_str(&format!("\\x{{{:x}}}", c as u32));
            }
            c => escaped.push(c),
        }
    }

    escaped
}
