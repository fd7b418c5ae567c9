//! Task-name parser.
//!
//! Splits a requested task name such as `:app:assembleFreeRelease` into its
//! recognized prefix and the variant token that follows it.

use regex_lite::Regex;

use crate::ResolverError;

/// A task name matched against one recognized prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTaskName {
    /// The recognized prefix (e.g. "assemble").
    pub prefix: String,

    /// Capitalized variant token after the prefix (e.g. "FreeRelease").
    pub token: String,

    /// Project path the name was qualified with, normalized to `:a:b:`.
    pub qualifier: Option<String>,
}

impl ParsedTaskName {
    /// Unqualified name of the task this token was taken from.
    pub fn task_name(&self) -> String {
        format!("{}{}", self.prefix, self.token)
    }

    /// `task` qualified with the same project path, if the name had one.
    pub fn qualify(&self, task: &str) -> Option<String> {
        self.qualifier.as_ref().map(|q| format!("{}{}", q, task))
    }

    /// Variant identifier for the token (`FreeRelease` -> `freeRelease`).
    pub fn variant(&self) -> String {
        decapitalize(&self.token)
    }
}

/// Compiled matcher for one task-name prefix.
#[derive(Debug, Clone)]
pub struct TaskNamePattern {
    prefix: String,
    regex: Regex,
}

impl TaskNamePattern {
    /// Compile a pattern for `prefix`, optionally restricted to `project`.
    ///
    /// Without a project, any leading project path (`:a:b:`) is tolerated.
    /// With a project, a qualified name must end in that project's path segment.
    pub fn new(prefix: &str, project: Option<&str>) -> Result<Self, ResolverError> {
        if prefix.is_empty() {
            return Err(ResolverError::InvalidPrefix(prefix.to_string()));
        }
        let qualifier = match project {
            Some(p) => format!(r"((?::?(?:[\w.\-]+:)*{}:)?)", regex_lite::escape(p)),
            None => r"(:?(?:[\w.\-]+:)*)".to_string(),
        };
        let source = format!(r"^{}{}(\w+)$", qualifier, regex_lite::escape(prefix));
        let regex = Regex::new(&source).map_err(|e| ResolverError::InvalidPattern {
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            prefix: prefix.to_string(),
            regex,
        })
    }

    /// The prefix this pattern recognizes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Match a raw task name, returning the variant token when it fits.
    pub fn parse(&self, task_name: &str) -> Option<ParsedTaskName> {
        let captures = self.regex.captures(task_name.trim())?;
        let token = captures.get(2)?.as_str();
        let qualifier = captures
            .get(1)
            .map(|m| m.as_str().trim_start_matches(':'))
            .filter(|q| !q.is_empty())
            .map(|q| format!(":{}", q));
        Some(ParsedTaskName {
            prefix: self.prefix.clone(),
            token: capitalize(token),
            qualifier,
        })
    }
}

/// Parse a task name against several patterns; the first match wins.
pub fn parse_task_name(patterns: &[TaskNamePattern], task_name: &str) -> Option<ParsedTaskName> {
    patterns.iter().find_map(|p| p.parse(task_name))
}

/// Uppercase the first ASCII character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Lowercase the first ASCII character.
pub fn decapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
