//! URL rewrite rules: compilation and first-match lookup.

use crate::config::RuleConfig;
use crate::error::ConfigError;
use regex::{Captures, Regex};

/// A rewrite rule with its pattern compiled and its replacement template
/// parsed into pieces.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pattern: Regex,
    pieces: Vec<Piece>,
    template: String,
}

/// One part of a parsed replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    /// `$&` is group 0, `$1`..`$99` the numbered groups
    Group(usize),
    /// `$<name>`
    Named(String),
    /// `` $` ``: text before the match
    Before,
    /// `$'`: text after the match
    After,
}

impl CompiledRule {
    pub fn compile(rule: &RuleConfig) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&rule.pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: rule.pattern.clone(),
            source,
        })?;
        let has_names = pattern.capture_names().any(|name| name.is_some());
        let pieces = parse_template(&rule.replace, pattern.captures_len(), has_names);

        Ok(CompiledRule {
            pattern,
            pieces,
            template: rule.replace.clone(),
        })
    }

    /// True if the pattern is found anywhere in `url`.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Replace the first match of the pattern in `url` with the template.
    pub fn rewrite(&self, url: &str) -> String {
        let Some(caps) = self.pattern.captures(url) else {
            return url.to_string();
        };
        let Some(whole) = caps.get(0) else {
            return url.to_string();
        };

        let mut out = String::with_capacity(url.len() + self.template.len());
        out.push_str(&url[..whole.start()]);
        for piece in &self.pieces {
            out.push_str(expand(piece, &caps, url, whole.start(), whole.end()));
        }
        out.push_str(&url[whole.end()..]);
        out
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// The replacement template as configured.
    pub fn template(&self) -> &str {
        &self.template
    }
}

pub fn compile_rules(rules: &[RuleConfig]) -> Result<Vec<CompiledRule>, ConfigError> {
    rules.iter().map(CompiledRule::compile).collect()
}

/// First rule, in order, whose pattern matches `url`. `None` means the url
/// is not rewritten.
pub fn find_match<'a>(rules: &'a [CompiledRule], url: &str) -> Option<&'a CompiledRule> {
    rules.iter().find(|rule| rule.matches(url))
}

/// Groups that did not take part in the match expand to nothing.
fn expand<'u>(
    piece: &'u Piece,
    caps: &Captures<'u>,
    url: &'u str,
    start: usize,
    end: usize,
) -> &'u str {
    match piece {
        Piece::Literal(text) => text,
        Piece::Group(index) => caps.get(*index).map_or("", |m| m.as_str()),
        Piece::Named(name) => caps.name(name).map_or("", |m| m.as_str()),
        Piece::Before => &url[..start],
        Piece::After => &url[end..],
    }
}

fn push(pieces: &mut Vec<Piece>, literal: &mut String, piece: Piece) {
    if !literal.is_empty() {
        pieces.push(Piece::Literal(std::mem::take(literal)));
    }
    pieces.push(piece);
}

/// Parse a `$1` / `$&` / `$<name>` / `` $` `` / `$'` / `$$` template. A `$`
/// that does not start a valid reference is literal, and so is `$<` when the
/// pattern has no named groups. `slots` is the number of capture slots
/// including the whole match.
fn parse_template(template: &str, slots: usize, has_names: bool) -> Vec<Piece> {
    let chars: Vec<char> = template.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('$') => {
                literal.push('$');
                i += 2;
            }
            Some('&') => {
                push(&mut pieces, &mut literal, Piece::Group(0));
                i += 2;
            }
            Some('`') => {
                push(&mut pieces, &mut literal, Piece::Before);
                i += 2;
            }
            Some('\'') => {
                push(&mut pieces, &mut literal, Piece::After);
                i += 2;
            }
            Some(c) if c.is_ascii_digit() => {
                let first = c.to_digit(10).unwrap_or(0) as usize;
                let two_digit = chars
                    .get(i + 2)
                    .and_then(|c| c.to_digit(10))
                    .map(|d| first * 10 + d as usize);

                match two_digit {
                    Some(group) if group >= 1 && group < slots => {
                        push(&mut pieces, &mut literal, Piece::Group(group));
                        i += 3;
                    }
                    _ if first >= 1 && first < slots => {
                        push(&mut pieces, &mut literal, Piece::Group(first));
                        i += 2;
                    }
                    _ => {
                        literal.push('$');
                        i += 1;
                    }
                }
            }
            Some('<') if has_names => {
                match chars[i + 2..].iter().position(|&c| c == '>') {
                    Some(len) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        push(&mut pieces, &mut literal, Piece::Named(name));
                        i += len + 3;
                    }
                    None => {
                        literal.push('$');
                        i += 1;
                    }
                }
            }
            _ => {
                literal.push('$');
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, replace: &str) -> CompiledRule {
        CompiledRule::compile(&RuleConfig {
            pattern: pattern.to_string(),
            replace: replace.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule("^/api/", "/first/"),
            rule("^/api/v1", "/second/"),
            rule("v1", "/third/"),
        ];

        let matched = find_match(&rules, "/api/v1/users").unwrap();
        assert_eq!(matched.template(), "/first/");

        let matched = find_match(&rules, "/other/v1").unwrap();
        assert_eq!(matched.template(), "/third/");
    }

    #[test]
    fn test_no_match_returns_none() {
        let rules = vec![rule("^/old/", "/new/")];
        assert!(find_match(&rules, "/v2/items").is_none());
        assert!(find_match(&[], "/anything").is_none());
    }

    #[test]
    fn test_match_is_unanchored() {
        let rules = vec![rule("items", "things")];
        let matched = find_match(&rules, "/v2/items?page=1").unwrap();
        assert_eq!(matched.rewrite("/v2/items?page=1"), "/v2/things?page=1");
    }

    #[test]
    fn test_rewrite_with_capture_group_keeps_query() {
        let r = rule(r"^/api/foo(.*)", "/static/foo$1");
        assert_eq!(r.rewrite("/api/foo/bar?x=1"), "/static/foo/bar?x=1");
    }

    #[test]
    fn test_rewrite_prefix() {
        let r = rule("^/old/", "/new/");
        assert_eq!(r.rewrite("/old/item"), "/new/item");
    }

    #[test]
    fn test_rewrite_replaces_first_occurrence_only() {
        let r = rule("a", "b");
        assert_eq!(r.rewrite("/a/a/a"), "/b/a/a");
    }

    #[test]
    fn test_group_followed_by_letters() {
        let r = rule(r"^/v(\d)/", "/v$1beta/");
        assert_eq!(r.rewrite("/v2/users"), "/v2beta/users");
    }

    #[test]
    fn test_whole_match_and_literal_dollar() {
        let r = rule(r"\d+", "[$&]$$");
        assert_eq!(r.rewrite("/item/42"), "/item/[42]$");
    }

    #[test]
    fn test_named_group() {
        let r = rule(r"^/users/(?P<id>\d+)", "/static/user-$<id>.json");
        assert_eq!(r.rewrite("/users/7"), "/static/user-7.json");
    }

    #[test]
    fn test_missing_group_is_literal() {
        let r = rule("^/old", "/new$2");
        assert_eq!(r.rewrite("/old/x"), "/new$2/x");

        let r = rule("^/old", "/cost$");
        assert_eq!(r.rewrite("/old"), "/cost$");
    }

    #[test]
    fn test_two_digit_group_falls_back_to_one_digit() {
        let r = rule(r"^/(a)(b)", "/$10");
        assert_eq!(r.rewrite("/ab"), "/a0");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = compile_rules(&[RuleConfig {
            pattern: "([".to_string(),
            replace: "/".to_string(),
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(["));
    }

    #[test]
    fn test_named_group_without_named_groups_is_literal() {
        let r = rule("^/old", "/x$<id>");
        assert_eq!(r.rewrite("/old/a"), "/x$<id>/a");
    }

    #[test]
    fn test_unknown_name_expands_empty() {
        let r = rule(r"^/users/(?P<id>\d+)", "/u/$<nope>");
        assert_eq!(r.rewrite("/users/7"), "/u/");
    }

    #[test]
    fn test_braced_name_is_literal() {
        let r = rule(r"^/users/(?P<id>\d+)", "/static/user-${id}.json");
        assert_eq!(r.rewrite("/users/7"), "/static/user-${id}.json");
    }

    #[test]
    fn test_before_and_after_match() {
        let r = rule("-", "[$`|$']");
        assert_eq!(r.rewrite("ab-cd"), "ab[ab|cd]cd");
    }

    #[test]
    fn test_unmatched_optional_group_is_empty() {
        let r = rule(r"^/a(/b)?", "/z$1");
        assert_eq!(r.rewrite("/a/c"), "/z/c");
    }

    #[test]
    fn test_parse_template() {
        assert_eq!(
            parse_template("/static/foo$1", 2, false),
            vec![Piece::Literal("/static/foo".to_string()), Piece::Group(1)]
        );
        assert_eq!(parse_template("$&", 1, false), vec![Piece::Group(0)]);
        assert_eq!(
            parse_template("$$", 1, false),
            vec![Piece::Literal("$".to_string())]
        );
        assert_eq!(
            parse_template("$0", 2, false),
            vec![Piece::Literal("$0".to_string())]
        );
        assert_eq!(
            parse_template("$<name>", 2, true),
            vec![Piece::Named("name".to_string())]
        );
        assert_eq!(
            parse_template("$<name>", 2, false),
            vec![Piece::Literal("$<name>".to_string())]
        );
        assert_eq!(
            parse_template("$<", 2, true),
            vec![Piece::Literal("$<".to_string())]
        );
    }
}
