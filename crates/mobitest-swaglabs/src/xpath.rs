//! The XPath subset the simulator understands.
//!
//! Paths are `//step/step/...`: the first step matches anywhere in the tree,
//! each later step matches a direct child of the previous one. A step is a
//! class name or `*`, optionally followed by one predicate made of
//! `@attr='value'` and `contains(@attr, 'value')` terms joined by `or`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attr {
    Text,
    ContentDesc,
    ResourceId,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Term {
    Equals(Attr, String),
    Contains(Attr, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub class: Option<String>,
    /// Empty means no predicate.
    pub any_of: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XPath {
    pub steps: Vec<Step>,
}

/// A node the expression can be evaluated against.
pub(crate) trait XmlNode {
    fn attr(&self, attr: Attr) -> Option<&str>;
    fn key(&self) -> &str;
    fn parent_key(&self) -> Option<&str>;
}

impl Term {
    fn matches(&self, node: &impl XmlNode) -> bool {
        match self {
            Term::Equals(attr, value) => node.attr(*attr) == Some(value.as_str()),
            Term::Contains(attr, value) => node.attr(*attr).is_some_and(|s| s.contains(value.as_str())),
        }
    }
}

impl Step {
    fn matches(&self, node: &impl XmlNode) -> bool {
        if let Some(class) = &self.class {
            if node.attr(Attr::Class) != Some(class.as_str()) {
                return false;
            }
        }
        self.any_of.is_empty() || self.any_of.iter().any(|term| term.matches(node))
    }
}

impl XPath {
    /// Matching nodes, in document order.
    pub fn select<'n, N: XmlNode>(&self, nodes: &'n [N]) -> Vec<&'n N> {
        let Some((first, rest)) = self.steps.split_first() else {
            return Vec::new();
        };
        let mut current: Vec<&N> = nodes.iter().filter(|n| first.matches(*n)).collect();
        for step in rest {
            current = nodes
                .iter()
                .filter(|n| {
                    step.matches(*n)
                        && n
                            .parent_key()
                            .is_some_and(|parent| current.iter().any(|c| c.key() == parent))
                })
                .collect();
        }
        current
    }
}

/// Splits `s` on `sep` wherever it occurs outside quotes, brackets and
/// parentheses.
fn split_top_level<'a>(s: &'a str, sep: &str) -> Result<Vec<&'a str>, String> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    let mut start = 0;
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => depth -= 1,
                _ if depth == 0 && s[i..].starts_with(sep) => {
                    parts.push(&s[start..i]);
                    start = i + sep.len();
                    // Skip the rest of a multi-character separator.
                    while chars.peek().is_some_and(|(j, _)| *j < start) {
                        chars.next();
                    }
                }
                _ => {}
            },
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(format!("unbalanced quotes or brackets in '{}'", s));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn parse_attr(s: &str) -> Result<Attr, String> {
    match s.trim().strip_prefix('@') {
        Some("text") => Ok(Attr::Text),
        Some("content-desc") => Ok(Attr::ContentDesc),
        Some("resource-id") => Ok(Attr::ResourceId),
        Some("class") => Ok(Attr::Class),
        _ => Err(format!("unsupported attribute '{}'", s.trim())),
    }
}

fn parse_literal(s: &str) -> Result<String, String> {
    let s = s.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')));
    if !quoted {
        return Err(format!("expected a quoted literal, got '{}'", s));
    }
    Ok(s[1..s.len() - 1].to_string())
}

fn parse_term(s: &str) -> Result<Term, String> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("contains(").and_then(|r| r.strip_suffix(')')) {
        let args = split_top_level(inner, ",")?;
        let [attr, value] = args.as_slice() else {
            return Err(format!("contains() takes two arguments: '{}'", s));
        };
        return Ok(Term::Contains(parse_attr(attr)?, parse_literal(value)?));
    }
    let sides = split_top_level(s, "=")?;
    let [attr, value] = sides.as_slice() else {
        return Err(format!("unsupported predicate '{}'", s));
    };
    Ok(Term::Equals(parse_attr(attr)?, parse_literal(value)?))
}

fn parse_step(s: &str) -> Result<Step, String> {
    let (name, predicate) = match s.find('[') {
        Some(open) => {
            let predicate = s[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated predicate in '{}'", s))?;
            (&s[..open], Some(predicate))
        }
        None => (s, None),
    };
    if name.is_empty() {
        return Err("empty step".to_string());
    }
    let class = (name != "*").then(|| name.to_string());
    let any_of = match predicate {
        Some(p) => split_top_level(p, " or ")?
            .into_iter()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(Step { class, any_of })
}

pub(crate) fn parse(expr: &str) -> Result<XPath, String> {
    let rest = expr
        .strip_prefix("//")
        .ok_or_else(|| format!("expression must start with '//': '{}'", expr))?;
    let steps = split_top_level(rest, "/")?
        .into_iter()
        .map(parse_step)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(XPath { steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct N {
        key: &'static str,
        parent: Option<&'static str>,
        class: &'static str,
        desc: Option<&'static str>,
        text: Option<&'static str>,
    }

    impl XmlNode for N {
        fn attr(&self, attr: Attr) -> Option<&str> {
            match attr {
                Attr::Class => Some(self.class),
                Attr::ContentDesc => self.desc,
                Attr::Text => self.text,
                Attr::ResourceId => None,
            }
        }
        fn key(&self) -> &str {
            self.key
        }
        fn parent_key(&self) -> Option<&str> {
            self.parent
        }
    }

    fn tree() -> Vec<N> {
        vec![
            N {
                key: "error",
                parent: None,
                class: "android.view.ViewGroup",
                desc: Some("test-Error message"),
                text: None,
            },
            N {
                key: "error-text",
                parent: Some("error"),
                class: "android.widget.TextView",
                desc: None,
                text: Some("Username is required"),
            },
            N {
                key: "finish-label",
                parent: None,
                class: "android.widget.TextView",
                desc: None,
                text: Some("FINISH"),
            },
        ]
    }

    #[test]
    fn test_parse_equals_and_contains() {
        let xpath = parse("//android.widget.TextView[@text='PRODUCTS']").unwrap();
        assert_eq!(xpath.steps.len(), 1);
        assert_eq!(
            xpath.steps[0].any_of,
            vec![Term::Equals(Attr::Text, "PRODUCTS".to_string())]
        );

        let xpath = parse("//*[contains(@text, 'THANK YOU') or contains(@content-desc, 'COMPLETE')]").unwrap();
        assert_eq!(xpath.steps[0].class, None);
        assert_eq!(xpath.steps[0].any_of.len(), 2);
    }

    #[test]
    fn test_slash_inside_literal_is_not_a_step() {
        let xpath = parse("//*[contains(@text, 'Zip/Postal Code')]").unwrap();
        assert_eq!(xpath.steps.len(), 1);
    }

    #[test]
    fn test_child_step_selects_children_only() {
        let nodes = tree();
        let xpath =
            parse("//android.view.ViewGroup[@content-desc='test-Error message']/android.widget.TextView")
                .unwrap();
        let found = xpath.select(&nodes);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "error-text");
    }

    #[test]
    fn test_contains_matches_substring() {
        let nodes = tree();
        let found = parse("//*[contains(@text, 'FINISH')]").unwrap().select(&nodes);
        assert_eq!(found.len(), 1);
        assert!(parse("//android.widget.Button[contains(@text, 'FINISH')]")
            .unwrap()
            .select(&nodes)
            .is_empty());
    }

    #[test]
    fn test_rejects_unsupported_syntax() {
        assert!(parse("android.widget.TextView").is_err());
        assert!(parse("//*[@text='unterminated]").is_err());
        assert!(parse("//*[starts-with(@text, 'A')]").is_err());
        assert!(parse("//a//b").is_err());
    }
}
