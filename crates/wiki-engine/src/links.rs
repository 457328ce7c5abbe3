//! Wiki link parsing.
//!
//! Two reference syntaxes point at other pages:
//! - `[[PageName]]` and `[[PageName|Display Text]]`
//! - Markdown links `[label](target)` whose target is not external
//!
//! Before content reaches a markdown renderer the wiki form is rewritten into
//! the markdown form, with the page name percent-encoded inside `<...>` so
//! names containing spaces or parentheses survive.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

static WIKI_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]+)?\]\]").unwrap()
});

static LABELED_WIKI_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]|]+)\|([^\]]+)\]\]").unwrap()
});

static PLAIN_WIKI_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]]+)\]\]").unwrap()
});

static MARKDOWN_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap()
});

const EXTERNAL_PREFIXES: [&str; 4] = ["http://", "https://", "mailto:", "#"];

/// Extract the names of all pages referenced by `content`.
///
/// Wiki references come first in text order, followed by markdown links in
/// text order. Each name appears once, at its first position.
pub fn parse_links(content: &str) -> Vec<String> {
    let wiki = WIKI_LINK_REGEX
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()));

    let markdown = MARKDOWN_LINK_REGEX
        .captures_iter(content)
        .filter_map(|cap| cap.get(2))
        .map(|m| m.as_str().trim())
        .filter(|href| !is_external(href))
        .map(|href| decode_target(strip_angle_brackets(href)));

    let mut seen = HashSet::new();
    wiki.chain(markdown)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Rewrite wiki references into markdown links.
///
/// `[[Page|Label]]` becomes `[Label](<Page>)` and `[[Page]]` becomes
/// `[Page](<Page>)`, with the target percent-encoded. Content without wiki
/// references is returned unchanged.
pub fn rewrite_wiki_links(content: &str) -> String {
    let labeled = LABELED_WIKI_LINK_REGEX.replace_all(content, |cap: &Captures| {
        format!("[{}](<{}>)", &cap[2], urlencoding::encode(&cap[1]))
    });
    PLAIN_WIKI_LINK_REGEX
        .replace_all(&labeled, |cap: &Captures| {
            format!("[{}](<{}>)", &cap[1], urlencoding::encode(&cap[1]))
        })
        .into_owned()
}

/// Map a rendered link target back to a page name.
///
/// External and anchor targets yield `None`. A target that is empty after
/// unwrapping resolves to `home`.
pub fn resolve_href(href: &str, home: &str) -> Option<String> {
    let trimmed = href.trim();
    if is_external(trimmed) {
        return None;
    }
    let name = decode_target(strip_angle_brackets(trimmed));
    if name.is_empty() {
        Some(home.to_string())
    } else {
        Some(name)
    }
}

fn is_external(href: &str) -> bool {
    EXTERNAL_PREFIXES.iter().any(|prefix| href.starts_with(prefix))
}

/// Drop a leading `<` and a trailing `>`, each independently.
fn strip_angle_brackets(href: &str) -> &str {
    let href = href.strip_prefix('<').unwrap_or(href);
    href.strip_suffix('>').unwrap_or(href)
}

/// Percent-decode a target, keeping it verbatim when it does not decode.
fn decode_target(target: &str) -> String {
    urlencoding::decode(target)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_wiki_links() {
        let links = parse_links("See [[Home]] and [[About|About Us]].");
        assert_eq!(links, vec!["Home", "About"]);
    }

    #[test]
    fn test_parse_wiki_link_target_is_raw() {
        let links = parse_links("[[ Spaced Page |label]]");
        assert_eq!(links, vec![" Spaced Page "]);
    }

    #[test]
    fn test_parse_markdown_links_skip_external() {
        let content = "[a](Local) [b](http://x.io) [c](https://x.io) \
                       [d](mailto:me@x.io) [e](#top) [f]( Other )";
        assert_eq!(parse_links(content), vec!["Local", "Other"]);
    }

    #[test]
    fn test_parse_angle_bracket_and_encoded_targets() {
        let content = "[x](<My%20Page>) [y](<Plain (draft)>) [z](%E3%83%A1%E3%83%A2)";
        assert_eq!(parse_links(content), vec!["My Page", "Plain (draft", "メモ"]);
    }

    #[test]
    fn test_parse_undecodable_target_kept_verbatim() {
        assert_eq!(parse_links("[x](bad%FF)"), vec!["bad%FF"]);
    }

    #[test]
    fn test_parse_order_and_dedup() {
        let content = "[m](Beta) [[Alpha]] [[Beta]] [again](Alpha) [n](Gamma)";
        assert_eq!(parse_links(content), vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_parse_empty_and_plain_text() {
        assert!(parse_links("").is_empty());
        assert!(parse_links("no links [here] or (there)").is_empty());
    }

    #[test]
    fn test_rewrite_forms() {
        assert_eq!(
            rewrite_wiki_links("go [[My Page]] or [[Notes|my notes]]"),
            "go [My Page](<My%20Page>) or [my notes](<Notes>)"
        );
    }

    #[test]
    fn test_rewrite_without_references_is_identity() {
        let content = "# Title\n\n[link](Other) and text";
        assert_eq!(rewrite_wiki_links(content), content);
    }

    #[test]
    fn test_rewritten_content_links_to_same_pages() {
        let content = "[[My Page]] [[Notes|n]] [[괄호 (초안)]]";
        assert_eq!(
            parse_links(&rewrite_wiki_links(content)),
            parse_links(content)
        );
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("<My%20Page>", "Home"), Some("My Page".to_string()));
        assert_eq!(resolve_href("  ", "Home"), Some("Home".to_string()));
        assert_eq!(resolve_href("<>", "Home"), Some("Home".to_string()));
        assert_eq!(resolve_href("https://example.com", "Home"), None);
        assert_eq!(resolve_href("#section", "Home"), None);
    }

    proptest! {
        #[test]
        fn prop_rewrite_is_idempotent(content in r"[\[\]|ab <>()%#\n]{0,48}") {
            let once = rewrite_wiki_links(&content);
            prop_assert_eq!(rewrite_wiki_links(&once), once);
        }

        #[test]
        fn prop_parse_links_unique(content in r"[\[\]|ab()<>]{0,48}") {
            let links = parse_links(&content);
            let unique: HashSet<_> = links.iter().collect();
            prop_assert_eq!(unique.len(), links.len());
        }
    }
}
