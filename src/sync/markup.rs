//! GitHub-flavoured Markdown to Jira wiki markup.
//!
//! The conversion is an ordered list of independent [`Rule`]s. Order matters:
//! headings first, then text effects, then links, then fenced blocks. Links
//! come after the text effects so that bracket and parenthesis syntax shared
//! by both dialects is only rewritten once the inline markers are settled.
//!
//! Delimiter pairs always match the shortest span, so two bold runs on one
//! line stay two bold runs. Tables are passed through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Display width hint attached to every embedded image.
const IMAGE_WIDTH: u32 = 600;

enum Replacement {
    /// A `$n` template handed to [`Regex::replace_all`].
    Template(&'static str),
    /// Computed per match.
    With(fn(&Captures) -> String),
}

/// One pattern and how to rewrite what it matches.
pub struct Rule {
    name: &'static str,
    pattern: Regex,
    replacement: Replacement,
}

impl Rule {
    fn template(name: &'static str, pattern: &str, template: &'static str) -> Self {
        Self {
            name,
            pattern: compile(name, pattern),
            replacement: Replacement::Template(template),
        }
    }

    fn with(name: &'static str, pattern: &str, f: fn(&Captures) -> String) -> Self {
        Self {
            name,
            pattern: compile(name, pattern),
            replacement: Replacement::With(f),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rewrite every non-overlapping match. Text produced by the rewrite is
    /// never scanned again by the same rule.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.replacement {
            Replacement::Template(template) => self.pattern.replace_all(text, *template),
            Replacement::With(f) => self.pattern.replace_all(text, |caps: &Captures| f(caps)),
        }
    }
}

fn compile(name: &str, pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid markup rule {name}: {e}"))
}

/// Group 1 is a strong run, group 2 an emphasis run. Matching both in one
/// rule keeps emphasis from re-reading the `*` that strong emits.
fn strong_or_emphasis(caps: &Captures) -> String {
    match (caps.get(1), caps.get(2)) {
        (Some(strong), _) => format!("*{}*", strong.as_str()),
        (None, Some(emphasis)) => format!("_{}_", emphasis.as_str()),
        (None, None) => caps[0].to_string(),
    }
}

fn image(caps: &Captures) -> String {
    format!("!{}|width={IMAGE_WIDTH}!", &caps[2])
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Headings, deepest first.
        Rule::template("h6", r"(?m)^###### (.*)$", "h6. $1"),
        Rule::template("h5", r"(?m)^##### (.*)$", "h5. $1"),
        Rule::template("h4", r"(?m)^#### (.*)$", "h4. $1"),
        Rule::template("h3", r"(?m)^### (.*)$", "h3. $1"),
        Rule::template("h2", r"(?m)^## (.*)$", "h2. $1"),
        Rule::template("h1", r"(?m)^# (.*)$", "h1. $1"),
        // Text effects. A run must start and end on a non-space so list
        // bullets and arithmetic are left alone.
        Rule::with(
            "asterisk",
            r"\*\*(\S(?:.*?\S)??)\*\*|\*(\S(?:.*?\S)??)\*",
            strong_or_emphasis,
        ),
        Rule::with(
            "underscore",
            r"__(\S(?:.*?\S)??)__|_(\S(?:.*?\S)??)_",
            strong_or_emphasis,
        ),
        Rule::template("citation", r"<cite>(.+?)</?cite>", "??${1}??"),
        Rule::template("deleted", r"~~(\S(?:.*?\S)??)~~", "-${1}-"),
        Rule::template("inserted", r"<ins>(.+?)</?ins>", "+${1}+"),
        Rule::template("superscript", r"<sup>(.+?)</?sup>", "^${1}^"),
        Rule::template("subscript", r"<sub>(.+?)</?sub>", "~${1}~"),
        Rule::template("monospace", r"`([^`\n]+)`", "{{${1}}}"),
        Rule::template("quote", r"(?m)^>[ \t]+(.*)$", "bq. $1"),
        // Links.
        Rule::with("image", r"!\[([^\]\n]*)\]\(([^)\s]+)\)", image),
        Rule::template(
            "autolink",
            r"<([a-zA-Z][a-zA-Z0-9+.\-]*:[^<>\s]+)>",
            "[${1}]",
        ),
        Rule::template("link", r"\[([^\]\n]*)\]\(([^)\s]+)\)", "[${1}|${2}]"),
        // Fenced blocks.
        Rule::template(
            "code",
            r"(?m)^```(\w+)[ \t]*\n((?s:.*?))\n```[ \t]*$",
            "{code:${1}}\n${2}\n{code}",
        ),
        Rule::template(
            "noformat",
            r"(?m)^```[ \t]*\n((?s:.*?))\n```[ \t]*$",
            "{noformat}\n${1}\n{noformat}",
        ),
    ]
});

/// The rules [`translate`] applies, in order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Convert Markdown to Jira wiki markup.
pub fn translate(source: &str) -> String {
    let mut text = source.replace("\r\n", "\n");
    for rule in rules() {
        let rewritten = rule.apply(&text).into_owned();
        if rewritten != text {
            tracing::trace!(rule = rule.name(), "markup rule applied");
        }
        text = rewritten;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn rule(name: &str) -> &'static Rule {
        rules()
            .iter()
            .find(|r| r.name() == name)
            .unwrap_or_else(|| panic!("no rule named {name}"))
    }

    #[rstest]
    #[case("# Title", "h1. Title")]
    #[case("## Title", "h2. Title")]
    #[case("### Title", "h3. Title")]
    #[case("##### Title", "h5. Title")]
    #[case("###### Title", "h6. Title")]
    fn headings_map_to_their_own_level(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate(input), expected);
    }

    #[test]
    fn level_four_heading_is_h4_not_h3() {
        assert_eq!(translate("#### Details"), "h4. Details");
    }

    #[test]
    fn heading_needs_line_start() {
        assert_eq!(translate("see issue # 4"), "see issue # 4");
    }

    #[test]
    fn headings_in_multiline_body() {
        assert_eq!(
            translate("# Summary\ntext\n## Steps\nmore"),
            "h1. Summary\ntext\nh2. Steps\nmore"
        );
    }

    #[test]
    fn bold_spans_are_matched_per_occurrence() {
        assert_eq!(
            translate("**bold** and **also bold**"),
            "*bold* and *also bold*"
        );
    }

    #[test]
    fn strong_output_is_not_reread_as_emphasis() {
        assert_eq!(translate("**bold** then *em*"), "*bold* then _em_");
    }

    #[rstest]
    #[case("__strong__", "*strong*")]
    #[case("*em*", "_em_")]
    #[case("_em_", "_em_")]
    #[case("snake_case_name", "snake_case_name")]
    fn strong_and_emphasis(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate(input), expected);
    }

    #[rstest]
    #[case("**a** and **b**", "*a* and *b*")]
    #[case("*x* and *y*", "_x_ and _y_")]
    #[case("__a__ and __b__", "*a* and *b*")]
    #[case("_a_ and _b_", "_a_ and _b_")]
    #[case("~~a~~ and ~~b~~", "-a- and -b-")]
    #[case("**1** of **20**", "*1* of *20*")]
    fn single_character_spans_close_at_their_own_delimiter(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(translate(input), expected);
    }

    #[test]
    fn underscores_in_link_targets_are_still_rewritten() {
        // Known limitation: inline rules do not skip URLs.
        assert_eq!(
            translate("[x](http://a/__init__.py)"),
            "[x|http://a/*init*.py]"
        );
    }

    #[test]
    fn list_bullets_are_not_emphasis() {
        assert_eq!(translate("* one\n* two"), "* one\n* two");
        assert_eq!(translate("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[rstest]
    #[case("<cite>Someone</cite>", "??Someone??")]
    #[case("~~gone~~", "-gone-")]
    #[case("<ins>new</ins>", "+new+")]
    #[case("x<sup>2</sup>", "x^2^")]
    #[case("H<sub>2</sub>O", "H~2~O")]
    #[case("run `make test` now", "run {{make test}} now")]
    #[case("> quoted", "bq. quoted")]
    fn text_effects(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(translate(input), expected);
    }

    #[test]
    fn unclosed_tag_pairs_from_legacy_bodies_still_convert() {
        assert_eq!(translate("<cite>Someone<cite>"), "??Someone??");
    }

    #[test]
    fn two_deleted_runs_stay_separate() {
        assert_eq!(translate("~~a~~ keep ~~b~~"), "-a- keep -b-");
    }

    #[test]
    fn named_link() {
        assert_eq!(translate("[text](http://x)"), "[text|http://x]");
    }

    #[test]
    fn autolink() {
        assert_eq!(translate("<http://x>"), "[http://x]");
    }

    #[test]
    fn html_tags_without_scheme_are_not_links() {
        assert_eq!(translate("line<br>break"), "line<br>break");
    }

    #[test]
    fn image_gets_width_hint() {
        assert_eq!(
            translate("![logo](http://x/logo.png)"),
            "!http://x/logo.png|width=600!"
        );
    }

    #[test]
    fn two_links_on_one_line() {
        assert_eq!(
            translate("[a](http://a) or [b](http://b)"),
            "[a|http://a] or [b|http://b]"
        );
    }

    #[test]
    fn fenced_block_with_language() {
        assert_eq!(
            translate("```rust\nfn main() {}\n```"),
            "{code:rust}\nfn main() {}\n{code}"
        );
    }

    #[test]
    fn fenced_block_without_language() {
        assert_eq!(
            translate("before\n```\nplain\n```\nafter"),
            "before\n{noformat}\nplain\n{noformat}\nafter"
        );
    }

    #[test]
    fn two_code_blocks_stay_separate() {
        assert_eq!(
            translate("```sh\nls\n```\nand\n```sh\npwd\n```"),
            "{code:sh}\nls\n{code}\nand\n{code:sh}\npwd\n{code}"
        );
    }

    #[test]
    fn tables_pass_through() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        assert_eq!(translate(table), table);
    }

    #[test]
    fn crlf_bodies_are_normalised() {
        assert_eq!(translate("# A\r\nbody\r\n"), "h1. A\nbody\n");
    }

    #[test]
    fn empty_body_stays_empty() {
        assert_eq!(translate(""), "");
    }

    #[test]
    fn rules_run_in_declared_order() {
        let names: Vec<_> = rules().iter().map(Rule::name).collect();
        let h1 = names.iter().position(|n| *n == "h1").unwrap();
        let asterisk = names.iter().position(|n| *n == "asterisk").unwrap();
        let link = names.iter().position(|n| *n == "link").unwrap();
        let code = names.iter().position(|n| *n == "code").unwrap();
        let noformat = names.iter().position(|n| *n == "noformat").unwrap();
        assert!(h1 < asterisk && asterisk < link && link < code && code < noformat);
    }

    #[test]
    fn single_rule_in_isolation() {
        assert_eq!(rule("quote").apply("> a\n>b"), "bq. a\n>b");
        assert_eq!(rule("monospace").apply("```"), "```");
        assert_eq!(rule("link").apply("[x](y)"), "[x|y]");
        assert_eq!(rule("h4").apply("#### four"), "h4. four");
    }
}
