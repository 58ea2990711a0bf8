//! End-to-end behaviour of the conversion engine.

use std::time::{Duration, Instant};

use markpane::{MarkdownEngine, convert_to_html};
use pretty_assertions::assert_eq;

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// =============================================================================
// Escaping
// =============================================================================

#[test]
fn special_characters_are_escaped_exactly_once() {
    let html = convert_to_html("Tom & Jerry's \"show\" < 3");
    assert_eq!(html, "<p>Tom &amp; Jerry&#39;s &quot;show&quot; &lt; 3</p>");
    assert!(!html.contains("&amp;amp;"));
}

#[test]
fn code_is_escaped_exactly_once() {
    assert_eq!(
        convert_to_html("`a && b`"),
        "<p><code>a &amp;&amp; b</code></p>"
    );
    assert_eq!(
        convert_to_html("```\nif a < b && c {}\n```"),
        "<pre><code>if a &lt; b &amp;&amp; c {}</code></pre>"
    );
}

#[test]
fn raw_html_is_never_passed_through() {
    assert_eq!(
        convert_to_html("<script>alert('x')</script>"),
        "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>"
    );
}

#[test]
fn javascript_links_are_neutralized() {
    assert_eq!(
        convert_to_html("[click](javascript:alert(1))"),
        r##"<p><a href="#">click</a></p>"##
    );
}

#[test]
fn autolink_text_matches_its_target() {
    assert_eq!(
        convert_to_html("<https://a.io/x~y~z>"),
        r#"<p><a href="https://a.io/x~y~z">https://a.io/x&#126;y&#126;z</a></p>"#
    );
}

// =============================================================================
// Code blocks
// =============================================================================

#[test]
fn four_backtick_fence_contains_three_backtick_lines() {
    assert_eq!(
        convert_to_html("````\n```\ninner\n```\n````"),
        "<pre><code>```\ninner\n```</code></pre>"
    );
}

#[test]
fn fence_content_is_not_markdown() {
    let html = convert_to_html("```md\n# not a heading\n- not a list\n```");
    assert_eq!(
        html,
        "<pre><code class=\"language-md\"># not a heading\n- not a list</code></pre>"
    );
}

// =============================================================================
// Lists
// =============================================================================

#[test]
fn nested_lists_are_balanced() {
    let html = convert_to_html("- a\n  - b\n    - c\n- d\n\n1. one\n   2. two");
    assert_eq!(count(&html, "<ul>"), count(&html, "</ul>"));
    assert_eq!(count(&html, "<ol>") + count(&html, "<ol start="), count(&html, "</ol>"));
    assert_eq!(count(&html, "<li>"), count(&html, "</li>"));
}

#[test]
fn nested_list_structure() {
    assert_eq!(
        convert_to_html("- a\n  - b\n- c"),
        "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n<li>c</li>\n</ul>"
    );
}

#[test]
fn task_items_and_bullets_differ() {
    assert_eq!(
        convert_to_html("- [ ] todo\n- item"),
        "<ul>\n<li><input type=\"checkbox\" disabled> todo</li>\n<li>item</li>\n</ul>"
    );
}

// =============================================================================
// Inline formatting
// =============================================================================

#[test]
fn bold_and_italic_boundaries() {
    assert_eq!(
        convert_to_html("**bold** and *italic*"),
        "<p><strong>bold</strong> and <em>italic</em></p>"
    );
    assert_eq!(
        convert_to_html("***both***"),
        "<p><strong><em>both</em></strong></p>"
    );
    assert_eq!(convert_to_html("snake_case_name"), "<p>snake_case_name</p>");
}

#[test]
fn strikethrough_and_subscript_do_not_collide() {
    assert_eq!(
        convert_to_html("~~gone~~ H~2~O"),
        "<p><del>gone</del> H<sub>2</sub>O</p>"
    );
}

#[test]
fn highlight_and_superscript() {
    assert_eq!(
        convert_to_html("==note== x^2^"),
        "<p><mark>note</mark> x<sup>2</sup></p>"
    );
}

// =============================================================================
// Math
// =============================================================================

#[test]
fn dollars_inside_code_are_not_math() {
    assert_eq!(
        convert_to_html("```\ncost $100 and $200\n```"),
        "<pre><code>cost $100 and $200</code></pre>"
    );
    assert_eq!(
        convert_to_html("`$x$` and $y$"),
        r#"<p><code>$x$</code> and <span class="math-inline">y</span></p>"#
    );
}

#[test]
fn math_is_not_touched_by_emphasis() {
    assert_eq!(
        convert_to_html("$a*b*c$"),
        r#"<p><span class="math-inline">a*b*c</span></p>"#
    );
}

#[test]
fn display_math_inside_a_sentence_is_not_nested_in_a_paragraph() {
    assert_eq!(
        convert_to_html("see $$x$$ here"),
        "<p>see</p>\n<div class=\"math-block\">x</div>\n<p>here</p>"
    );
}

// =============================================================================
// Tables and headings
// =============================================================================

#[test]
fn table_without_separator_is_a_paragraph() {
    assert_eq!(convert_to_html("|a|b|\n|c|d|"), "<p>|a|b|<br>|c|d|</p>");
}

#[test]
fn heading_ids_are_deterministic() {
    let markdown = "# Hello, World!\n\n## Hello, World!";
    let first = MarkdownEngine::new().render(markdown);
    let second = MarkdownEngine::new().render(markdown);
    assert_eq!(first.html, second.html);
    assert_eq!(first.headings, second.headings);
    assert_eq!(first.headings[0].id, "hello-world");
    assert!(first.html.starts_with(r#"<h1 id="hello-world">Hello, World!</h1>"#));
}

#[test]
fn heading_outline_holds_visible_text() {
    let rendered = MarkdownEngine::new().render("## The *quick* fox");
    assert_eq!(
        rendered.html,
        r#"<h2 id="the-quick-fox">The <em>quick</em> fox</h2>"#
    );
    assert_eq!(rendered.headings[0].text, "The quick fox");
}

// =============================================================================
// Pathological input
// =============================================================================

fn assert_prompt(input: &str, expected: &str) {
    let start = Instant::now();
    let html = convert_to_html(input);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "conversion took {:?}",
        start.elapsed()
    );
    assert_eq!(html, expected);
}

#[test]
fn many_asterisks_convert_promptly() {
    let stars = "*".repeat(10_000);
    assert_prompt(&format!("a {stars}"), &format!("<p>a {stars}</p>"));
}

#[test]
fn many_brackets_convert_promptly() {
    let brackets = "[".repeat(10_000);
    assert_prompt(&format!("a{brackets}"), &format!("<p>a{brackets}</p>"));
}

#[test]
fn many_dollars_convert_promptly() {
    let dollars = "$".repeat(10_000);
    assert_prompt(&format!("a{dollars}"), &format!("<p>a{dollars}</p>"));
}

#[test]
fn many_unclosed_openers_convert_promptly() {
    let text = "_a ".repeat(5_000);
    assert_prompt(&text, &format!("<p>{}</p>", text.trim()));
}

#[test]
fn malformed_input_never_panics() {
    for input in [
        "[",
        "](",
        "![",
        "`",
        "$",
        "$$",
        "|",
        "|-|",
        "> ",
        "- ",
        "1.",
        "[^",
        "[^x]:",
        "\u{0}F0\u{0}",
        "```",
        "~~~~",
    ] {
        let _ = convert_to_html(input);
    }
}

#[test]
fn input_nul_cannot_forge_placeholders() {
    let html = convert_to_html("`x` \u{0}C0\u{0}");
    assert!(!html.contains('\u{0}'));
    assert_eq!(count(&html, "<code>x</code>"), 1);
}
