//! Render a diff as marked-up HTML, mainly as a starting point for writing
//! your own display code.

use crate::{Diff, Op};

/// Controls for [`diff_pretty_html`]: which tags wrap each kind of record,
/// optional inline styles, and whether newlines become `<br>` elements.
#[derive(Debug, Clone)]
pub struct HtmlConfig<'a> {
    pub insert_tag: &'a str,
    pub delete_tag: &'a str,
    pub equality_tag: &'a str,
    pub insert_style: Option<&'a str>,
    pub delete_style: Option<&'a str>,
    pub equality_style: Option<&'a str>,
    pub newline_to_br: bool,
}

impl Default for HtmlConfig<'_> {
    fn default() -> Self {
        Self {
            insert_tag: "ins",
            delete_tag: "del",
            equality_tag: "span",
            insert_style: Some("background:#e6ffe6;"),
            delete_style: Some("background:#ffe6e6;"),
            equality_style: None,
            newline_to_br: true,
        }
    }
}

/// Render a diff as HTML, insertions and deletions wrapped in their own tags.
pub fn diff_pretty_html(diffs: &[Diff], config: &HtmlConfig) -> String {
    let mut html = String::new();
    for diff in diffs {
        let mut text = diff
            .text()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        if config.newline_to_br {
            text = text.replace('\n', "&para;<br>");
        }
        let (tag, style) = match diff.op() {
            Op::Insert => (config.insert_tag, config.insert_style),
            Op::Delete => (config.delete_tag, config.delete_style),
            Op::Equal => (config.equality_tag, config.equality_style),
        };
        match style {
            Some(style) => {
                html.push_str(&format!("<{tag} style=\"{style}\">{text}</{tag}>"));
            }
            None => {
                html.push_str(&format!("<{tag}>{text}</{tag}>"));
            }
        }
    }
    html
}
