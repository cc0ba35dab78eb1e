//! Tagged-block rewriter for native tool-call markup.
//!
//! When the host executes a tool natively it records the call in the
//! assistant message as a block like
//!
//! ```text
//! <details type="tool_calls" done="true" id="call_1" name="web_search" arguments="...">
//! <summary>Tool Executed</summary>
//! </details>
//! ```
//!
//! Left verbatim, models tend to imitate that markup in later turns
//! instead of issuing real tool calls. [`rewrite`] scans a message once and
//! applies a [`RewriteStrategy`] to every such block.
//!
//! Recovery rules:
//! - A start marker with no end marker after it stops the scan; everything
//!   from the last processed block onward is copied through untouched.
//! - A block whose opening tag cannot be read for the active strategy is
//!   copied through untouched and the scan moves on to the next block.
//! - Annotate passes already annotated blocks through silently, so
//!   re-running it over a whole conversation is quiet.

use chatplug_core::filter::RewriteStrategy;
use chatplug_core::message::{Message, Role};
use regex_lite::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::warn;

/// Opening of a tool-call block, up to (not including) its other attributes.
pub const START_MARKER: &str = r#"<details type="tool_calls""#;

/// Literal end of a tool-call block.
pub const END_MARKER: &str = "</details>";

/// Name used by [`RewriteStrategy::Summarize`] when the tag has no `name`.
pub const UNKNOWN_TOOL: &str = "unknown_tool";

/// Attribute key spliced in by [`RewriteStrategy::Annotate`].
pub const ADVISORY_ATTRIBUTE: &str = "note";

/// Attribute value spliced in by [`RewriteStrategy::Annotate`]. Must not contain `"`.
pub const ADVISORY_TEXT: &str =
    "This tool call was executed by the host. Do not write tool-call markup yourself; call the tool instead.";

static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname="([^"]+)""#).expect("valid name pattern"));

// The name attribute, then whitespace, then the arguments attribute.
static NAME_BEFORE_ARGUMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\bname="[^"]*")\s+arguments="#).expect("valid annotate pattern")
});

// Present in an opening tag once Annotate has run on it.
static ADVISORY_PREFIX: LazyLock<String> = LazyLock::new(|| format!(" {ADVISORY_ATTRIBUTE}=\""));

/// Rewrite every tool-call block in `content` according to `strategy`.
///
/// Content without a start marker comes back unchanged. Otherwise the
/// result is trimmed of surrounding whitespace.
pub fn rewrite(content: &str, strategy: RewriteStrategy) -> String {
    if !content.contains(START_MARKER) {
        return content.to_string();
    }

    let mut output = String::with_capacity(content.len());
    let mut cursor = 0;

    loop {
        let Some(start) = find_from(content, START_MARKER, cursor) else {
            output.push_str(&content[cursor..]);
            break;
        };

        let Some(end) = find_from(content, END_MARKER, start + START_MARKER.len()) else {
            warn!(
                offset = start,
                "Found tool-call block without '{END_MARKER}'; leaving the rest of the message untouched"
            );
            output.push_str(&content[cursor..]);
            break;
        };

        let block_end = end + END_MARKER.len();
        let block = &content[start..block_end];
        output.push_str(&content[cursor..start]);

        match transform_block(block, end - start, strategy) {
            Some(replacement) => output.push_str(&replacement),
            None => {
                warn!(
                    offset = start,
                    %strategy,
                    "Could not read tool-call opening tag; leaving block unchanged"
                );
                output.push_str(block);
            }
        }

        cursor = block_end;
    }

    output.trim().to_string()
}

/// Rewrite an assistant message in place.
///
/// Returns `true` if the content changed. Non-assistant messages,
/// structured content, and text without a start marker are skipped.
pub fn rewrite_message(message: &mut Message, strategy: RewriteStrategy) -> bool {
    if message.role != Role::Assistant {
        return false;
    }
    let Some(text) = message.content.as_text_mut() else {
        return false;
    };
    if !text.contains(START_MARKER) {
        return false;
    }

    let rewritten = rewrite(text, strategy);
    if rewritten == *text {
        return false;
    }
    *text = rewritten;
    true
}

/// Apply `strategy` to one block. `end_offset` is where the end marker
/// starts, relative to the block. `None` means the opening tag did not
/// have the shape the strategy needs.
fn transform_block(block: &str, end_offset: usize, strategy: RewriteStrategy) -> Option<Cow<'_, str>> {
    match strategy {
        RewriteStrategy::Strip => Some(Cow::Borrowed("")),
        RewriteStrategy::Summarize => {
            let tag = opening_tag(block, end_offset)?;
            let name = NAME_ATTR
                .captures(tag)
                .and_then(|caps| caps.get(1))
                .map_or(UNKNOWN_TOOL, |m| m.as_str());
            Some(Cow::Owned(summary_line(name)))
        }
        RewriteStrategy::Annotate => {
            let tag = opening_tag(block, end_offset)?;
            if tag.contains(ADVISORY_PREFIX.as_str()) {
                return Some(Cow::Borrowed(block));
            }
            let insert_at = NAME_BEFORE_ARGUMENTS.captures(tag)?.get(1)?.end();
            let mut annotated = String::with_capacity(block.len() + ADVISORY_TEXT.len() + 16);
            annotated.push_str(&block[..insert_at]);
            annotated.push_str(&format!(r#" {ADVISORY_ATTRIBUTE}="{ADVISORY_TEXT}""#));
            annotated.push_str(&block[insert_at..]);
            Some(Cow::Owned(annotated))
        }
    }
}

/// The opening tag, `<details ...>`, if its `>` comes before the end marker.
fn opening_tag(block: &str, end_offset: usize) -> Option<&str> {
    block
        .find('>')
        .filter(|&close| close <= end_offset)
        .map(|close| &block[..=close])
}

/// The line that replaces a block under [`RewriteStrategy::Summarize`].
pub fn summary_line(tool_name: &str) -> String {
    format!("\n↳ **Used `{tool_name}` tool**\n")
}

fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack[from..].find(needle).map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, args: &str) -> String {
        format!(
            "<details type=\"tool_calls\" done=\"true\" id=\"call_{name}\" name=\"{name}\" arguments=\"{args}\">\n<summary>Tool Executed</summary>\n</details>"
        )
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn no_marker_is_identity() {
        let content = "  Plain answer with <details>other</details> markup.\n";
        for strategy in [RewriteStrategy::Strip, RewriteStrategy::Summarize, RewriteStrategy::Annotate] {
            assert_eq!(rewrite(content, strategy), content);
        }
    }

    #[test]
    fn strip_removes_every_block() {
        let blocks = [block("lookup", "{}"), block("add_memory", "{&quot;c&quot;:1}")];
        let content = format!("Let me check.{}Found it.{}Done.", blocks[0], blocks[1]);

        let out = rewrite(&content, RewriteStrategy::Strip);
        assert_eq!(count(&out, START_MARKER), 0);
        assert_eq!(out, "Let me check.Found it.Done.");
        let removed: usize = blocks.iter().map(String::len).sum();
        assert_eq!(out.len(), content.len() - removed);
    }

    #[test]
    fn strip_trims_leftover_whitespace() {
        let content = format!("\n{}\n\nThe answer is 4.\n", block("calc", "2+2"));
        assert_eq!(rewrite(&content, RewriteStrategy::Strip), "The answer is 4.");
    }

    #[test]
    fn summarize_emits_one_line_per_block() {
        let content = format!(
            "{}\n{}\nSummary follows.\n{}",
            block("lookup", "a"),
            block("add_memory", "b"),
            block("lookup", "c")
        );
        let out = rewrite(&content, RewriteStrategy::Summarize);

        assert_eq!(count(&out, "↳ **Used `"), 3);
        assert_eq!(count(&out, "↳ **Used `lookup` tool**"), 2);
        assert_eq!(count(&out, "↳ **Used `add_memory` tool**"), 1);
        assert_eq!(count(&out, START_MARKER), 0);
        assert!(out.starts_with("↳"));
    }

    #[test]
    fn summarize_exact_output() {
        let content = format!("Checking.{}Result ready.", block("lookup", "q"));
        assert_eq!(
            rewrite(&content, RewriteStrategy::Summarize),
            "Checking.\n↳ **Used `lookup` tool**\nResult ready."
        );
    }

    #[test]
    fn summarize_defaults_unknown_name() {
        let content = r#"<details type="tool_calls" done="true" arguments="{}">x</details>"#;
        assert_eq!(
            rewrite(content, RewriteStrategy::Summarize),
            "↳ **Used `unknown_tool` tool**"
        );
    }

    #[test]
    fn summarize_ignores_prefixed_name_attributes() {
        let content = r#"<details type="tool_calls" tool_name="decoy" name="real">x</details>"#;
        assert!(rewrite(content, RewriteStrategy::Summarize).contains("`real`"));

        let only_decoy = r#"<details type="tool_calls" tool_name="decoy">x</details>"#;
        assert!(rewrite(only_decoy, RewriteStrategy::Summarize).contains("`unknown_tool`"));
    }

    #[test]
    fn summarize_only_reads_name_from_opening_tag() {
        let content = r#"<details type="tool_calls" id="1"><summary name="body">s</summary></details>"#;
        assert!(rewrite(content, RewriteStrategy::Summarize).contains("`unknown_tool`"));
    }

    #[test]
    fn unterminated_block_halts_scan() {
        let content = format!("A{START_MARKER} name=\"x\">B");
        for strategy in [RewriteStrategy::Strip, RewriteStrategy::Summarize, RewriteStrategy::Annotate] {
            assert_eq!(rewrite(&content, strategy), content.trim());
        }
    }

    #[test]
    fn unterminated_block_keeps_earlier_rewrites() {
        let content = format!("{}middle{START_MARKER} name=\"late\"> never closed", block("lookup", "q"));
        let out = rewrite(&content, RewriteStrategy::Summarize);
        assert!(out.starts_with("↳ **Used `lookup` tool**\nmiddle"));
        assert!(out.ends_with(r#"<details type="tool_calls" name="late"> never closed"#));
    }

    #[test]
    fn tag_without_closing_bracket_is_left_alone_and_scan_continues() {
        let broken = format!("{START_MARKER} name=\"broken\"</details>");
        let content = format!("{broken} then {}", block("lookup", "q"));

        let out = rewrite(&content, RewriteStrategy::Summarize);
        assert!(out.starts_with(&broken));
        assert!(out.ends_with("then \n↳ **Used `lookup` tool**"));

        let annotated = rewrite(&content, RewriteStrategy::Annotate);
        assert!(annotated.starts_with(&broken));
        assert_eq!(count(&annotated, "note=\""), 1);
    }

    #[test]
    fn annotate_splices_between_name_and_arguments() {
        let content = r#"<details type="tool_calls" name="X" arguments="Y">body</details>"#;
        let expected = format!(
            r#"<details type="tool_calls" name="X" note="{ADVISORY_TEXT}" arguments="Y">body</details>"#
        );
        assert_eq!(rewrite(content, RewriteStrategy::Annotate), expected);
    }

    #[test]
    fn annotate_preserves_whitespace_and_other_attributes() {
        let content = "Intro\n<details type=\"tool_calls\" done=\"true\" name=\"lookup\"\n   arguments=\"{}\" result=\"ok\">\nbody\n</details>\nOutro";
        let out = rewrite(content, RewriteStrategy::Annotate);
        let insertion = format!(" note=\"{ADVISORY_TEXT}\"");
        assert_eq!(out.replacen(&insertion, "", 1), content);
        assert!(out.contains(&format!("name=\"lookup\"{insertion}\n   arguments=")));
    }

    #[test]
    fn annotate_leaves_unexpected_attribute_order_alone() {
        let content = r#"<details type="tool_calls" arguments="Y" name="X">b</details>"#;
        assert_eq!(rewrite(content, RewriteStrategy::Annotate), content);
    }

    #[test]
    fn annotate_twice_is_stable() {
        let content = format!("Hi {}", block("lookup", "q"));
        let once = rewrite(&content, RewriteStrategy::Annotate);
        assert_eq!(rewrite(&once, RewriteStrategy::Annotate), once);
    }

    #[test]
    fn already_annotated_block_is_accepted_as_is() {
        let once = rewrite(&block("lookup", "q"), RewriteStrategy::Annotate);
        let end = once.find(END_MARKER).unwrap();
        assert!(matches!(
            transform_block(&once, end, RewriteStrategy::Annotate),
            Some(Cow::Borrowed(b)) if b == once
        ));
    }

    #[test]
    fn strip_and_summarize_are_idempotent() {
        let content = format!(
            "  {} text {} more {}",
            block("a", "1"),
            block("b", "2"),
            r#"<details type="tool_calls">no name</details>"#
        );
        for strategy in [RewriteStrategy::Strip, RewriteStrategy::Summarize] {
            let once = rewrite(&content, strategy);
            assert_eq!(rewrite(&once, strategy), once);
        }
    }

    #[test]
    fn multibyte_text_around_blocks_survives() {
        let content = format!("日本語 {} émoji 🎉", block("lookup", "q"));
        assert_eq!(rewrite(&content, RewriteStrategy::Strip), "日本語  émoji 🎉");
    }

    #[test]
    fn rewrite_message_only_touches_assistant_text() {
        let text = format!("ok {}", block("lookup", "q"));

        let mut user = Message::user(text.clone());
        assert!(!rewrite_message(&mut user, RewriteStrategy::Strip));
        assert_eq!(user.text(), Some(text.as_str()));

        let mut assistant = Message::assistant(text);
        assert!(rewrite_message(&mut assistant, RewriteStrategy::Strip));
        assert_eq!(assistant.text(), Some("ok"));
    }

    #[test]
    fn rewrite_message_reports_no_change_for_malformed_only() {
        let mut msg = Message::assistant(format!("{START_MARKER} name=\"x\">"));
        assert!(!rewrite_message(&mut msg, RewriteStrategy::Summarize));
    }
}
