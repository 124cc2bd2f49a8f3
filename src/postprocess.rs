//! Post-processing: deterministic rewrite of the model's answer into HTML
//! with navigable slide references.
//!
//! ## Rule Order
//!
//! The rules are cheap regex passes, but their order is load-bearing:
//! ranges and paired mentions must be rewritten before the generic
//! singular pass, or "Slides 8-18" would have its "8" consumed by the
//! singular rule and the range corrupted. Every linking pass also matches
//! existing `<a>` elements and passes them through untouched, so a later
//! rule can never rewrite inside an anchor an earlier rule produced.
//!
//! Rules (applied in order):
//! 1. `**text**` → `<strong>`, then `*text*` → `<em>`
//! 2. Ranges: "Slides 8-18", "Page 4 to 6" → one anchor with `data-range`
//! 3. Pairs: "Slides 3 and 5" → two single-target anchors joined by "and"
//! 4. Lowercase singulars: "slide 7" → anchor
//! 5. Remaining singulars: "Slide 7" → anchor
//!
//! Display text is always preserved verbatim inside the anchor.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Rewrite a raw model answer into HTML.
pub fn postprocess_answer(input: &str) -> String {
    let s = apply_emphasis(input);
    let s = link_ranges(&s);
    let s = link_pairs(&s);
    let s = link_lowercase_singulars(&s);
    link_remaining_singulars(&s)
}

/// Shared shape of every linking pass: the first alternation branch matches
/// an existing anchor (no capture groups), the second the rule's pattern.
/// A match with no group 1 is an anchor and is returned unchanged.
fn rewrite_outside_anchors(
    input: &str,
    re: &Regex,
    rewrite: impl Fn(&Captures<'_>) -> String,
) -> String {
    re.replace_all(input, |caps: &Captures<'_>| {
        if caps.get(1).is_none() {
            caps[0].to_string()
        } else {
            rewrite(caps)
        }
    })
    .to_string()
}

// ── Rule 1: emphasis markup ──────────────────────────────────────────────

static RE_STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_EM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

/// Double-emphasis first, single second — the reverse order would eat the
/// inner asterisks of `**bold**`.
fn apply_emphasis(input: &str) -> String {
    let s = RE_STRONG.replace_all(input, "<strong>$1</strong>");
    RE_EM.replace_all(&s, "<em>$1</em>").to_string()
}

// ── Rule 2: range mentions ───────────────────────────────────────────────

static RE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<a [^>]*>.*?</a>|(?i:\b((?:slide|page)s?)\s+(\d+)(?:\s*[-–—]\s*|\s+to\s+)(\d+)\b)")
        .unwrap()
});

fn link_ranges(input: &str) -> String {
    rewrite_outside_anchors(input, &RE_RANGE, |caps| {
        format!(
            r##"<a href="#" class="page-ref" data-range="{}-{}">{}</a>"##,
            &caps[2], &caps[3], &caps[0]
        )
    })
}

// ── Rule 3: paired mentions ──────────────────────────────────────────────

static RE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<a [^>]*>.*?</a>|(?i:\b((?:slide|page)s)\s+(\d+)\s+and\s+(\d+)\b)").unwrap()
});

fn link_pairs(input: &str) -> String {
    rewrite_outside_anchors(input, &RE_PAIR, |caps| {
        let label = &caps[1];
        // "Slides" → "Slide", keeping the original casing.
        let singular = &label[..label.len() - 1];
        format!(
            r##"<a href="#" class="page-ref" data-page="{x}">{singular} {x}</a> and <a href="#" class="page-ref" data-page="{y}">{singular} {y}</a>"##,
            x = &caps[2],
            y = &caps[3],
        )
    })
}

// ── Rules 4 and 5: singular mentions ─────────────────────────────────────

static RE_LOWER_SINGULAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a [^>]*>.*?</a>|\b(slide|page)\s+(\d+)\b").unwrap());

static RE_SINGULAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a [^>]*>.*?</a>|(?i:\b(slide|page)\s+(\d+)\b)").unwrap());

fn link_singular(caps: &Captures<'_>) -> String {
    format!(
        r##"<a href="#" class="page-ref" data-page="{}">{}</a>"##,
        &caps[2], &caps[0]
    )
}

fn link_lowercase_singulars(input: &str) -> String {
    rewrite_outside_anchors(input, &RE_LOWER_SINGULAR, link_singular)
}

fn link_remaining_singulars(input: &str) -> String {
    rewrite_outside_anchors(input, &RE_SINGULAR, link_singular)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_rewrites_in_order() {
        assert_eq!(
            postprocess_answer("**Important** and *note*"),
            "<strong>Important</strong> and <em>note</em>"
        );
    }

    #[test]
    fn range_before_singular_keeps_the_range_intact() {
        let html = postprocess_answer("See Slides 8-18 and also Slide 3.");
        assert!(
            html.contains(r##"<a href="#" class="page-ref" data-range="8-18">Slides 8-18</a>"##),
            "got: {html}"
        );
        assert!(
            html.contains(r##"<a href="#" class="page-ref" data-page="3">Slide 3</a>"##),
            "got: {html}"
        );
        // No number may end up inside two overlapping anchors.
        assert!(!html.contains(r#"data-page="8""#), "got: {html}");
        assert!(!html.contains(r#"data-page="18""#), "got: {html}");
    }

    #[test]
    fn to_ranges_are_linked() {
        let html = postprocess_answer("Compare Page 4 to 6 for details.");
        assert!(
            html.contains(r##"<a href="#" class="page-ref" data-range="4-6">Page 4 to 6</a>"##),
            "got: {html}"
        );
    }

    #[test]
    fn range_display_text_survives_later_passes() {
        // "Slide 8 to 18" carries a singular "Slide 8" in its display text;
        // the singular rules must not rewrite inside the anchor.
        let html = postprocess_answer("Slide 8 to 18 covers the proofs.");
        assert_eq!(
            html,
            r##"<a href="#" class="page-ref" data-range="8-18">Slide 8 to 18</a> covers the proofs."##
        );
    }

    #[test]
    fn pairs_become_two_anchors() {
        let html = postprocess_answer("Slides 3 and 5 show the setup.");
        assert_eq!(
            html,
            r##"<a href="#" class="page-ref" data-page="3">Slide 3</a> and <a href="#" class="page-ref" data-page="5">Slide 5</a> show the setup."##
        );
    }

    #[test]
    fn pair_rule_skips_longer_numbers() {
        // "15" must not be read as the pair partner of "1".
        let html = postprocess_answer("Slides 12 and 156 apply.");
        assert!(html.contains(r#"data-page="12""#));
        assert!(html.contains(r#"data-page="156""#));
    }

    #[test]
    fn lowercase_singulars_are_linked() {
        let html = postprocess_answer("as shown on slide 7 and page 9");
        assert!(html.contains(r##"<a href="#" class="page-ref" data-page="7">slide 7</a>"##));
        assert!(html.contains(r##"<a href="#" class="page-ref" data-page="9">page 9</a>"##));
    }

    #[test]
    fn capitalized_singulars_are_linked_last() {
        let html = postprocess_answer("Slide 2 introduces the topic.");
        assert_eq!(
            html,
            r##"<a href="#" class="page-ref" data-page="2">Slide 2</a> introduces the topic."##
        );
    }

    #[test]
    fn mixed_answer_full_pipeline() {
        let html = postprocess_answer(
            "**Bragg's law** appears on Slides 4-6. A *derivation* is on slide 7, and Slides 9 and 11 give examples.",
        );
        assert!(html.contains("<strong>Bragg's law</strong>"));
        assert!(html.contains("<em>derivation</em>"));
        assert!(html.contains(r#"data-range="4-6""#));
        assert!(html.contains(r##"data-page="7">slide 7</a>"##));
        assert!(html.contains(r##"data-page="9">Slide 9</a> and <a href="#" class="page-ref" data-page="11">Slide 11</a>"##));
    }

    #[test]
    fn plain_text_passes_through() {
        let input = "No references here, just prose.";
        assert_eq!(postprocess_answer(input), input);
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let once = postprocess_answer("See Slide 3 and also Slides 8-18.");
        let twice = postprocess_answer(&once);
        assert_eq!(once, twice);
    }
}
