//! Heuristic detection of mathematical content in page and line text.
//!
//! ## Why heuristics?
//!
//! Deciding whether a page shows mathematics drives the expensive parts of
//! the pipeline: full-page captures and formula crops are only rendered for
//! positive pages. A wasted capture costs bandwidth and model tokens, so the
//! classifier is tuned for precision over recall — a missed formula degrades
//! an answer, a false positive burns money on every question.
//!
//! ## Rule order is the algorithm
//!
//! Classification walks an explicit ordered list of named rules and
//! short-circuits on the first verdict. Suppression comes first: a table of
//! contents is full of section numbers that would otherwise trip the
//! symbol-density rule, so it must be rejected before any positive rule gets
//! a look. The pattern corpus lives in static tables separate from the
//! evaluation loop; adding a heuristic means adding a row, not touching
//! control flow.
//!
//! [`MathClassifier::classify`] is pure and deterministic. The same function
//! is applied per layout line by the formula harvester.

use crate::config::DEFAULT_DOMAIN_TERMS;
use once_cell::sync::Lazy;
use regex::Regex;

// ── Pattern corpus ───────────────────────────────────────────────────────

/// Core math symbols counted by the density rule: ASCII operators plus the
/// common unicode operators and Greek letters. ASCII `-`, `*`, and `/`
/// count only in operator position (whitespace on both sides) — hyphenated
/// words and dates are not arithmetic.
static RE_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[=+^√∫∑∏±×÷≤≥≠≈]|[Α-Ωα-ω]|(?:^|\s)[-*/](?:\s|$)").unwrap()
});

/// Strong unicode math symbols. Unlike ASCII `-` or `/`, these essentially
/// never appear in prose, so a single hit is decisive.
static RE_STRONG_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[√∫∑∏±×÷≤≥≠≈∞∂∇]").unwrap());

static RE_GREEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Α-Ωα-ω]").unwrap());

/// Strong indicators: any single hit classifies the text as mathematical.
///
/// Each entry is `(label, pattern)`. ASCII `-` and `/` are deliberately
/// absent from the infix pattern — hyphenated words, dates, and page ranges
/// would otherwise classify as arithmetic.
const STRONG_PATTERNS: &[(&str, &str)] = &[
    ("unicode-math-symbol", r"[√∫∑∏±×÷≤≥≠≈∞∂∇]"),
    ("greek-letter", r"[Α-Ωα-ω]"),
    (
        "math-delimiter",
        r"\$[^$\n]+\$|\\\(|\\\[|\\(?:frac|sqrt|sum|int)\b",
    ),
    (
        "trig-function",
        r"\b(?:sin|cos|tan|cot|sec|csc|sinh|cosh|tanh|arcsin|arccos|arctan)\b",
    ),
    ("infix-arithmetic", r"\d\s*[=+*/^×÷]\s*\d"),
    (
        "sub-superscript",
        r"\b[A-Za-z]_\{?[A-Za-z0-9]|\^\{?[0-9A-Za-z]|[₀₁₂₃₄₅₆₇₈₉⁰¹²³⁴⁵⁶⁷⁸⁹]",
    ),
    ("variable-equation", r"\b[A-Za-z]\s*=\s*[A-Za-z0-9(]"),
    ("bragg-law", r"(?i)\bn?\s*(?:λ|lambda)\s*=\s*2\s*d\s*sin"),
];

static STRONG: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    STRONG_PATTERNS
        .iter()
        .map(|(name, pat)| (*name, Regex::new(pat).unwrap()))
        .collect()
});

/// Patterns counted as equations in the indicator report.
static RE_EQUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]\s*=\s*[A-Za-z0-9(]|\d\s*[=+*/^×÷]\s*\d").unwrap());

// Contents-page suppression.
static RE_CONTENTS_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?i:chapter\s+\d+|contents|table\s+of\s+contents|outline\b)|^\s*\d+\.?\s+[A-Z]")
        .unwrap()
});
static RE_SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\.\d+\.?\s+[A-Z][A-Za-z]").unwrap());
static RE_EQUALITY_OR_GREEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"=|[Α-Ωα-ω]").unwrap());

// Textbook variable definitions: "d is the interplanar spacing".
static RE_VARIABLE_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]\b\s+is\s+(?:the|a|an)\b").unwrap());

// Weak signals: individually meaningless, suggestive in combination.
static RE_PAREN_NUMERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d+\)").unwrap());
static RE_VECTOR_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bvectors?\b").unwrap());

/// Symbol-density rule thresholds: more than [`SYMBOL_DENSITY_MIN`] core
/// symbols within fewer than [`SHORT_TEXT_LIMIT`] characters.
const SYMBOL_DENSITY_MIN: usize = 3;
const SHORT_TEXT_LIMIT: usize = 500;

/// Section-number headings required before a page reads as a contents page.
const CONTENTS_HEADING_MIN: usize = 3;

/// Variable-definition phrasings required for a positive on their own.
const VARIABLE_DEFINITION_MIN: usize = 2;

// ── Signals ──────────────────────────────────────────────────────────────

/// Precomputed text statistics shared by every rule.
struct Signals {
    len: usize,
    symbol_count: usize,
    section_heading_count: usize,
    variable_definition_count: usize,
    weak_category_count: usize,
    strong_hit: Option<&'static str>,
}

impl Signals {
    fn scan(text: &str) -> Self {
        let symbol_count = RE_SYMBOL.find_iter(text).count();
        let variable_definition_count = RE_VARIABLE_DEFINITION.find_iter(text).count();

        let mut weak_category_count = 0;
        if RE_PAREN_NUMERAL.is_match(text) {
            weak_category_count += 1;
        }
        if variable_definition_count > 0 {
            weak_category_count += 1;
        }
        if RE_VECTOR_WORD.is_match(text) {
            weak_category_count += 1;
        }

        Signals {
            len: text.chars().count(),
            symbol_count,
            section_heading_count: RE_SECTION_HEADING.find_iter(text).count(),
            variable_definition_count,
            weak_category_count,
            strong_hit: STRONG
                .iter()
                .find(|(_, re)| re.is_match(text))
                .map(|(name, _)| *name),
        }
    }
}

// ── Rules ────────────────────────────────────────────────────────────────

type RuleFn = fn(&MathClassifier, &str, &Signals) -> Option<bool>;

struct Rule {
    name: &'static str,
    eval: RuleFn,
}

/// The ordered rule list. First verdict wins.
const RULES: &[Rule] = &[
    Rule {
        name: "contents-page",
        eval: rule_contents_page,
    },
    Rule {
        name: "strong-indicator",
        eval: rule_strong_indicator,
    },
    Rule {
        name: "symbol-density",
        eval: rule_symbol_density,
    },
    Rule {
        name: "domain-term",
        eval: rule_domain_term,
    },
    Rule {
        name: "variable-definition",
        eval: rule_variable_definition,
    },
    Rule {
        name: "weak-aggregation",
        eval: rule_weak_aggregation,
    },
];

/// A numbered table of contents is not math, however many section numbers
/// it carries. Suppressed only when no equality sign or Greek letter is
/// present, so a contents page that actually shows an equation still
/// classifies positive further down.
fn rule_contents_page(_c: &MathClassifier, text: &str, sig: &Signals) -> Option<bool> {
    if RE_CONTENTS_START.is_match(text)
        && sig.section_heading_count >= CONTENTS_HEADING_MIN
        && !RE_EQUALITY_OR_GREEK.is_match(text)
    {
        return Some(false);
    }
    None
}

fn rule_strong_indicator(_c: &MathClassifier, _text: &str, sig: &Signals) -> Option<bool> {
    sig.strong_hit.map(|_| true)
}

fn rule_symbol_density(_c: &MathClassifier, _text: &str, sig: &Signals) -> Option<bool> {
    if sig.symbol_count > SYMBOL_DENSITY_MIN && sig.len < SHORT_TEXT_LIMIT {
        return Some(true);
    }
    None
}

/// A subject-matter term plus at least one symbol. A bare mention of the
/// term with zero symbols stays negative, so a section title that merely
/// names the topic does not trigger a capture.
fn rule_domain_term(c: &MathClassifier, text: &str, sig: &Signals) -> Option<bool> {
    if sig.symbol_count == 0 {
        return None;
    }
    let lower = text.to_lowercase();
    if c.domain_terms.iter().any(|t| lower.contains(t.as_str())) {
        return Some(true);
    }
    None
}

fn rule_variable_definition(_c: &MathClassifier, _text: &str, sig: &Signals) -> Option<bool> {
    if sig.variable_definition_count >= VARIABLE_DEFINITION_MIN {
        return Some(true);
    }
    None
}

fn rule_weak_aggregation(_c: &MathClassifier, _text: &str, sig: &Signals) -> Option<bool> {
    if sig.weak_category_count >= 2 && sig.symbol_count >= 1 {
        return Some(true);
    }
    None
}

// ── Classifier ───────────────────────────────────────────────────────────

/// The verdict of the first rule that matched, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleVerdict {
    pub rule: &'static str,
    pub is_math: bool,
}

/// Per-text indicator counts, surfaced by the math-analysis report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MathIndicators {
    pub symbol_count: usize,
    pub greek_letter_count: usize,
    pub equation_count: usize,
    pub strong_symbol_count: usize,
}

/// Layered heuristic classifier for mathematical content.
///
/// Construction compiles nothing — the pattern corpus is static — but the
/// domain-term vocabulary is per-instance so callers can retune the
/// subject-matter rule without recompiling.
#[derive(Debug, Clone)]
pub struct MathClassifier {
    domain_terms: Vec<String>,
}

impl Default for MathClassifier {
    fn default() -> Self {
        Self {
            domain_terms: DEFAULT_DOMAIN_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MathClassifier {
    /// Build a classifier with a custom domain-term vocabulary. Terms are
    /// matched as lowercase substrings.
    pub fn new<I, S>(domain_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domain_terms: domain_terms
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Does this text look mathematical?
    ///
    /// Pure and deterministic; never fails. Defaults to `false` when no
    /// rule fires.
    pub fn classify(&self, text: &str) -> bool {
        self.evaluate(text).map(|v| v.is_math).unwrap_or(false)
    }

    /// Like [`classify`](Self::classify) but reports which rule decided.
    /// `None` means no rule fired (the default-negative case).
    pub fn evaluate(&self, text: &str) -> Option<RuleVerdict> {
        let signals = Signals::scan(text);
        for rule in RULES {
            if let Some(is_math) = (rule.eval)(self, text, &signals) {
                tracing::trace!(rule = rule.name, is_math, "classifier verdict");
                return Some(RuleVerdict {
                    rule: rule.name,
                    is_math,
                });
            }
        }
        None
    }

    /// Indicator counts for the analysis report.
    pub fn indicators(&self, text: &str) -> MathIndicators {
        MathIndicators {
            symbol_count: RE_SYMBOL.find_iter(text).count(),
            greek_letter_count: RE_GREEK.find_iter(text).count(),
            equation_count: RE_EQUATION.find_iter(text).count(),
            strong_symbol_count: RE_STRONG_SYMBOL.find_iter(text).count(),
        }
    }

    /// Count of core math symbols, for the capture stage's bare-symbol scan.
    pub fn symbol_count(text: &str) -> usize {
        RE_SYMBOL.find_iter(text).count()
    }

    /// True when a decisive unicode math symbol is present.
    pub fn has_strong_symbol(text: &str) -> bool {
        RE_STRONG_SYMBOL.is_match(text)
    }

    /// True when the text contains an equality sign or a Greek letter.
    /// The demotion pass uses this to spare genuinely mathematical headings.
    pub fn has_equality_or_greek(text: &str) -> bool {
        RE_EQUALITY_OR_GREEK.is_match(text)
    }

    /// Shared contents-page shape test, also used to derive the
    /// `has_table_of_contents` metadata flag.
    pub fn looks_like_contents_page(text: &str) -> bool {
        RE_CONTENTS_START.is_match(text)
            && RE_SECTION_HEADING.find_iter(text).count() >= CONTENTS_HEADING_MIN
            && !RE_EQUALITY_OR_GREEK.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> MathClassifier {
        MathClassifier::default()
    }

    #[test]
    fn deterministic_for_identical_input() {
        let c = classifier();
        let text = "E = mc^2 explains mass-energy equivalence";
        assert_eq!(c.classify(text), c.classify(text));
    }

    #[test]
    fn plain_prose_is_not_math() {
        let c = classifier();
        assert!(!c.classify("The lecture covers the history of the printing press."));
        assert!(!c.classify(""));
    }

    #[test]
    fn contents_page_is_suppressed() {
        let c = classifier();
        let toc = "Chapter 3\n3.1 Intro\n3.2 Method\n3.3 Results\n3.4 Summary";
        assert_eq!(
            c.evaluate(toc),
            Some(RuleVerdict {
                rule: "contents-page",
                is_math: false
            })
        );
    }

    #[test]
    fn contents_page_with_equation_still_classifies() {
        let c = classifier();
        let text = "Chapter 3\n3.1 Intro\n3.2 Method\n3.3 Results\nwhere E = hv";
        assert!(c.classify(text));
    }

    #[test]
    fn strong_indicators_fire_on_single_hit() {
        let c = classifier();
        assert!(c.classify("the integral ∫ f(x) dx over the cell"));
        assert!(c.classify("angle θ between the beams"));
        assert!(c.classify("inline math $x^2 + y^2$ here"));
        assert!(c.classify("amplitude falls as sin of the angle"));
        assert!(c.classify("so 2 + 2 gives 4"));
        assert!(c.classify("the term x_i of the series"));
        assert!(c.classify("E = mc"));
    }

    #[test]
    fn bragg_law_fragment_is_math() {
        let c = classifier();
        assert!(c.classify("recall that n lambda = 2 d sin theta for reflection"));
    }

    #[test]
    fn symbol_density_on_short_text() {
        let c = classifier();
        // Four hyphens, no other indicator: density rule must catch it.
        let text = "a - b - c - d - e";
        assert_eq!(
            c.evaluate(text),
            Some(RuleVerdict {
                rule: "symbol-density",
                is_math: true
            })
        );
    }

    #[test]
    fn symbol_density_ignores_long_text() {
        let c = classifier();
        let filler = "word ".repeat(120);
        let text = format!("{filler} one - two - three - four - five");
        assert!(text.len() >= 500);
        assert!(!c.classify(&text));
    }

    #[test]
    fn bare_domain_term_is_not_math() {
        let c = classifier();
        assert!(!c.classify("Introduction to diffraction"));
    }

    #[test]
    fn domain_term_with_symbol_is_math() {
        let c = classifier();
        // One ASCII operator alone is not strong, but combined with the
        // domain vocabulary it is decisive.
        let verdict = c.evaluate("diffraction from planes spaced d - spacing apart").unwrap();
        assert!(verdict.is_math);
        assert_eq!(verdict.rule, "domain-term");
    }

    #[test]
    fn custom_domain_terms_are_honoured() {
        let c = MathClassifier::new(["fourier"]);
        assert!(c.classify("the Fourier coefficients decay - slowly"));
        assert!(!c.classify("the bragg condition holds - here"));
    }

    #[test]
    fn variable_definitions_trigger_at_two() {
        let c = classifier();
        let text = "where d is the interplanar spacing and n is an integer";
        let verdict = c.evaluate(text).unwrap();
        assert!(verdict.is_math);
        assert!(!c.classify("where d is the interplanar spacing"));
    }

    #[test]
    fn weak_signals_need_company_and_a_symbol() {
        let c = classifier();
        // Two weak categories plus one symbol.
        assert!(c.classify("equation (1) defines the vector g - reciprocal"));
        // Two weak categories, zero symbols: stays negative.
        assert!(!c.classify("equation (1) defines the vector g"));
        // One weak category plus a symbol: stays negative.
        assert!(!c.classify("see item (1) and also item two - done"));
    }

    #[test]
    fn indicators_count_greek_and_equations() {
        let c = classifier();
        let ind = c.indicators("λ = 2d sinθ and 3 + 4 = 7");
        assert!(ind.greek_letter_count >= 2);
        assert!(ind.equation_count >= 1);
        assert!(ind.symbol_count >= 3);
    }

    #[test]
    fn line_level_reuse_matches_page_level() {
        let c = classifier();
        for line in ["y = a x + b", "plain caption text", "Σ over all sites"] {
            assert_eq!(c.classify(line), c.classify(line));
        }
        assert!(c.classify("y = a x + b"));
        assert!(!c.classify("plain caption text"));
    }
}
