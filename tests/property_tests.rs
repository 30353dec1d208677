use proptest::prelude::*;

use testinspect::analyzers::statics::{nesting_depth, normalize_indent};
use testinspect::core::Language;
use testinspect::harness::InstantCounters;
use testinspect::metrics::{maintainability_index, ComplexityProvider, TreeSitterProvider};
use testinspect::parser::Parser;

// ---------------------------------------------------------------------------
// Indentation normalization properties
// ---------------------------------------------------------------------------

proptest! {
    /// Two snippets differing only in a constant leading-whitespace prefix
    /// applied uniformly to every line normalize to identical text.
    #[test]
    fn normalization_removes_uniform_prefix(
        pad in 0usize..12,
        first in prop_oneof![
            Just("def test_x():"),
            Just("x = 1"),
            Just("assert x == 1"),
        ],
        rest in prop::collection::vec(
            prop_oneof![
                Just("x = 1"),
                Just("assert x == 1"),
                Just("y = foo(x)"),
                Just("    z = x + y"),
            ],
            0..5,
        )
    ) {
        let mut plain: Vec<&str> = vec![first];
        plain.extend(rest.iter().copied());

        let padded: Vec<String> = plain
            .iter()
            .map(|line| format!("{}{}", " ".repeat(pad), line))
            .collect();
        let padded_refs: Vec<&str> = padded.iter().map(String::as_str).collect();

        prop_assert_eq!(normalize_indent(&plain), normalize_indent(&padded_refs));
    }

    /// Normalization is idempotent: a normalized snippet normalizes to
    /// itself.
    #[test]
    fn normalization_idempotent(
        pad in 0usize..8,
        body in prop::collection::vec(Just("a = b"), 1..5)
    ) {
        let padded: Vec<String> = body
            .iter()
            .map(|line| format!("{}{}", " ".repeat(pad), line))
            .collect();
        let padded_refs: Vec<&str> = padded.iter().map(String::as_str).collect();

        let once = normalize_indent(&padded_refs);
        let once_lines: Vec<&str> = once.lines().collect();
        let twice = normalize_indent(&once_lines);
        prop_assert_eq!(once, twice);
    }
}

// ---------------------------------------------------------------------------
// Nesting depth properties
// ---------------------------------------------------------------------------

proptest! {
    /// Sequential same-level statements never add depth; the depth of a
    /// flat block equals 1 regardless of its length.
    #[test]
    fn flat_statements_have_depth_one(count in 1usize..10) {
        let source = "a = 1\n".repeat(count);
        let parser = Parser::new();
        let parsed = parser
            .parse(source.as_bytes(), Language::Python, std::path::Path::new("t.py"))
            .unwrap();
        prop_assert_eq!(nesting_depth(&parsed.root_node(), Language::Python), 1);
    }

    /// Each nested block adds exactly one level.
    #[test]
    fn nested_blocks_add_one_each(levels in 1usize..8) {
        let mut source = String::new();
        for i in 0..levels {
            source.push_str(&"    ".repeat(i));
            source.push_str("if x:\n");
        }
        source.push_str(&"    ".repeat(levels));
        source.push_str("a = 1\n");

        let parser = Parser::new();
        let parsed = parser
            .parse(source.as_bytes(), Language::Python, std::path::Path::new("t.py"))
            .unwrap();
        prop_assert_eq!(
            nesting_depth(&parsed.root_node(), Language::Python),
            (levels + 1) as u32
        );
    }
}

// ---------------------------------------------------------------------------
// Metrics properties
// ---------------------------------------------------------------------------

proptest! {
    /// All provider metrics stay non-negative over syntactically-valid
    /// Python bodies, and cyclomatic complexity never drops below 1.
    #[test]
    fn metrics_non_negative(
        body in prop::collection::vec(
            prop_oneof![
                Just("x = 1\n"),
                Just("if x:\n    pass\n"),
                Just("for i in range(10):\n    pass\n"),
                Just("while True:\n    break\n"),
                Just("assert x\n"),
                Just("# comment\n"),
            ],
            1..8,
        )
    ) {
        let source = body.join("");
        let provider = TreeSitterProvider::new();
        let m = provider.measure(&source, Language::Python).unwrap();

        prop_assert!(m.halstead_volume >= 0.0);
        prop_assert!(m.cyclomatic_complexity >= 1.0);
        prop_assert!((0.0..=100.0).contains(&m.comment_percent));

        let mi = maintainability_index(
            m.halstead_volume,
            m.cyclomatic_complexity,
            m.logical_lines,
            m.comment_percent,
        );
        prop_assert!((0.0..=100.0).contains(&mi));
    }

    /// Peak-minus-baseline deltas never go negative, whatever the
    /// supervisor observed.
    #[test]
    fn peak_deltas_saturate(
        peak_threads in 0u64..64,
        peak_mem in 0u64..1_000_000,
        base_threads in 0u64..64,
        base_mem in 0u64..1_000_000,
    ) {
        let peak = InstantCounters { threads: peak_threads, memory_bytes: peak_mem };
        let baseline = InstantCounters { threads: base_threads, memory_bytes: base_mem };
        let delta = peak.saturating_delta(baseline);

        prop_assert!(delta.threads <= peak.threads.max(base_threads));
        if peak_threads >= base_threads {
            prop_assert_eq!(delta.threads, peak_threads - base_threads);
        } else {
            prop_assert_eq!(delta.threads, 0);
        }
        if peak_mem >= base_mem {
            prop_assert_eq!(delta.memory_bytes, peak_mem - base_mem);
        } else {
            prop_assert_eq!(delta.memory_bytes, 0);
        }
    }
}
