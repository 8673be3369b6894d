use super::*;
use crate::kernel::grammar::GrammarSource;
use proptest::prelude::*;
use serde_json::json;

fn grammar(value: serde_json::Value) -> Arc<Grammar> {
    let source: GrammarSource = serde_json::from_value(value).expect("grammar source");
    Arc::new(Grammar::compile(&source).expect("grammar compiles"))
}

fn demo_grammar() -> Arc<Grammar> {
    grammar(json!({
        "scopeName": "source.demo",
        "patterns": [
            { "match": "#.*$", "name": "comment.line" },
            { "match": "[A-Za-z_]+", "name": "identifier" },
            { "begin": "\"", "end": "\"", "name": "string" }
        ]
    }))
}

fn render(tokens: &[Token]) -> Vec<(Range<usize>, String)> {
    tokens
        .iter()
        .map(|t| (t.range.clone(), t.scopes.to_string()))
        .collect()
}

fn run(grammar: &Arc<Grammar>, line: &str, state: &RuleStack) -> LineTokens {
    tokenize_line(grammar, line, state).expect("tokenize")
}

#[test]
fn identifier_whitespace_comment() {
    let g = demo_grammar();
    let out = run(&g, "foo # bar", &RuleStack::empty());

    assert_eq!(
        render(&out.tokens),
        vec![
            (0..3, "source.demo identifier".to_string()),
            (3..4, "source.demo".to_string()),
            (4..9, "source.demo comment.line".to_string()),
        ]
    );
    assert!(out.state.is_empty());
}

#[test]
fn unterminated_string_carries_over() {
    let g = demo_grammar();
    let first = run(&g, "\"ab", &RuleStack::empty());

    assert_eq!(
        render(&first.tokens),
        vec![(0..3, "source.demo string".to_string())]
    );
    assert_eq!(first.state.depth(), 1);

    let second = run(&g, "cd\" x", &first.state);
    assert_eq!(
        render(&second.tokens),
        vec![
            (0..3, "source.demo string".to_string()),
            (3..4, "source.demo".to_string()),
            (4..5, "source.demo identifier".to_string()),
        ]
    );
    assert!(second.state.is_empty());
}

#[test]
fn empty_line_yields_one_zero_width_token() {
    let g = demo_grammar();
    let root = run(&g, "", &RuleStack::empty());
    assert_eq!(render(&root.tokens), vec![(0..0, "source.demo".to_string())]);

    let inside = run(&g, "\"", &RuleStack::empty()).state;
    let out = run(&g, "", &inside);
    assert_eq!(
        render(&out.tokens),
        vec![(0..0, "source.demo string".to_string())]
    );
    assert_eq!(out.state, inside);
}

#[test]
fn earlier_rule_wins_on_equal_start() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [
            { "match": "ab", "name": "first" },
            { "match": "abc", "name": "second" }
        ]
    }));
    let out = run(&g, "abc", &RuleStack::empty());
    assert_eq!(
        render(&out.tokens),
        vec![
            (0..2, "source.demo first".to_string()),
            (2..3, "source.demo".to_string()),
        ]
    );
}

#[test]
fn capture_groups_nest_scopes() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{
            "match": "((\\d+)-(\\d+))",
            "name": "m",
            "captures": { "1": { "name": "r" }, "2": { "name": "a" }, "3": { "name": "b" } }
        }]
    }));
    let out = run(&g, "12-34", &RuleStack::empty());
    assert_eq!(
        render(&out.tokens),
        vec![
            (0..2, "source.demo m r a".to_string()),
            (2..3, "source.demo m r".to_string()),
            (3..5, "source.demo m r b".to_string()),
        ]
    );
}

#[test]
fn content_name_scopes_the_interior_only() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{
            "begin": "\\[code\\]", "end": "\\[/code\\]",
            "name": "meta.code", "contentName": "markup.raw"
        }]
    }));
    let out = run(&g, "[code]x[/code]", &RuleStack::empty());
    assert_eq!(
        render(&out.tokens),
        vec![
            (0..6, "source.demo meta.code".to_string()),
            (6..7, "source.demo meta.code markup.raw".to_string()),
            (7..14, "source.demo meta.code".to_string()),
        ]
    );
}

#[test]
fn backreferenced_end_matches_begin_text() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{ "begin": "<(\\w+)>", "end": "</\\1>", "name": "meta.tag" }]
    }));

    let out = run(&g, "<b>x</i></b>y", &RuleStack::empty());
    assert_eq!(
        render(&out.tokens),
        vec![
            (0..12, "source.demo meta.tag".to_string()),
            (12..13, "source.demo".to_string()),
        ]
    );
    assert!(out.state.is_empty());

    let em = run(&g, "<em>", &RuleStack::empty()).state;
    let em_again = run(&g, "<em>", &RuleStack::empty()).state;
    let b = run(&g, "<b>", &RuleStack::empty()).state;
    assert_eq!(em, em_again);
    assert_ne!(em, b);

    let closed = run(&g, "</b></em>", &em);
    assert!(closed.state.is_empty());
}

#[test]
fn resolved_end_patterns_stay_bounded() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{ "begin": "<(\\w+)>", "end": "</\\1>", "name": "meta.tag" }]
    }));
    let mut tokenizer = LineTokenizer::new(g, &HighlightConfig::default());

    let mut open = None;
    for i in 0..(MAX_DYNAMIC_END_PATTERNS * 2 + 10) {
        let state = tokenizer
            .tokenize_line(&format!("<t{i}>"), &RuleStack::empty())
            .unwrap()
            .state;
        assert!(tokenizer.end_regexes.len() <= MAX_DYNAMIC_END_PATTERNS);
        if i == 5 {
            open = Some(state);
        }
    }

    // An evicted pattern is rebuilt on demand.
    let open = open.expect("state after <t5>");
    let closed = tokenizer.tokenize_line("</t5>", &open).unwrap();
    assert!(closed.state.is_empty());

    tokenizer.clear_caches();
    assert!(tokenizer.end_regexes.is_empty());
}

#[test]
fn state_from_another_grammar_is_rejected() {
    let foreign = RuleStack::empty().push(
        RuleId::new(999),
        None,
        ScopePath::empty(),
        ScopePath::empty(),
    );
    let err = tokenize_line(&demo_grammar(), "abc", &foreign).unwrap_err();
    assert!(matches!(
        err,
        MatchEngineError::UnknownRule { rule: 999, .. }
    ));
}

#[test]
fn apply_end_pattern_last_lets_nested_rules_win_ties() {
    let source = |last: bool| {
        grammar(json!({
            "scopeName": "source.demo",
            "patterns": [{
                "begin": "<", "end": ">", "name": "meta.angle",
                "applyEndPatternLast": last,
                "patterns": [{ "match": ">>", "name": "shift" }]
            }]
        }))
    };

    let end_first = run(&source(false), "<a>>", &RuleStack::empty());
    assert!(end_first.state.is_empty());
    assert_eq!(
        render(&end_first.tokens).last(),
        Some(&(3..4, "source.demo".to_string()))
    );

    let end_last = run(&source(true), "<a>>", &RuleStack::empty());
    assert_eq!(end_last.state.depth(), 1);
    assert_eq!(
        render(&end_last.tokens).last(),
        Some(&(2..4, "source.demo meta.angle shift".to_string()))
    );
}

#[test]
fn zero_width_matches_do_not_loop() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{ "match": "(?m)^", "name": "bol" }]
    }));
    let out = run(&g, "abc", &RuleStack::empty());
    assert_eq!(render(&out.tokens), vec![(0..3, "source.demo".to_string())]);

    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{ "begin": "", "end": "", "name": "empty" }]
    }));
    let out = run(&g, "abc", &RuleStack::empty());
    assert_eq!(out.tokens.first().map(|t| t.range.start), Some(0));
    assert_eq!(out.tokens.last().map(|t| t.range.end), Some(3));
}

#[test]
fn step_limit_raises_match_engine_error() {
    let config = HighlightConfig {
        step_limit_per_line: 3,
        ..HighlightConfig::default()
    };
    let mut tokenizer = LineTokenizer::new(demo_grammar(), &config);
    let err = tokenizer
        .tokenize_line("a b c d e", &RuleStack::empty())
        .unwrap_err();
    assert!(matches!(
        err,
        MatchEngineError::StepLimitExceeded { limit: 3, .. }
    ));
}

#[test]
fn overlong_line_passes_state_through() {
    let config = HighlightConfig {
        max_line_len: 4,
        ..HighlightConfig::default()
    };
    let g = demo_grammar();
    let inside = run(&g, "\"", &RuleStack::empty()).state;

    let mut tokenizer = LineTokenizer::new(g, &config);
    let out = tokenizer.tokenize_line("ab\"cdef", &inside).unwrap();
    assert_eq!(
        render(&out.tokens),
        vec![(0..7, "source.demo string".to_string())]
    );
    assert_eq!(out.state, inside);
}

#[test]
fn self_recursive_rule_nests_across_lines() {
    let g = grammar(json!({
        "scopeName": "source.demo",
        "patterns": [{ "include": "#paren" }],
        "repository": {
            "paren": {
                "begin": "\\(", "end": "\\)", "name": "meta.paren",
                "patterns": [{ "include": "#paren" }]
            }
        }
    }));

    let first = run(&g, "((", &RuleStack::empty());
    assert_eq!(first.state.depth(), 2);
    assert_eq!(
        render(&first.tokens),
        vec![
            (0..1, "source.demo meta.paren".to_string()),
            (1..2, "source.demo meta.paren meta.paren".to_string()),
        ]
    );

    let second = run(&g, "))", &first.state);
    assert!(second.state.is_empty());
}

fn assert_covers(line: &str, tokens: &[Token]) {
    assert!(!tokens.is_empty());
    assert_eq!(tokens[0].range.start, 0);
    for pair in tokens.windows(2) {
        assert_eq!(pair[0].range.end, pair[1].range.start);
    }
    assert_eq!(tokens[tokens.len() - 1].range.end, line.len());
    if !line.is_empty() {
        assert!(tokens.iter().all(|t| !t.range.is_empty()));
    }
}

proptest! {
    #[test]
    fn tokens_cover_every_line(lines in prop::collection::vec("[a-z \"#()<>/]{0,24}", 1..8)) {
        let g = demo_grammar();
        let mut state = RuleStack::empty();
        for line in &lines {
            let out = run(&g, line, &state);
            assert_covers(line, &out.tokens);
            state = out.state;
        }
    }

    #[test]
    fn tokenizing_twice_is_idempotent(line in "[a-z \"#]{0,32}", open in any::<bool>()) {
        let g = demo_grammar();
        let state = if open {
            run(&g, "\"", &RuleStack::empty()).state
        } else {
            RuleStack::empty()
        };
        let mut tokenizer = LineTokenizer::new(g, &HighlightConfig::default());
        let a = tokenizer.tokenize_line(&line, &state).unwrap();
        let b = tokenizer.tokenize_line(&line, &state).unwrap();
        prop_assert_eq!(a, b);
    }
}
