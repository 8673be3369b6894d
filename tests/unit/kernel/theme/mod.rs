use super::*;

fn scopes(path: &[&str]) -> Vec<Scope> {
    path.iter().map(|s| Scope::from(*s)).collect()
}

fn fg(hex: u32) -> StyleSpec {
    StyleSpec::foreground(Rgb::from_hex(hex))
}

#[test]
fn more_specific_selector_wins_regardless_of_order() {
    let path = scopes(&["source", "string", "string.quoted"]);

    let specific_last = [
        ThemeRule::new("string", fg(0x111111)),
        ThemeRule::new("string.quoted", fg(0x222222)),
    ];
    assert_eq!(
        resolve(&specific_last, &path).foreground,
        Rgb::from_hex(0x222222)
    );

    let specific_first = [
        ThemeRule::new("string.quoted", fg(0x222222)),
        ThemeRule::new("string", fg(0x111111)),
    ];
    assert_eq!(
        resolve(&specific_first, &path).foreground,
        Rgb::from_hex(0x222222)
    );
}

#[test]
fn equal_specificity_follows_tie_break() {
    let path = scopes(&["source", "string.quoted"]);
    let rules = vec![
        ThemeRule::new("string", fg(0x111111)),
        ThemeRule::new("string", fg(0x333333)),
    ];

    let last = Theme::new(rules.clone(), Style::default());
    assert_eq!(last.tie_break(), TieBreak::LastWins);
    assert_eq!(last.resolve(&path).foreground, Rgb::from_hex(0x333333));

    let first = Theme::new(rules, Style::default()).with_tie_break(TieBreak::FirstWins);
    assert_eq!(first.resolve(&path).foreground, Rgb::from_hex(0x111111));
}

#[test]
fn innermost_scope_beats_longer_outer_selector() {
    let path = scopes(&["text.bbcode", "meta.tag.opening.bbcode", "entity.name.tag.bbcode"]);
    let rules = [
        ThemeRule::new("meta.tag.opening.bbcode", fg(0x111111)),
        ThemeRule::new("entity", fg(0x222222)),
    ];
    assert_eq!(resolve(&rules, &path).foreground, Rgb::from_hex(0x222222));
}

#[test]
fn falls_back_to_outer_scopes_then_defaults() {
    let rules = [ThemeRule::new("markup.bold", fg(0x111111))];

    let inside_bold = scopes(&["text.bbcode", "markup.bold.bbcode", "punctuation.definition"]);
    assert_eq!(
        resolve(&rules, &inside_bold).foreground,
        Rgb::from_hex(0x111111)
    );

    let plain = scopes(&["text.bbcode"]);
    assert_eq!(resolve(&rules, &plain), Style::default());
    assert_eq!(resolve(&[], &[]), Style::default());
}

#[test]
fn selector_matches_on_dot_boundaries_only() {
    let rules = [ThemeRule::new("string.quoted", fg(0x111111))];
    assert_eq!(
        resolve(&rules, &scopes(&["string.quotedx"])),
        Style::default()
    );
    assert_eq!(
        resolve(&rules, &scopes(&["string.quoted.double.json"])).foreground,
        Rgb::from_hex(0x111111)
    );
}

#[test]
fn parent_selectors_require_ancestors_in_order() {
    let rules = [
        ThemeRule::new("entity.name.tag", fg(0x111111)),
        ThemeRule::new("meta.embedded entity.name.tag", fg(0x222222)),
    ];

    let embedded = scopes(&["text.bbcode", "meta.embedded.block", "entity.name.tag.bbcode"]);
    assert_eq!(
        resolve(&rules, &embedded).foreground,
        Rgb::from_hex(0x222222)
    );

    let plain = scopes(&["text.bbcode", "meta.tag", "entity.name.tag.bbcode"]);
    assert_eq!(resolve(&rules, &plain).foreground, Rgb::from_hex(0x111111));

    // The parent must sit outside the matched scope.
    let reversed = scopes(&["entity.name.tag", "meta.embedded"]);
    assert_eq!(resolve(&rules, &reversed).foreground, Rgb::from_hex(0x111111));
}

#[test]
fn comma_lists_expand_to_separate_selectors() {
    let rules = [ThemeRule::new("string, constant.numeric", fg(0x111111))];
    assert_eq!(
        resolve(&rules, &scopes(&["constant.numeric.int"])).foreground,
        Rgb::from_hex(0x111111)
    );
    assert_eq!(
        resolve(&rules, &scopes(&["string"])).foreground,
        Rgb::from_hex(0x111111)
    );
}

#[test]
fn empty_selector_sets_defaults() {
    let theme = Theme::new(
        vec![
            ThemeRule::new(
                "",
                StyleSpec {
                    foreground: Some(Rgb::from_hex(0xEEEEEE)),
                    background: Some(Rgb::from_hex(0x000000)),
                    font_style: None,
                },
            ),
            ThemeRule::new(
                "markup.bold",
                StyleSpec {
                    font_style: Some(FontStyle::BOLD),
                    ..StyleSpec::default()
                },
            ),
        ],
        Style::default(),
    );

    assert_eq!(theme.rule_count(), 1);
    assert_eq!(theme.defaults().foreground, Rgb::from_hex(0xEEEEEE));

    let bold = theme.resolve(&scopes(&["markup.bold"]));
    assert_eq!(bold.foreground, Rgb::from_hex(0xEEEEEE));
    assert_eq!(bold.background, Rgb::from_hex(0x000000));
    assert!(bold.font_style.contains(FontStyle::BOLD));
}

#[test]
fn merged_lists_keep_declaration_order() {
    let path = scopes(&["comment"]);
    let base = vec![ThemeRule::new("comment", fg(0x111111))];
    let user = vec![ThemeRule::new("comment", fg(0x222222))];

    let theme = Theme::merged([base.clone(), user.clone()], Style::default());
    assert_eq!(theme.resolve(&path).foreground, Rgb::from_hex(0x222222));

    let theme = Theme::merged([base, user], Style::default()).with_tie_break(TieBreak::FirstWins);
    assert_eq!(theme.resolve(&path).foreground, Rgb::from_hex(0x111111));
}

#[test]
fn colors_and_font_styles_parse() {
    assert_eq!(parse_color("#fff"), Some(Rgb::new(0xFF, 0xFF, 0xFF)));
    assert_eq!(parse_color("#569CD6"), Some(Rgb::from_hex(0x569CD6)));
    assert_eq!(parse_color("#569CD680"), Some(Rgb::from_hex(0x569CD6)));
    assert_eq!(parse_color("569CD6"), None);
    assert_eq!(parse_color("#12345"), None);
    assert_eq!(Rgb::from_hex(0x569CD6).to_string(), "#569CD6");

    let style = FontStyle::parse("italic bold");
    assert!(style.contains(FontStyle::ITALIC));
    assert!(style.contains(FontStyle::BOLD));
    assert!(!style.contains(FontStyle::UNDERLINE));
    assert!(FontStyle::parse("").is_empty());
}
