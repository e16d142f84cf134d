//! Tests for hole extraction.

use super::*;

const SCENARIO: &str = r#"fact(a). langda(LLM:"explain a"). query(fact(_))."#;

#[test]
fn hole_free_source_round_trips() {
    let sources = [
        "",
        "a.",
        "% only a comment",
        "p(X) :- q(X), \\+ r(X).\n\n/* multi\n line */\nq(1).\nr(2). % trailing\n",
        "0.4::heads(C); 0.6::tails(C) :- coin(C).\nquery(heads(_)).",
        "say(\"a % not a comment\").\nx :- y =.. [f, a].",
        "unterminated \"string",
    ];
    for src in sources {
        let parsed = parse(src).unwrap();
        assert!(parsed.holes.is_empty());
        assert_eq!(parsed.template.hole_count(), 0);
        assert_eq!(parsed.template.render("{{LANGDA}}"), src, "round trip of {src:?}");
    }
}

#[test]
fn scenario_source_yields_one_hole() {
    let parsed = parse(SCENARIO).unwrap();
    assert_eq!(parsed.holes.len(), 1);
    assert_eq!(parsed.template.hole_count(), 1);
    assert_eq!(
        parsed.template.render("{P}"),
        "fact(a).\n{P}\n.\nquery(fact(_))."
    );
    assert!(parsed.has_executable_query);

    let hole = &parsed.holes[0];
    assert_eq!(hole.requirement, "explain a");
    assert_eq!(hole.head, "");
    assert_eq!(hole.regen, RegenPolicy::MustRegenerate);
    assert_eq!(hole.line, 1);
    assert_eq!(hole.hash, hole_hash("", None, None, "explain a"));
}

#[test]
fn hole_fields_are_parsed() {
    let src = r#"
score(X, S) :-
    item(X),
    langda(LLM:"compute the score S of X", LOT:"search_tool", NET:"scorer", FUP:"false").
"#;
    let parsed = parse(src).unwrap();
    let hole = &parsed.holes[0];
    assert_eq!(hole.head, "score(X, S)");
    assert_eq!(hole.tool.as_deref(), Some("search_tool"));
    assert_eq!(hole.network.as_deref(), Some("scorer"));
    assert_eq!(hole.regen, RegenPolicy::ReuseAllowed);
    assert_eq!(hole.line, 4);
    assert!(parsed.hole(&hole.hash).is_some());
}

#[test]
fn hash_survives_whitespace_edits_elsewhere() {
    let a = parse("p(X) :- langda(LLM:\"x\").\nq.").unwrap();
    let b = parse("\n\n% new comment\nr.\np( X )  :-\n   langda(LLM:\"x\").\n\n  q.").unwrap();
    let c = parse("r.\n\np(X)   :-   langda(LLM:\"x\").").unwrap();
    assert_eq!(a.holes[0].hash, c.holes[0].hash);
    assert_ne!(a.holes[0].hash, b.holes[0].hash);
}

#[test]
fn holes_keep_source_order() {
    let src = r#"a :- langda(LLM:"first"). b :- langda(LLM:"second"). c :- langda(LLM:"third")."#;
    let parsed = parse(src).unwrap();
    let reqs: Vec<_> = parsed.holes.iter().map(|h| h.requirement.as_str()).collect();
    assert_eq!(reqs, vec!["first", "second", "third"]);
    assert_eq!(parsed.template.hole_count(), 3);
}

#[test]
fn adjacent_holes_produce_adjacent_placeholders() {
    let parsed = parse(r#"langda(LLM:"a")langda(LLM:"b")"#).unwrap();
    assert_eq!(parsed.holes.len(), 2);
    assert_eq!(parsed.template.render("{P}"), "{P}\n{P}");
}

#[test]
fn comments_inside_marker_move_before_placeholder() {
    let src = "a :- langda(LLM:\"x\", % inner\n FUP:\"true\") % after\n, b.";
    let parsed = parse(src).unwrap();
    assert_eq!(parsed.holes[0].comments, vec!["% inner", "% after"]);
    assert_eq!(
        parsed.template.render("{P}"),
        "a :-\n% inner\n% after\n{P}\n, b."
    );
}

#[test]
fn comment_after_terminator_stays_in_fixed_text() {
    let src = "a :- langda(LLM:\"x\"). % note\nb.";
    let parsed = parse(src).unwrap();
    assert!(parsed.holes[0].comments.is_empty());
    assert_eq!(parsed.template.render("{P}"), "a :-\n{P}\n.\n% note\nb.");
}

#[test]
fn network_marker_is_rendered_inline() {
    let src = "lann(mnist_net, [X], Y, [0,1,2]) :: digit(X, Y).\nquery(digit(img, Y)).";
    let parsed = parse(src).unwrap();
    assert!(parsed.holes.is_empty());
    assert_eq!(parsed.networks.len(), 1);
    assert_eq!(parsed.networks[0].keys, vec!["mnist_net", "[X]", "Y", "[0,1,2]"]);
    assert_eq!(
        parsed.template.render("{P}"),
        "nn(mnist_net,[X],Y,[0,1,2]) :: digit(X, Y).\nquery(digit(img, Y))."
    );
}

#[test]
fn unknown_keys_are_ignored() {
    let parsed = parse(r#"langda(LLM:"x", COLOR:"blue")."#).unwrap();
    assert_eq!(parsed.holes[0].requirement, "x");
}

#[test]
fn invalid_regen_policy_is_rejected() {
    let err = parse("\nlangda(LLM:\"x\", FUP:\"perhaps\").").unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidRegenPolicy {
            value: "perhaps".to_string(),
            line: 2
        }
    );
}

#[test]
fn empty_marker_is_rejected() {
    assert_eq!(parse("a.\nlangda( )."), Err(ParseError::EmptyMarker { line: 2 }));
}

#[test]
fn empty_term_is_rejected() {
    assert_eq!(
        parse(r#"langda(LLM:"x",,FUP:"true")."#),
        Err(ParseError::EmptyTerm { line: 1 })
    );
}

#[test]
fn unterminated_marker_is_rejected() {
    let err = parse("a.\nb :- langda(LLM:\"x\".\n").unwrap_err();
    assert_eq!(err, ParseError::UnterminatedMarker { line: 2, column: 6 });
}

#[test]
fn mismatched_closer_inside_marker_is_rejected() {
    let err = parse("a. langda(LLM:\"x\"]). b.").unwrap_err();
    assert_eq!(
        err,
        ParseError::MismatchedBracket {
            found: ']',
            line: 1,
            column: 18
        }
    );
    let err = crate::error::HolefillError::from(err);
    assert_eq!(err.exit_code(), crate::exit_codes::MALFORMED_SOURCE);
}

#[test]
fn mismatched_closer_inside_network_marker_is_rejected() {
    let err = parse("lann(net, [a, b)).").unwrap_err();
    assert!(matches!(
        err,
        ParseError::MismatchedBracket { found: ')', line: 1, .. }
    ));
}

#[test]
fn brackets_outside_markers_are_not_checked() {
    let src = "x :- y =.. [f, a).\nb.";
    let parsed = parse(src).unwrap();
    assert_eq!(parsed.template.render("{P}"), src);
}

#[test]
fn source_without_query_is_not_executable() {
    let parsed = parse(r#"a. langda(LLM:"x")."#).unwrap();
    assert!(!parsed.has_executable_query);
}

#[test]
fn scan_units_exposes_statuses() {
    let units = scan_units(SCENARIO).unwrap();
    let statuses: Vec<_> = units.iter().map(|u| u.status).collect();
    assert_eq!(
        statuses,
        vec![
            UnitStatus::None,
            UnitStatus::None,
            UnitStatus::End,
            UnitStatus::None,
            UnitStatus::None
        ]
    );
}
