//! Literal grammar through the public API.

use conch::syntax::{ExpectedTokens, Frame, LiteralFailKind, ScalarTrace};
use conch::{Input, InputParser, Span};

fn parse(text: &str) -> Input {
    InputParser::default()
        .parse_literal(text)
        .unwrap_or_else(|failure| panic!("'{}' failed: {:?}", text, failure))
}

#[test]
fn map_with_nested_list() {
    assert_eq!(
        parse("{a=1, b=[2,3]}"),
        Input::map(vec![
            (Input::single("a"), Input::single("1")),
            (
                Input::single("b"),
                Input::list(vec![Input::single("2"), Input::single("3")])
            ),
        ])
    );
}

#[test]
fn quoted_structure_is_inert() {
    assert_eq!(parse("\"a, b = {\""), Input::single("a, b = {"));
}

#[test]
fn unmatched_closer_reports_expected_set() {
    let failure = InputParser::default().parse_literal("{a=[1,2}").unwrap_err();
    assert_eq!(
        failure.kind,
        LiteralFailKind::TokenExpected(ExpectedTokens::chars(&[',', ']']))
    );
    assert_eq!(failure.position, 7);
    assert_eq!(
        failure.frames,
        vec![
            Frame::MapValue {
                index: 0,
                key: "a".into()
            },
            Frame::List { index: 1 },
        ]
    );
    assert_eq!(
        failure.last_scalar,
        Some(ScalarTrace {
            text: "2".into(),
            span: Span::new(6, 7),
            depth: 2,
            open_quote: false,
        })
    );
}

#[test]
fn spans_enclose_children() {
    let input = parse("{ key = [ x , y ] }");
    let Input::Map { entries, span } = &input else {
        panic!("expected a map, got {:?}", input);
    };
    assert_eq!(*span, Span::new(0, 19));
    let (key, value) = &entries[0];
    assert_eq!(key.span(), Span::new(2, 5));
    assert!(span.encloses(&value.span()));
    let Input::List { items, .. } = value else {
        panic!("expected a list");
    };
    assert!(items[0].span().end <= items[1].span().start);
}

#[test]
fn whitespace_inside_barewords_is_kept() {
    assert_eq!(
        parse("[ hello world , x ]"),
        Input::list(vec![Input::single("hello world"), Input::single("x")])
    );
}

#[test]
fn balanced_group_inside_bareword() {
    assert_eq!(
        parse("[f(x)[1,2], a\"b,c\"]"),
        Input::list(vec![Input::single("f(x)[1,2]"), Input::single("a\"b,c\"")])
    );
}

#[test]
fn unbalanced_group_inside_bareword_is_literal() {
    assert_eq!(parse("[a{b]"), Input::list(vec![Input::single("a{b")]));
}

#[test]
fn escapes() {
    assert_eq!(parse(r#""say \"hi\" \\ \n""#), Input::single(r#"say "hi" \ \n"#));
    assert_eq!(parse(r"[a\,b]"), Input::list(vec![Input::single("a,b")]));
}

#[test]
fn empty_containers() {
    assert_eq!(parse("[]"), Input::list(vec![]));
    assert_eq!(parse("{ }"), Input::map(vec![]));
    assert_eq!(parse("\"\""), Input::single(""));
}

#[test]
fn trailing_comma_needs_a_value() {
    let failure = InputParser::default().parse_literal("[1,]").unwrap_err();
    assert_eq!(
        failure.kind,
        LiteralFailKind::TokenExpected(ExpectedTokens::chars_or_value(&[]))
    );
    assert_eq!(failure.position, 3);
}

#[test]
fn unterminated_quote() {
    let failure = InputParser::default().parse_literal("[\"abc").unwrap_err();
    assert_eq!(failure.expected(), Some(&ExpectedTokens::chars(&['"'])));
    assert_eq!(failure.position, 5);
}

#[test]
fn deep_nesting_is_not_truncated() {
    let text = format!("{}x{}", "[".repeat(40), "]".repeat(40));
    let mut input = parse(&text);
    for _ in 0..40 {
        let Input::List { mut items, .. } = input else {
            panic!("nesting was truncated");
        };
        assert_eq!(items.len(), 1);
        input = items.remove(0);
    }
    assert_eq!(input, Input::single("x"));
}

#[test]
fn nesting_limit() {
    let failure = InputParser::new(3).parse_literal("[[[[1]]]]").unwrap_err();
    assert_eq!(failure.kind, LiteralFailKind::NestingLimitExceeded { limit: 3 });
    assert_eq!(failure.position, 3);
}

#[test]
fn rendered_trees_reparse() {
    let trees = vec![
        Input::map(vec![
            (Input::single("name"), Input::single("two words")),
            (
                Input::single("tags"),
                Input::list(vec![
                    Input::single("a,b"),
                    Input::single("{x}"),
                    Input::single("say \"hi\""),
                ]),
            ),
            (Input::single("k=v"), Input::map(vec![])),
        ]),
        Input::list(vec![Input::list(vec![]), Input::single("-1"), Input::single("")]),
        Input::single("back\\slash"),
    ];
    for tree in trees {
        let text = tree.render();
        assert_eq!(parse(&text), tree, "rendered as {}", text);
    }
}

#[test]
fn empty_input_renders_as_an_empty_scalar() {
    let tree = Input::list(vec![Input::empty(Span::point(1))]);
    assert_eq!(tree.render(), "[\"\"]");
    // No literal reads back as `Empty`.
    assert_eq!(parse(&tree.render()), Input::list(vec![Input::single("")]));
    assert_ne!(parse(&tree.render()), tree);
}
