//! Argument binding and command-line parsing.

mod common;

use std::sync::Arc;
use std::thread;

use common::{admin_ctx, complete, ctx, fail, parse, parse_one, parser, parser_with};
use conch::locale::command_key;
use conch::types::PathSegment;
use conch::{
    BindOrigin, CompletionEngine, FailKind, Input, ParseContext, ParserConfig, ShortFlagPolicy, Span,
    TableLocalizer, Value,
};

#[test]
fn bundled_short_flags() {
    let rm = parse_one("rm -rf hello");
    assert_eq!(rm.name, "rm");
    assert_eq!(rm.get::<bool>("recursive"), Some(true));
    assert_eq!(rm.get::<bool>("force"), Some(true));
    assert_eq!(rm.get::<String>("path").as_deref(), Some("hello"));
    assert_eq!(rm.argument("force").map(|a| a.origin), Some(BindOrigin::Flag));
}

#[test]
fn unset_flags_take_their_default() {
    let rm = parse_one("rm -r hello");
    assert_eq!(rm.get::<bool>("force"), Some(false));
    assert_eq!(rm.argument("force").map(|a| a.origin), Some(BindOrigin::Default));
}

#[test]
fn switch_with_explicit_value() {
    let rm = parse_one("rm --force false x");
    assert_eq!(rm.get::<bool>("force"), Some(false));
    assert_eq!(rm.get::<String>("path").as_deref(), Some("x"));

    let rm = parse_one("rm --force x");
    assert_eq!(rm.get::<bool>("force"), Some(true));
}

#[test]
fn unknown_short_letters_are_a_value() {
    let rm = parse_one("rm -4");
    assert_eq!(rm.get::<String>("path").as_deref(), Some("-4"));
    assert_eq!(rm.get::<bool>("recursive"), Some(false));
}

#[test]
fn missing_required_argument() {
    assert_eq!(
        fail("rm -rf"),
        FailKind::MissingRequiredArgument {
            command: "rm".into(),
            argument: "path".into()
        }
    );
    assert!(matches!(
        fail("mapcmd 1"),
        FailKind::MissingRequiredArgument { argument, .. } if argument == "values"
    ));
}

#[test]
fn named_arguments_and_assignment() {
    let fetch = parse_one("fetch --url=http://localhost");
    assert_eq!(fetch.get::<String>("url").as_deref(), Some("http://localhost"));
    assert_eq!(fetch.get::<i64>("retries"), Some(3));

    let fetch = parse_one("fetch -n 5 --u example.org");
    assert_eq!(fetch.get::<i64>("retries"), Some(5));
    assert_eq!(fetch.get::<String>("url").as_deref(), Some("example.org"));
}

#[test]
fn empty_assignment_has_no_input() {
    assert_eq!(
        fail("fetch --url="),
        FailKind::NoInputForArgument {
            command: "fetch".into(),
            argument: "url".into()
        }
    );
    assert!(matches!(
        fail("fetch --url"),
        FailKind::NoInputForArgument { .. }
    ));
}

#[test]
fn boolean_only_policy_reads_value_flags_as_values() {
    let strict = parser_with(ParserConfig {
        short_flags: ShortFlagPolicy::BooleanOnly,
        ..ParserConfig::default()
    });
    let commands = strict.parse("fetch -n 5", &ctx()).unwrap();
    assert_eq!(commands[0].get::<String>("url").as_deref(), Some("-n"));
    assert_eq!(commands[0].get::<i64>("retries"), Some(5));
    assert_eq!(
        commands[0].argument("retries").map(|a| a.origin),
        Some(BindOrigin::Positional)
    );
}

#[test]
fn unknown_argument() {
    assert_eq!(
        fail("rm --nope x"),
        FailKind::UnknownArgument {
            command: "rm".into(),
            name: "nope".into()
        }
    );
    // Already bound arguments cannot be named again.
    assert!(matches!(fail("echo --text a --text b"), FailKind::UnknownArgument { .. }));
}

#[test]
fn map_argument_converts_keys_and_values() {
    let command = parse_one("mapcmd 1 {A=1, B=2} 7");
    assert_eq!(command.get::<i64>("n1"), Some(1));
    assert_eq!(command.get::<i64>("n2"), Some(7));
    let values = command.value("values").unwrap();
    assert_eq!(values.get("A"), Some(&Value::Int(1)));
    assert_eq!(values.get("B"), Some(&Value::Int(2)));
}

#[test]
fn invalid_element_carries_its_path() {
    let err = parse("mapcmd 1 {A=1, B=x}").unwrap_err();
    assert_eq!(err.span(), Span::new(17, 18));
    match err.kind {
        FailKind::InvalidInputForType {
            argument,
            argument_type,
            input,
            path,
            ..
        } => {
            assert_eq!(argument, "values");
            assert_eq!(argument_type, "int");
            assert_eq!(input, "x");
            assert_eq!(path, vec![PathSegment::Key("B".into())]);
        }
        other => panic!("unexpected failure {:?}", other),
    }
}

#[test]
fn structural_kind_is_checked() {
    assert!(matches!(
        fail("echo [1,2]"),
        FailKind::InvalidInputForType { argument, .. } if argument == "text"
    ));
    assert!(matches!(
        fail("setmap 5"),
        FailKind::InvalidInputForType { argument, .. } if argument == "person"
    ));
}

#[test]
fn record_argument() {
    let command = parse_one("setmap {age=18, languages=[EN, PT]}");
    let person = command.value("person").unwrap();
    assert_eq!(person.get("age"), Some(&Value::Int(18)));
    assert_eq!(
        person.get("languages"),
        Some(&Value::List(vec![Value::Enum("EN".into()), Value::Enum("PT".into())]))
    );
    assert!(matches!(
        fail("setmap {languages=[EN]}"),
        FailKind::InvalidInputForType { path, .. } if path == vec![PathSegment::Key("age".into())]
    ));
}

#[test]
fn vararg_run_stops_at_flag_bundle() {
    let cp = parse_one("cp a b -v");
    assert_eq!(cp.get::<bool>("verbose"), Some(true));
    assert_eq!(cp.get::<Vec<String>>("files"), Some(vec!["a".into(), "b".into()]));
}

#[test]
fn vararg_run_stops_at_named_argument() {
    let commands = parse("cp a b --verbose").unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(
        commands[0].get::<Vec<String>>("files"),
        Some(vec!["a".to_owned(), "b".to_owned()])
    );
    assert_eq!(commands[0].get::<bool>("verbose"), Some(true));
}

#[test]
fn vararg_run_continues_after_flags() {
    for line in ["cp a -v b", "cp a --verbose b", "cp -v a b", "cp a --verbose=true b"] {
        let cp = parse_one(line);
        assert_eq!(cp.get::<bool>("verbose"), Some(true), "{}", line);
        assert_eq!(cp.get::<Vec<String>>("files"), Some(vec!["a".into(), "b".into()]), "{}", line);
    }

    let cp = parse_one("cp a b -v c d");
    assert_eq!(
        cp.get::<Vec<String>>("files"),
        Some(vec!["a".into(), "b".into(), "c".into(), "d".into()])
    );
    assert_eq!(cp.input("files").map(Input::span), Some(Span::new(3, 13)));

    // A separator still ends the run.
    let commands = parse("cp a -v & echo b").unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].get::<Vec<String>>("files"), Some(vec!["a".into()]));
}

#[test]
fn multiple_takes_literal_or_run() {
    let tag = parse_one("tag [x, y]");
    assert_eq!(tag.get::<Vec<String>>("tags"), Some(vec!["x".into(), "y".into()]));
    assert_eq!(tag.get::<i64>("count"), None);

    let tag = parse_one("tag 2 x y z");
    assert_eq!(tag.get::<i64>("count"), Some(2));
    assert_eq!(
        tag.get::<Vec<String>>("tags"),
        Some(vec!["x".into(), "y".into(), "z".into()])
    );
    assert_eq!(tag.input("tags").map(Input::kind), Some(conch::InputKind::List));
}

#[test]
fn optional_vararg_defaults_to_empty() {
    let pick = parse_one("pick");
    assert_eq!(pick.value("languages"), Some(&Value::List(vec![])));
    assert!(pick.input("languages").is_some_and(Input::is_empty));

    let pick = parse_one("pick EN ES");
    assert_eq!(
        pick.get::<Vec<String>>("languages"),
        Some(vec!["EN".into(), "ES".into()])
    );
    assert!(matches!(
        fail("pick EN FR"),
        FailKind::InvalidInputForType { path, .. } if path == vec![PathSegment::Index(1)]
    ));
}

#[test]
fn optional_argument_is_skipped_when_it_rejects_a_value() {
    // `count` is an optional int, so `x` goes to `tags`.
    let tag = parse_one("tag x y");
    assert_eq!(tag.get::<i64>("count"), None);
    assert_eq!(tag.get::<Vec<String>>("tags"), Some(vec!["x".into(), "y".into()]));
}

#[test]
fn dynamic_arguments_follow_bound_values() {
    let create = parse_one("create TypeA {width=2, height=3}");
    assert!(create.is_bound("rectangle"));
    assert!(!create.is_bound("circle"));

    let create = parse_one("create TypeB {radius=4}");
    assert_eq!(create.value("circle").and_then(|c| c.get("radius")), Some(&Value::Int(4)));

    assert!(matches!(
        fail("create TypeB {width=2, height=3}"),
        FailKind::InvalidInputForType { argument, .. } if argument == "circle"
    ));
}

#[test]
fn sub_commands_resolve_greedily() {
    let add = parse_one("user add remove");
    assert_eq!(add.name, "user add");
    assert_eq!(add.get::<String>("name").as_deref(), Some("remove"));
}

#[test]
fn command_not_found() {
    let err = parse("nope 1").unwrap_err();
    assert_eq!(err.kind, FailKind::CommandNotFound { token: "nope".into() });
    assert_eq!(err.span(), Span::new(0, 4));
    assert_eq!(err.error_code(), "conch::parse::command_not_found");
}

#[test]
fn chained_commands() {
    let commands = parse("echo a & rm -f b echo c").unwrap();
    let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "rm", "echo"]);
    assert_eq!(commands[2].get::<String>("text").as_deref(), Some("c"));
}

#[test]
fn quoted_word_never_names_a_command() {
    assert!(matches!(fail("\"echo\" x"), FailKind::CommandNotFound { .. }));
}

#[test]
fn requirements() {
    assert!(matches!(
        fail("ban bob"),
        FailKind::RequirementNotSatisfied { command, .. } if command == "ban"
    ));
    let commands = parser().parse("ban bob", &admin_ctx()).unwrap();
    assert_eq!(commands[0].get::<String>("player").as_deref(), Some("bob"));
}

#[test]
fn literal_failure_inside_a_line() {
    let err = parse("mapcmd 1 {A=[1,2}").unwrap_err();
    assert!(matches!(
        &err.kind,
        FailKind::TokenExpected { expected, position: 16 } if expected.chars == vec![',', ']']
    ));
}

#[test]
fn token_list_parsing() {
    let commands = parser()
        .parse_tokens(&["echo", "two words"], &ctx())
        .unwrap();
    assert_eq!(commands[0].get::<String>("text").as_deref(), Some("two words"));

    let commands = parser()
        .parse_tokens(&["setmap", "{age=3}"], &ctx())
        .unwrap();
    assert!(commands[0].value("person").is_some());
}

#[test]
fn localized_name_shared_by_two_commands_is_ambiguous() {
    let locale = TableLocalizer::new()
        .with_names(command_key("rm"), ["del"])
        .with_names(command_key("echo"), ["del"])
        .with_names(command_key("user add"), ["new"])
        .with_names(command_key("user remove"), ["new"]);
    let ctx = ParseContext::new().with_localizer(Arc::new(locale));

    let err = parser().parse("del x", &ctx).unwrap_err();
    assert_eq!(err.error_code(), "conch::parse::ambiguous_command");
    match err.kind {
        FailKind::AmbiguousCommand { token, candidates } => {
            assert_eq!(token, "del");
            assert_eq!(candidates.len(), 2);
            assert!(candidates.contains(&"rm".to_owned()));
            assert!(candidates.contains(&"echo".to_owned()));
        }
        other => panic!("expected an ambiguous command, got {:?}", other),
    }

    assert!(matches!(
        parser().parse("user new bob", &ctx).unwrap_err().kind,
        FailKind::AmbiguousCommand { token, .. } if token == "new"
    ));
    // Without the table both names are unknown.
    assert_eq!(fail("del x"), FailKind::CommandNotFound { token: "del".into() });
}

#[test]
fn parser_and_completion_are_shared_across_threads() {
    let parser = parser();
    let engine = CompletionEngine::new(common::parser());
    let ctx = ctx();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let (parser, engine, ctx) = (&parser, &engine, &ctx);
                scope.spawn(move || {
                    for _ in 0..50 {
                        let line = format!("rm -rf dir{} & cp a -v b{}", i, i);
                        let commands = parser.parse(&line, ctx).unwrap();
                        assert_eq!(commands.len(), 2);
                        assert_eq!(commands[0].get::<String>("path"), Some(format!("dir{}", i)));
                        assert_eq!(
                            engine.complete_line("testE --value AX", ctx),
                            vec!["AXD".to_owned()]
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });

    assert_eq!(complete("testE --value AX"), vec!["AXD".to_owned()]);
}
