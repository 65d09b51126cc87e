//! # Conch Test Fixture
//!
//! A command set exercising every binding and completion feature, plus helpers to parse and
//! complete against it.
#![allow(dead_code)]

use std::sync::Arc;

use conch::{
    Argument, ArgumentSupplier, ArgumentType, BoundArgument, BoundCommand, Command, CommandParser,
    CommandRegistry, CompletionEngine, FailKind, Information, InformationId, ParseContext,
    ParseFail, ParserConfig, RecordField, Requirement, Value,
};

pub fn language() -> ArgumentType {
    ArgumentType::enumeration("Language", ["EN", "PT", "ES"])
}

pub fn person() -> ArgumentType {
    ArgumentType::Record(vec![
        RecordField::required("age", ArgumentType::Int),
        RecordField::optional("languages", ArgumentType::list(language())),
    ])
}

#[derive(Debug)]
struct Shapes {
    kind: Arc<Argument>,
    rectangle: Arc<Argument>,
    circle: Arc<Argument>,
}

impl ArgumentSupplier for Shapes {
    fn all(&self) -> Vec<Arc<Argument>> {
        vec![self.kind.clone(), self.rectangle.clone(), self.circle.clone()]
    }

    fn remaining(&self, bound: &[BoundArgument]) -> Vec<Arc<Argument>> {
        match bound
            .iter()
            .find(|b| b.id == "kind")
            .and_then(|b| b.value.extract::<String>())
            .as_deref()
        {
            None => vec![self.kind.clone()],
            Some("TypeA") => vec![self.rectangle.clone()],
            Some(_) => vec![self.circle.clone()],
        }
    }
}

fn shapes() -> Shapes {
    Shapes {
        kind: Arc::new(Argument::new(
            "kind",
            ArgumentType::enumeration("Shape", ["TypeA", "TypeB"]),
        )),
        rectangle: Arc::new(Argument::new(
            "rectangle",
            ArgumentType::Record(vec![
                RecordField::required("width", ArgumentType::Int),
                RecordField::required("height", ArgumentType::Int),
            ]),
        )),
        circle: Arc::new(Argument::new(
            "circle",
            ArgumentType::Record(vec![RecordField::required("radius", ArgumentType::Int)]),
        )),
    }
}

pub fn admin_id() -> InformationId {
    InformationId::new("admin")
}

pub fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    let commands = vec![
        Command::new("rm")
            .argument(Argument::flag("recursive", 'r'))
            .argument(Argument::flag("force", 'f'))
            .argument(Argument::new("path", ArgumentType::String)),
        Command::new("mapcmd")
            .argument(Argument::new("n1", ArgumentType::Int))
            .argument(Argument::new(
                "values",
                ArgumentType::map(ArgumentType::enumeration("Key", ["A", "B"]), ArgumentType::Int),
            ))
            .argument(Argument::new("n2", ArgumentType::Int).optional()),
        Command::new("testE").argument(Argument::new(
            "value",
            ArgumentType::enumeration("Code", ["AAC", "AXD", "BBA", "BBD"]),
        )),
        Command::new("setmap").argument(Argument::new("person", person())),
        Command::new("create").dynamic_arguments(shapes()),
        Command::new("fetch")
            .argument(Argument::new("url", ArgumentType::String).alias("u"))
            .argument(
                Argument::new("retries", ArgumentType::Int)
                    .short('n')
                    .default_value(Value::Int(3)),
            ),
        Command::new("cp")
            .argument(Argument::flag("verbose", 'v'))
            .argument(Argument::new("files", ArgumentType::String).vararg()),
        Command::new("tag")
            .argument(Argument::new("count", ArgumentType::Int).optional())
            .argument(Argument::new("tags", ArgumentType::list(ArgumentType::String)).multiple()),
        Command::new("pick").argument(
            Argument::new("languages", language()).vararg().optional(),
        ),
        Command::new("ban")
            .argument(Argument::new("player", ArgumentType::String))
            .requires(Requirement::present(admin_id())),
        Command::new("echo").argument(Argument::new("text", ArgumentType::String)),
        Command::new("user"),
    ];
    for command in commands {
        registry.register(command).unwrap();
    }
    for action in ["add", "remove"] {
        registry
            .register(
                Command::new(action)
                    .parent("user")
                    .argument(Argument::new("name", ArgumentType::String)),
            )
            .unwrap();
    }
    registry
}

pub fn parser() -> CommandParser {
    CommandParser::new(Arc::new(registry()))
}

pub fn parser_with(config: ParserConfig) -> CommandParser {
    CommandParser::with_config(Arc::new(registry()), config)
}

pub fn ctx() -> ParseContext {
    ParseContext::new()
}

pub fn admin_ctx() -> ParseContext {
    ParseContext::new().with_information(Information::new(admin_id(), "root"))
}

pub fn parse(text: &str) -> Result<Vec<BoundCommand>, ParseFail> {
    parser().parse(text, &ctx())
}

pub fn parse_one(text: &str) -> BoundCommand {
    let mut commands = parse(text).unwrap_or_else(|fail| panic!("'{}' failed: {}", text, fail));
    assert_eq!(commands.len(), 1, "'{}' should hold one command", text);
    commands.remove(0)
}

pub fn fail(text: &str) -> FailKind {
    match parse(text) {
        Ok(commands) => panic!("'{}' should fail, bound {:?}", text, commands),
        Err(fail) => fail.kind,
    }
}

pub fn complete(text: &str) -> Vec<String> {
    CompletionEngine::new(parser()).complete_line(text, &ctx())
}
