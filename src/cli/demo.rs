//! The built-in command set served by the `conch` binary.

use std::sync::Arc;

use crate::binder::{BoundArgument, BoundCommand};
use crate::command::{
    Argument, ArgumentSupplier, Command, CommandRegistry, Information, InformationId, ParseContext,
    Requirement,
};
use crate::diagnostics::{HandlerError, RegistrationError};
use crate::types::{ArgumentType, RecordField, Value};

type HandlerResult = Result<Value, HandlerError>;

pub fn operator_id() -> InformationId {
    InformationId::new("operator")
}

/// Context the demo commands run in. `operator` satisfies the requirement of `kick`.
pub fn context(operator: bool) -> ParseContext {
    ParseContext::new().with_information(
        Information::new(operator_id(), operator).with_description("caller is an operator"),
    )
}

pub fn registry() -> Result<CommandRegistry, RegistrationError> {
    let mut registry = CommandRegistry::new();

    registry.register(
        Command::new("say")
            .description("Print the given words")
            .argument(Argument::new("words", ArgumentType::String).vararg())
            .handler(|command: &BoundCommand, _: &ParseContext| -> HandlerResult {
                let words: Vec<String> = command
                    .get("words")
                    .ok_or_else(|| HandlerError::bad_argument(&command.name, "words"))?;
                Ok(Value::String(words.join(" ")))
            }),
    )?;

    registry.register(
        Command::new("sum")
            .description("Add integers")
            .argument(Argument::new("numbers", ArgumentType::Int).vararg())
            .handler(|command: &BoundCommand, _: &ParseContext| -> HandlerResult {
                let numbers: Vec<i64> = command
                    .get("numbers")
                    .ok_or_else(|| HandlerError::bad_argument(&command.name, "numbers"))?;
                Ok(Value::Int(numbers.iter().sum()))
            }),
    )?;

    registry.register(
        Command::new("rm")
            .description("Remove a path")
            .argument(Argument::flag("recursive", 'r'))
            .argument(Argument::flag("force", 'f'))
            .argument(Argument::new("path", ArgumentType::String)),
    )?;

    registry.register(
        Command::new("fetch")
            .description("Fetch a URL")
            .argument(Argument::new("url", ArgumentType::String))
            .argument(
                Argument::new("retries", ArgumentType::Int)
                    .short('n')
                    .default_value(Value::Int(3)),
            ),
    )?;

    registry.register(
        Command::new("mapcmd")
            .description("Store weights for keys")
            .argument(Argument::new("n1", ArgumentType::Int))
            .argument(Argument::new(
                "values",
                ArgumentType::map(ArgumentType::enumeration("Key", ["A", "B"]), ArgumentType::Int),
            ))
            .argument(Argument::new("n2", ArgumentType::Int).optional()),
    )?;

    registry.register(
        Command::new("testE")
            .description("Pick one code")
            .argument(Argument::new(
                "value",
                ArgumentType::enumeration("Code", ["AAC", "AXD", "BBA", "BBD"]),
            )),
    )?;

    registry.register(
        Command::new("setmap")
            .description("Set a person record")
            .argument(Argument::new("person", person_type())),
    )?;

    registry.register(
        Command::new("create")
            .description("Create a shape; its size depends on the kind")
            .dynamic_arguments(ShapeArguments::new()),
    )?;

    registry.register(Command::new("user").description("Manage users"))?;
    for action in ["add", "remove"] {
        registry.register(
            Command::new(action)
                .parent("user")
                .argument(Argument::new("name", ArgumentType::String)),
        )?;
    }

    registry.register(
        Command::new("kick")
            .description("Disconnect a player")
            .argument(Argument::new("player", ArgumentType::String))
            .requires(Requirement::new(operator_id(), "caller must be an operator", |info| {
                info.get::<bool>().copied().unwrap_or(false)
            })),
    )?;

    Ok(registry)
}

pub fn person_type() -> ArgumentType {
    ArgumentType::Record(vec![
        RecordField::required("age", ArgumentType::Int),
        RecordField::optional(
            "languages",
            ArgumentType::list(ArgumentType::enumeration("Language", ["EN", "PT", "ES"])),
        ),
    ])
}

/// `create <kind> <size>`: the size literal's shape depends on the kind.
#[derive(Debug)]
struct ShapeArguments {
    kind: Arc<Argument>,
    rectangle: Arc<Argument>,
    circle: Arc<Argument>,
}

impl ShapeArguments {
    fn new() -> Self {
        Self {
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
}

impl ArgumentSupplier for ShapeArguments {
    fn all(&self) -> Vec<Arc<Argument>> {
        vec![self.kind.clone(), self.rectangle.clone(), self.circle.clone()]
    }

    fn remaining(&self, bound: &[BoundArgument]) -> Vec<Arc<Argument>> {
        let kind = bound
            .iter()
            .find(|b| b.id == "kind")
            .and_then(|b| b.value.extract::<String>());
        match kind.as_deref() {
            None => vec![self.kind.clone()],
            Some("TypeA") => vec![self.rectangle.clone()],
            Some(_) => vec![self.circle.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_registry_is_valid() {
        let registry = registry().unwrap();
        assert!(registry.find("user add").is_some());
        assert!(registry.find("create").is_some());
    }

    #[derive(Debug)]
    struct ForgetArguments;

    impl crate::dispatch::Interceptor for ForgetArguments {
        fn pre(&self, _: &BoundCommand, mut current: BoundCommand) -> Option<BoundCommand> {
            current.arguments.clear();
            Some(current)
        }
    }

    #[test]
    fn test_handler_reports_missing_value() {
        let parser = crate::engine::CommandParser::new(Arc::new(registry().unwrap()));
        let dispatcher = crate::dispatch::Dispatcher::new(parser).with_interceptor(ForgetArguments);
        let err = dispatcher.dispatch("say hi", &context(false)).unwrap_err();
        assert!(matches!(
            err,
            crate::dispatch::DispatchError::Handler(HandlerError::BadArgument { argument, .. })
                if argument == "words"
        ));
    }
}
