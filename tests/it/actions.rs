use argdeco::{Cli, Command, CustomAction, Param, Value};
use expect_test::expect;

use crate::check;

#[test]
fn count() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("cmd", |args| Ok(args["v"].clone()))
            .param(Param::new("v").annotation("Flag | CountAction").default(0)),
    )
    .unwrap();

    check(&cli, "cmd -vvv", expect!["3"]);
    check(&cli, "cmd -v -vv", expect!["3"]);
    check(&cli, "cmd", expect!["0"]);
}

#[test]
fn store_const() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("cmd1", |args| Ok(args["foo"].clone()))
            .param(Param::new("foo").annotation("Option | StoreConstAction").default(42)),
    )
    .unwrap()
    .command(
        Command::function("cmd2", |args| Ok(args["foo"].clone()))
            .param(Param::new("foo").annotation("Option").default(42)),
    )
    .unwrap();

    check(&cli, "cmd1 --foo", expect!["42"]);
    check(&cli, "cmd1", expect!["None"]);
    check(&cli, "cmd1 --foo 100", expect!["error: Unexpected argument: `100`"]);
    check(&cli, "cmd2 --foo", expect!["error: Expected a value for `--foo`"]);
    check(&cli, "cmd2", expect!["42"]);
    check(&cli, "cmd2 --foo 100", expect![[r#""100""#]]);
    check(&cli, "cmd2 --foo=100", expect![[r#""100""#]]);
}

#[test]
fn append_and_extend() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("cmd", |args| Ok(vec![args["tag"].clone(), args["num"].clone()]))
            .param(Param::new("tag").annotation("Option | AppendAction"))
            .param(Param::new("num").annotation("Option | ExtendAction | OneOrMore[int]")),
    )
    .unwrap();

    check(&cli, "cmd --tag a --num 1 2 --tag b --num 3", expect![[r#"[["a", "b"], [1, 2, 3]]"#]]);
    check(&cli, "cmd", expect!["[None, None]"]);
}

#[test]
fn exactly() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("move", |args| Ok(args["to"].clone()))
            .param(Param::new("to").annotation("Option | Exactly2[int]")),
    )
    .unwrap();

    check(&cli, "move --to 3 4", expect!["[3, 4]"]);
    check(&cli, "move --to 3", expect!["error: Expected a value for `--to`"]);
    check(&cli, "move --to=3", expect!["error: Expected 2 values for `--to`, got 1"]);
}

#[test]
fn custom_action() {
    let mut cli: Cli = Cli::new();
    cli.scope_mut().add_action(CustomAction::new("upper_once", |current, value| {
        if !current.is_none() {
            return Err("given twice".to_string());
        }
        Ok(Value::Str(value.as_str().unwrap_or_default().to_uppercase()))
    }));
    cli.command(
        Command::function("shout", |args| Ok(args["word"].clone()))
            .param(Param::new("word").annotation("Option | CustomAction[upper_once]")),
    )
    .unwrap();

    check(&cli, "shout --word hey", expect![[r#""HEY""#]]);
    check(&cli, "shout --word a --word b", expect!["error: Invalid value for `--word`: given twice"]);
}

#[test]
fn declaration_errors() {
    let mut cli: Cli = Cli::new();
    let err = cli
        .command(Command::function("cmd", |_| Ok(())).param(Param::new("x").annotation("Frobnicate")))
        .unwrap_err();
    expect!["unknown type `Frobnicate`"].assert_eq(&err.to_string());

    let err = cli
        .command(
            Command::function("cmd", |_| Ok(()))
                .param(Param::new("x").annotation("Option"))
                .doc(":alias y: --why"),
        )
        .unwrap_err();
    expect![":alias y: can't find a flag or option named `y`"].assert_eq(&err.to_string());
}
