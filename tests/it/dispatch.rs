use argdeco::{Cli, Command, CommandOptions, Error, ErrorHandler, Exec, Param, Value};
use expect_test::expect;

use crate::check;

#[derive(Default)]
struct Counter {
    total: i64,
}

fn counter_cli() -> Cli<Counter> {
    let mut cli = Cli::new();
    cli.command(
        Command::method("incr", |counter: &mut Counter, args| {
            counter.total += args["by"].as_int().unwrap_or(1);
            Ok(counter.total)
        })
        .param(Param::new("by").annotation("Option | int").default(1)),
    )
    .unwrap()
    .command(Command::function("version", |_| Ok("1.0")))
    .unwrap();
    cli
}

#[test]
fn methods_get_the_receiver() {
    let cli = counter_cli();
    let mut counter = Counter::default();
    for line in ["incr", "incr --by 5"] {
        cli.execute_with(line, Exec::new().receiver(&mut counter)).unwrap();
    }
    assert_eq!(counter.total, 6);
    check(&cli, "version", expect![[r#""1.0""#]]);
}

#[test]
fn missing_receiver() {
    let cli = counter_cli();
    let err = cli.execute("incr").unwrap_err();
    assert!(matches!(err, Error::MissingReceiver(_)));
    expect!["command `incr` is a method, but no receiver was given"].assert_eq(&err.to_string());
}

#[test]
fn aliases() {
    let mut cli: Cli = Cli::new();
    let options = CommandOptions {
        aliases: vec!["rm".to_string(), "del".to_string()],
        ..CommandOptions::default()
    };
    cli.command(
        Command::function("remove", |args| Ok(args[0].clone()))
            .param(Param::new("name"))
            .options(options),
    )
    .unwrap();

    check(&cli, "remove x", expect![[r#""x""#]]);
    check(&cli, "rm y", expect![[r#""y""#]]);
    check(&cli, "del z", expect![[r#""z""#]]);
}

#[test]
fn separator() {
    let mut cli: Cli = Cli::new();
    cli.command(Command::function("get__state_all", |_| Ok(()))).unwrap();
    assert!(cli.tree().has_node(&["get-state", "all"]));
    check(&cli, "get-state all", expect!["None"]);
}

fn async_cli() -> Cli {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::suspending("sleep", |args| async move {
            let ticks = args[0].as_int().unwrap_or(0);
            for _ in 0..ticks {
                tokio::task::yield_now().await;
            }
            Ok::<_, anyhow::Error>(format!("slept {ticks}"))
        })
        .param(Param::new("ticks").annotation("int")),
    )
    .unwrap()
    .command(Command::function("now", |_| Ok(0)))
    .unwrap();
    cli
}

#[tokio::test]
async fn suspending_commands() {
    let cli = async_cli();
    let res = cli.execute_async("sleep 3", Exec::new()).await.unwrap();
    assert_eq!(res, Value::from("slept 3"));
    let res = cli.execute_async("now", Exec::new()).await.unwrap();
    assert_eq!(res, Value::Int(0));
    let res = cli
        .execute_async("sleep", Exec::new().error_handler(ErrorHandler::Propagate))
        .await
        .unwrap_err();
    expect!["Argument is required: `ticks`"].assert_eq(&res.to_string());
}

#[test]
fn suspending_needs_async_execute() {
    let cli = async_cli();
    let err = cli.execute("sleep 1").unwrap_err();
    assert!(matches!(err, Error::Suspending(_)));
    expect!["command `sleep` is async, use `execute_async`"].assert_eq(&err.to_string());
}
