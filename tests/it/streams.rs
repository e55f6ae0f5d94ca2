use std::cell::RefCell;

use argdeco::{
    io::{self, Capture},
    Cli, Command, Error, ErrorHandler, Exec, Param, Value,
};
use expect_test::expect;

fn delete_cli() -> Cli {
    let mut cli: Cli = Cli::new();
    cli.command(Command::function("delete", |_| {
        io::print("type 'yes' to confirm that you want to delete everything\n")?;
        let answer = io::read_line()?;
        if answer.trim_end() == "yes" {
            io::print("you have chosen 'yes'\n")?;
            return Ok(true);
        }
        Ok(false)
    }))
    .unwrap();
    cli
}

#[test]
fn input_redirect() {
    let cli = delete_cli();
    let out = Capture::default();
    let res = cli.execute_with("delete", Exec::new().stdin("yes").stdout(out.output())).unwrap();
    assert_eq!(res, Value::Bool(true));
    expect![[r#"
        type 'yes' to confirm that you want to delete everything
        you have chosen 'yes'
    "#]]
    .assert_eq(&out.take());

    let res = cli.execute_with("delete", Exec::new().stdin("no\n").stdout(out.output())).unwrap();
    assert_eq!(res, Value::Bool(false));
    expect![[r#"
        type 'yes' to confirm that you want to delete everything
    "#]]
    .assert_eq(&out.take());
}

#[test]
fn streams_are_restored() {
    let cli = delete_cli();
    let out = Capture::default();
    let outer = Capture::default();
    let _guard = io::redirect(io::Streams { stdout: Some(outer.output()), ..io::Streams::default() });
    cli.execute_with("delete", Exec::new().stdin("").stdout(out.output())).unwrap();
    io::print("after\n").unwrap();
    assert!(out.contents().starts_with("type 'yes'"));
    assert_eq!(outer.contents(), "after\n");
}

#[test]
fn streams_are_restored_after_failures() {
    let mut cli: Cli = Cli::new();
    cli.command(Command::function("fail", |_| -> anyhow::Result<()> {
        io::print("partial\n")?;
        anyhow::bail!("broken")
    }))
    .unwrap();

    let outer = Capture::default();
    let inner = Capture::default();
    let _guard = io::redirect(io::Streams { stdout: Some(outer.output()), ..io::Streams::default() });
    let err = cli.execute_with("fail", Exec::new().stdout(inner.output())).unwrap_err();
    assert!(matches!(err, Error::Command(_)));
    io::print("after\n").unwrap();
    assert_eq!(inner.contents(), "partial\n");
    assert_eq!(outer.contents(), "after\n");
}

#[test]
fn default_handler_prints() {
    let cli = delete_cli();
    let err = Capture::default();
    let res = cli.execute_with("command", Exec::new().stderr(err.output())).unwrap();
    assert_eq!(res, Value::None);
    expect![[r#"
        Unknown command: `command`
    "#]]
    .assert_eq(&err.contents());
}

#[test]
fn custom_handler() {
    let cli = delete_cli();
    let out = Capture::default();
    let seen = RefCell::new(Vec::new());
    let handler = ErrorHandler::custom(|err| {
        seen.borrow_mut().push(err.message().to_string());
        io::print(&format!("{err}\n")).unwrap();
    });
    let res = cli.execute_with("command", Exec::new().error_handler(handler).stdout(out.output()));
    assert_eq!(res.unwrap(), Value::None);
    assert_eq!(seen.into_inner(), ["Unknown command: `command`"]);
    assert!(out.contents().len() > 10);
}

#[test]
fn propagated_errors() {
    let cli = delete_cli();
    let res = cli.execute_with("delete 'now", Exec::new().error_handler(ErrorHandler::Propagate));
    match res {
        Err(Error::Parse(err)) => {
            expect!["Unterminated quote in `delete 'now`"].assert_eq(err.message())
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn command_failures() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("div", |args| {
            let (a, b) = (args[0].as_int().unwrap_or(0), args[1].as_int().unwrap_or(0));
            if b == 0 {
                anyhow::bail!("division by zero");
            }
            Ok(a / b)
        })
        .param(Param::new("a").annotation("int"))
        .param(Param::new("b").annotation("int")),
    )
    .unwrap();

    assert_eq!(cli.execute("div 7 2").unwrap(), Value::Int(3));
    let err = cli.execute("div 7 0").unwrap_err();
    assert!(matches!(err, Error::Command(_)));
    expect!["division by zero"].assert_eq(&err.to_string());
}
