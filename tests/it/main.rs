mod actions;
mod dispatch;
mod help;
mod smoke;
mod streams;

use argdeco::{Cli, CommandLine, ErrorHandler, Exec};
use expect_test::Expect;

/// Runs `line`, showing either the returned value or the error.
fn check<R>(cli: &Cli<R>, line: &str, expect: Expect) {
    let res = cli.execute_with(line, Exec::new().error_handler(ErrorHandler::Propagate));
    let actual = match res {
        Ok(value) => value.to_string(),
        Err(err) => format!("error: {err}"),
    };
    expect.assert_eq(&actual);
}

fn words(line: &str) -> CommandLine {
    line.split_ascii_whitespace().collect()
}
