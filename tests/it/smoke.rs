use argdeco::{Cli, Command, Converter, Param, Value};
use expect_test::expect;

use crate::{check, words};

fn sum(values: &Value, squared: bool) -> f64 {
    values
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_float)
        .map(|v| if squared { v * v } else { v })
        .sum()
}

#[test]
fn add() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("add", |args| {
            Ok(sum(&args[0], args["squared"].as_bool().unwrap_or(false)))
        })
            .param(Param::new("values").annotation("OneOrMore[float]"))
            .param(Param::new("squared").annotation("Option").default(true))
            .doc(
                "Add up all the values.\n\
                 :param values: Numbers to add.\n\
                 :param squared: Add the plain values instead of their squares.",
            ),
    )
    .unwrap();

    check(&cli, "add 2 3 4", expect!["29.0"]);
    check(&cli, "add 2 3 4 --squared", expect!["9.0"]);
    check(&cli, "add", expect!["error: Argument is required: `values`"]);
    check(&cli, "add 1 x", expect!["error: Can't parse `values`, invalid float literal"]);
}

#[test]
fn type_in_brackets() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("sum1", |args| Ok(sum(&args[0], false)))
            .param(Param::new("values").annotation("float | OneOrMore")),
    )
    .unwrap()
    .command(
        Command::function("sum2", |args| Ok(sum(&args[0], false)))
            .param(Param::new("values").annotation("OneOrMore[float]")),
    )
    .unwrap();

    check(&cli, "sum1 10 20 30 40 50", expect!["150.0"]);
    check(&cli, "sum2 10 20 30 40 50", expect!["150.0"]);
}

#[test]
fn flags() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("cmd", |args| Ok(vec![args["foo"].clone(), args["bar"].clone()]))
            .param(Param::new("foo").annotation("Flag").default(true))
            .param(Param::new("bar").annotation("Flag").default(false)),
    )
    .unwrap();

    check(&cli, "cmd -foo -bar", expect!["[False, True]"]);
    check(&cli, "cmd", expect!["[True, False]"]);
    check(&cli, "cmd --foo", expect!["error: Unknown flag: `--foo`"]);
}

#[test]
fn choices() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("play", |args| Ok(args[0].clone()))
            .param(Param::new("hand").annotation("Choices['rock', 'paper', 'scissors']")),
    )
    .unwrap();

    check(&cli, "play rock", expect![[r#""rock""#]]);
    check(
        &cli,
        "play foobar",
        expect![[r#"error: Invalid choice for `hand`: `foobar` (choose from "rock", "paper", "scissors")"#]],
    );
}

#[test]
fn numeric_choices() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("cmd", |args| Ok(args[0].clone()))
            .param(Param::new("x").annotation("float | Choices[range(1,5)]")),
    )
    .unwrap()
    .command(
        Command::function("cols", |args| Ok(args["n"].clone()))
            .param(Param::new("n").annotation("Option | float | Choices[1, 2]").default(1.0)),
    )
    .unwrap();

    check(&cli, "cmd 2", expect!["2.0"]);
    check(&cli, "cmd 2.5", expect!["error: Invalid choice for `x`: `2.5` (choose from 1, 2, 3, 4)"]);
    check(&cli, "cols", expect!["1.0"]);
    check(&cli, "cols --n 2", expect!["2.0"]);
}

#[test]
fn hyphenated_aliases() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("sync", |args| Ok(args["dry"].clone()))
            .param(Param::new("dry").annotation("Option").default(false))
            .doc("Syncs.\n:alias dry: --dry-run, -n"),
    )
    .unwrap();

    check(&cli, "sync --dry-run", expect!["True"]);
    check(&cli, "sync -n", expect!["True"]);
    check(&cli, "sync --dry", expect!["True"]);
    check(&cli, "sync", expect!["False"]);
}

#[test]
fn readme() {
    let mut cli: Cli = Cli::new();
    cli.command(
        Command::function("ls", |args| {
            let mut res = vec![format!("files={}", args[0])];
            res.extend(args.keyword.iter().map(|(k, v)| format!("{k}={v}")));
            Ok(res.join(" "))
        })
        .param(Param::new("files").annotation("ZeroOrMore[str]"))
        .param(Param::new("a").annotation("Flag").default(false))
        .param(Param::new("ignore").annotation("Option | Exactly1[str]").default(""))
        .param(
            Param::new("columns")
                .annotation(r#"Option | int | Choices[Literal["range(1,5)"]]"#)
                .default(1),
        )
        .param(Param::new("sort").annotation(r#"Option | Choices[Literal["fwd", "rev"]]"#).default("fwd"))
        .doc(
            "List information about files (the current directory by default).
            :param files: List of files, may be empty.

            :param a: do not ignore entries starting with '.'
            :alias a: --all

            :param ignore: do not list entries matching PATTERN
            :metavar ignore: PATTERN

            :param columns: number of output columns, must be between 1 and 4
            :alias columns: -c

            :param sort: alphabetic direction of output, either 'fwd' (default) or 'rev'
            :alias sort: -s
            ",
        ),
    )
    .unwrap();

    check(
        &cli,
        "ls -a -c 2 --sort rev --ignore *.log",
        expect![[r#""files=[] a=True columns=2 ignore=[\"*.log\"] sort=\"rev\"""#]],
    );
    check(
        &cli,
        "ls --all -s fwd a b",
        expect![[r#""files=[\"a\", \"b\"] a=True columns=1 ignore=\"\" sort=\"fwd\"""#]],
    );
    check(
        &cli,
        "ls -c 7",
        expect!["error: Invalid choice for `columns`: `7` (choose from 1, 2, 3, 4)"],
    );
}

#[test]
fn custom_type() {
    let mut cli: Cli = Cli::new();
    cli.scope_mut().add_converter(Converter::new("hyphenated", |s| {
        let lower = s.to_lowercase();
        let parts = lower.split_whitespace().map(|w| w.chars().take(4).collect::<String>());
        Ok(Value::Str(parts.collect::<Vec<_>>().join("-")))
    }));
    cli.command(
        Command::function("shorttitle", |args| Ok(args[0].clone()))
            .param(Param::new("longtitle").annotation("hyphenated")),
    )
    .unwrap();

    check(&cli, r#"shorttitle "The Tale of Two Cities""#, expect![[r#""the-tale-of-two-citi""#]]);
    let res = cli.execute(vec!["shorttitle", "A Christmas Carol"]).unwrap();
    assert_eq!(res, Value::from("a-chri-caro"));
    let res = cli.execute(words("shorttitle Carol")).unwrap();
    assert_eq!(res, Value::from("caro"));
}

#[test]
fn subcommands() {
    let mut cli: Cli = Cli::new();
    cli.command(Command::function("switch_on", |_| Ok("on")))
        .unwrap()
        .command(Command::function("switch_off", |_| Ok("off")))
        .unwrap()
        .command(
            Command::function("switch_dim", |args| Ok(args[0].clone()))
                .param(Param::new("level").annotation("int")),
        )
        .unwrap();

    check(&cli, "switch on", expect![[r#""on""#]]);
    check(&cli, "switch off", expect![[r#""off""#]]);
    check(&cli, "switch dim 3", expect!["3"]);
    check(&cli, "switch", expect!["None"]);
    check(&cli, "switch toggle", expect!["error: Unknown command: `toggle`"]);
    check(&cli, "lights", expect!["error: Unknown command: `lights`"]);

    let map = cli.tree().command_map();
    let switch = map.get("switch").unwrap();
    assert!(!switch.is_leaf());
    assert!(switch.get("dim").unwrap().is_leaf());
    assert_eq!(switch.children.keys().collect::<Vec<_>>(), ["dim", "off", "on"]);
    assert!(map.get("help").unwrap().is_leaf());
}
