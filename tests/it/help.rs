use argdeco::{io::Capture, Cli, Command, CommandOptions, Config, ErrorHandler, Exec, HelpMode, Param};
use expect_test::expect;

fn greet() -> Command {
    Command::function("greet", |args| Ok(format!("hello {}", args[0].as_str().unwrap_or_default())))
        .param(Param::new("name"))
        .param(Param::new("loud").annotation("Option").default(false))
        .doc(
            "Greets someone.

            :param name: Who to greet.
            :param loud: Shout.",
        )
}

fn run(cli: &Cli, line: &str) -> String {
    let out = Capture::default();
    cli.execute_with(line, Exec::new().stdout(out.output())).unwrap();
    out.contents()
}

#[test]
fn help_command() {
    let mut cli: Cli = Cli::new();
    cli.command(greet())
        .unwrap()
        .command(Command::function("quit", |_| Ok(())).options(CommandOptions {
            help: Some("Leaves.".to_string()),
            aliases: vec!["exit".to_string()],
            ..CommandOptions::default()
        }))
        .unwrap();

    expect![[r#"
        Usage: <command> ...

        SUBCOMMANDS:
            greet
              Greets someone.

            help
              Prints help for the given command.

            quit (exit)
              Leaves.
    "#]]
    .assert_eq(&run(&cli, "help"));
    expect![[r#"
        Usage: greet [--loud] <name>
          Greets someone.

        ARGS:
            <name>
              Who to greet.

        OPTIONS:
            --loud
              Shout.
    "#]]
    .assert_eq(&run(&cli, "help greet"));
    assert_eq!(run(&cli, "help nonsense"), run(&cli, "help"));
    assert_eq!(cli.help(&["greet"]), run(&cli, "help greet"));
    let err = cli
        .execute_with("greet -h", Exec::new().error_handler(ErrorHandler::Propagate))
        .unwrap_err();
    expect!["Unknown flag: `-h`"].assert_eq(&err.to_string());
}

#[test]
fn dash_h() {
    let config = Config { help_mode: HelpMode::DashH, prog: "app".to_string(), ..Config::default() };
    let mut cli: Cli = Cli::with_config(config);
    cli.command(greet()).unwrap();

    assert!(!cli.tree().has_node(&["help"]));
    expect![[r#"
        Usage: app greet [-h] [--loud] <name>
          Greets someone.

        ARGS:
            <name>
              Who to greet.

        OPTIONS:
            --loud
              Shout.

            -h, --help
              Prints help information.
    "#]]
    .assert_eq(&run(&cli, "greet --help"));
    assert_eq!(run(&cli, "greet -h"), run(&cli, "greet --help"));
    assert_eq!(run(&cli, "greet bob"), "");

    cli.set_help_enabled(&["greet"], false).unwrap();
    let err = cli
        .execute_with("greet -h", Exec::new().error_handler(ErrorHandler::Propagate))
        .unwrap_err();
    expect!["Unknown flag: `-h`"].assert_eq(&err.to_string());
}

#[test]
fn no_help() {
    let config = Config { help_mode: "none".parse().unwrap(), ..Config::default() };
    let mut cli: Cli = Cli::with_config(config);
    cli.command(greet()).unwrap();
    assert!(!cli.tree().has_node(&["help"]));
    expect![[r#"
        Usage: <command> ...

        SUBCOMMANDS:
            greet
              Greets someone.
    "#]]
    .assert_eq(&cli.help(&[] as &[&str]));
}

#[test]
fn help_switch_needs_an_existing_command() {
    let mut cli: Cli = Cli::new();
    cli.command(greet()).unwrap();
    let before = cli.tree().to_string();

    let err = cli.set_help_enabled(&["gret"], true).unwrap_err();
    expect!["no command `gret`"].assert_eq(&err.to_string());
    assert_eq!(cli.tree().to_string(), before);
    assert!(cli.tree().command_map().get("gret").is_none());

    cli.set_help_enabled(&[], true).unwrap();
    assert!(run(&cli, "greet -h").starts_with("Usage: greet [-h]"));
}
