use super::*;
use clap::error::ErrorKind;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn parses_view_with_defaults() {
    let cli = parse(&[
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "--queue",
        "srcQueue",
        "view",
    ]);

    assert_eq!(cli.endpoint, "amqp://localhost:5672");
    assert_eq!(cli.queue, "srcQueue");
    assert_eq!(cli.temp_queue, None);
    assert_eq!(cli.filter, None);
    assert_eq!(cli.verbosity, "error");
    match cli.command {
        Commands::View { count, output } => {
            assert_eq!(count, 0);
            assert_eq!(output, None);
        }
        other => panic!("expected view, got {other:?}"),
    }
}

#[test]
fn parses_view_count_and_output() {
    let cli = parse(&[
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "--queue",
        "srcQueue",
        "view",
        "--count",
        "5",
        "--output",
        "messages.json",
    ]);

    match cli.command {
        Commands::View { count, output } => {
            assert_eq!(count, 5);
            assert_eq!(output, Some(PathBuf::from("messages.json")));
        }
        other => panic!("expected view, got {other:?}"),
    }
}

#[test]
fn parses_move_with_destination() {
    let cli = parse(&[
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "--queue",
        "srcQueue",
        "move",
        "--destination",
        "destQueue",
    ]);

    match &cli.command {
        Commands::Move { destination } => assert_eq!(destination, "destQueue"),
        other => panic!("expected move, got {other:?}"),
    }
    assert_eq!(cli.command.destination(), Some("destQueue"));
    assert!(!cli.command.is_stream_safe());
}

#[test]
fn parses_copy_and_filter_short_flags() {
    let cli = parse(&[
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "-q",
        "srcQueue",
        "-t",
        "stagingQueue",
        "-f",
        r#"type == "msg.type1""#,
        "copy",
        "-d",
        "destQueue",
    ]);

    assert_eq!(cli.temp_queue.as_deref(), Some("stagingQueue"));
    assert_eq!(cli.filter.as_deref(), Some(r#"type == "msg.type1""#));
    assert!(cli.command.is_stream_safe());
}

#[test]
fn purge_is_not_stream_safe() {
    let cli = parse(&[
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "--queue",
        "srcQueue",
        "purge",
    ]);

    assert!(matches!(cli.command, Commands::Purge));
    assert!(!cli.command.is_stream_safe());
    assert_eq!(cli.command.destination(), None);
}

#[test]
fn queue_is_required() {
    let err = Cli::try_parse_from([
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "view",
    ])
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn move_requires_a_destination() {
    let err = Cli::try_parse_from([
        "rabbit-ops",
        "--endpoint",
        "amqp://localhost:5672",
        "--queue",
        "srcQueue",
        "move",
    ])
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn rejects_unsupported_verbosity() {
    let err = init_tracing("debug").unwrap_err();
    assert!(err.to_string().contains("unsupported verbosity"));
}

#[test]
fn command_names_match_the_subcommands() {
    for (args, name) in [
        (vec!["view"], "view"),
        (vec!["move", "-d", "destQueue"], "move"),
        (vec!["copy", "-d", "destQueue"], "copy"),
        (vec!["purge"], "purge"),
    ] {
        let mut full = vec![
            "rabbit-ops",
            "--endpoint",
            "amqp://localhost:5672",
            "--queue",
            "srcQueue",
        ];
        full.extend(args);
        assert_eq!(parse(&full).command.name(), name);
    }
}
