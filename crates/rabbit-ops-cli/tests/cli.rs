use assert_cmd::Command;
use predicates::prelude::*;

fn rabbit_ops() -> Command {
    let mut cmd = Command::cargo_bin("rabbit-ops").unwrap();
    cmd.env_remove("RABBITMQ_ENDPOINT")
        .env_remove("RABBITMQ_HTTP_API_ENDPOINT");
    cmd
}

#[test]
fn help_lists_all_subcommands() {
    rabbit_ops()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("view")
                .and(predicate::str::contains("move"))
                .and(predicate::str::contains("copy"))
                .and(predicate::str::contains("purge")),
        );
}

#[test]
fn missing_endpoint_is_an_error() {
    rabbit_ops()
        .args(["--queue", "srcQueue", "view"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--endpoint"));
}

#[test]
fn missing_queue_is_an_error() {
    rabbit_ops()
        .args(["--endpoint", "amqp://localhost:5672", "view"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--queue"));
}

#[test]
fn missing_subcommand_is_an_error() {
    rabbit_ops()
        .args(["--endpoint", "amqp://localhost:5672", "--queue", "srcQueue"])
        .assert()
        .failure();
}

#[test]
fn version_prints() {
    rabbit_ops()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rabbit-ops"));
}
