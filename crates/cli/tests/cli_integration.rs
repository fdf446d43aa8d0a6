use std::process::{Command, Output};

fn demo() -> Command {
    Command::new(env!("CARGO_BIN_EXE_typeflag-demo"))
}

fn run(args: &[&str]) -> Output {
    demo()
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run typeflag-demo")
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

fn assert_failure(out: &Output, what: &str) -> String {
    assert!(
        !out.status.success(),
        "{what} unexpectedly succeeded:\nstdout:\n{}",
        String::from_utf8_lossy(&out.stdout),
    );
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn help_works() {
    let out = run(&["--help"]);
    assert_success(&out, "typeflag-demo --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("typeflag-demo") && stdout.contains("greet") && stdout.contains("Commands:"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn greet_prints_the_greeting() {
    let out = run(&["-c", "app.json", "greet", "--name", "Abiira", "--greeting", "Hi"]);
    assert_success(&out, "greet");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "Hi Abiira\n");

    let out = run(&["--config=app.json", "greet", "-n=Abiira", "-u"]);
    assert_success(&out, "greet --upper");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "HELLO ABIIRA\n");
}

#[test]
fn missing_required_global_flag_fails() {
    let out = run(&["greet", "--name", "Abiira"]);
    let stderr = assert_failure(&out, "greet without --config");
    assert!(stderr.contains("[-c | --config]"), "unexpected stderr:\n{stderr}");
    assert!(out.stdout.is_empty(), "handler ran despite the error");
}

#[test]
fn missing_required_subcommand_flag_fails() {
    let out = run(&["-c", "app.json", "greet"]);
    let stderr = assert_failure(&out, "greet without --name");
    assert!(stderr.contains("[-n | --name]"), "unexpected stderr:\n{stderr}");
}

#[test]
fn subcommand_help_skips_required_flags() {
    let out = run(&["greet", "--help"]);
    assert_success(&out, "greet --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("typeflag-demo greet") && stdout.contains("--name <STRING>"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn unknown_flag_fails() {
    let out = run(&["-c", "app.json", "--nope"]);
    let stderr = assert_failure(&out, "--nope");
    assert!(stderr.contains("unknown flag: --nope"), "unexpected stderr:\n{stderr}");
}

#[test]
fn show_reports_typed_values() {
    let out = run(&[
        "-c",
        "app.json",
        "--timeout",
        "1h30m",
        "--port=9000",
        "--mac",
        "00-11-22-33-44-55",
        "--email",
        "Abiira Nathan <abiira@example.com>",
        "show",
    ]);
    assert_success(&out, "show");
    let stdout = String::from_utf8_lossy(&out.stdout);
    for line in [
        "config: app.json\n",
        "timeout: 5400s\n",
        "port: 9000\n",
        "mac: 00:11:22:33:44:55\n",
        "email: abiira@example.com\n",
        "verbose: false (default)\n",
    ] {
        assert!(stdout.contains(line), "missing {line:?} in:\n{stdout}");
    }
}

#[test]
fn invalid_values_are_reported() {
    let out = run(&["-c", "app.json", "--port", "eighty", "show"]);
    let stderr = assert_failure(&out, "--port eighty");
    assert!(stderr.contains("invalid int value \"eighty\""), "unexpected stderr:\n{stderr}");

    let out = run(&["-c", "app.json", "--port", "70000", "show"]);
    let stderr = assert_failure(&out, "--port 70000");
    assert!(stderr.contains("[-p | --port]"), "unexpected stderr:\n{stderr}");
}

#[test]
fn file_flag_rejects_directories() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let dir_arg = dir.path().to_str().expect("temp dir is not utf-8");

    let out = run(&["-c", "app.json", "--file", dir_arg, "show"]);
    let stderr = assert_failure(&out, "--file <dir>");
    assert!(stderr.contains("not a regular file"), "unexpected stderr:\n{stderr}");

    let out = run(&["-c", "app.json", "--dir", dir_arg, "show"]);
    assert_success(&out, "--dir <dir>");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&format!("dir: {dir_arg}\n")), "unexpected output:\n{stdout}");
}

#[test]
fn completion_works_without_required_globals() {
    let out = run(&["completion", "--shell", "bash"]);
    assert_success(&out, "completion --shell bash");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("complete -F _typeflag_demo typeflag-demo"),
        "unexpected completion script:\n{stdout}"
    );

    let out = run(&["completion", "--shell", "fish"]);
    let stderr = assert_failure(&out, "completion --shell fish");
    assert!(stderr.contains("[-s | --shell]"), "unexpected stderr:\n{stderr}");
}

#[test]
fn completion_install_round_trip() {
    let home = tempfile::tempdir().expect("failed to create temp dir");
    let install = |args: &[&str]| {
        demo()
            .args(args)
            .env("HOME", home.path())
            .env_remove("XDG_DATA_HOME")
            .output()
            .expect("failed to run typeflag-demo")
    };
    let script = home.path().join(".zsh/completions/_typeflag-demo");

    let out = install(&["completion", "-s", "zsh", "--install"]);
    assert_success(&out, "completion --install");
    assert!(script.is_file(), "{} was not written", script.display());

    let out = install(&["completion", "-s", "zsh", "--uninstall"]);
    assert_success(&out, "completion --uninstall");
    assert!(!script.exists(), "{} was not removed", script.display());
}

#[test]
fn schema_is_json() {
    let out = run(&["schema"]);
    assert_success(&out, "schema");
    let schema: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("schema output is not JSON");

    assert_eq!(schema["program"], "typeflag-demo");
    assert_eq!(schema["flags"][0]["long"], "help");
    assert_eq!(schema["flags"][1]["long"], "config");
    assert_eq!(schema["flags"][1]["required"], true);

    let commands = schema["commands"].as_array().expect("commands is an array");
    let names: Vec<&str> = commands.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(
        names,
        ["greet", "version", "sleep", "cors", "show", "schema", "completion"]
    );
    let completion = commands.last().expect("completion command");
    assert_eq!(completion["exempt"], true);
}

#[test]
fn cors_validates_methods() {
    let out = run(&["-c", "app.json", "cors", "--methods", "get, put"]);
    assert_success(&out, "cors");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("methods: get, put\n"), "unexpected output:\n{stdout}");
    assert!(stdout.contains("origins: *\n"), "unexpected output:\n{stdout}");

    let out = run(&["-c", "app.json", "cors", "-m", "GET,FETCH"]);
    let stderr = assert_failure(&out, "cors -m GET,FETCH");
    assert!(stderr.contains("unknown HTTP method"), "unexpected stderr:\n{stderr}");
}
