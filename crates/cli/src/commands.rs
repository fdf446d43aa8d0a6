//! Subcommands of the demo program.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context as _, Result};
use typeflag::{Cli, Flag, Slot, Value, validate};

const HTTP_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

pub fn greet(cli: &mut Cli) {
    let name = Slot::new(String::new());
    let greeting = Slot::new("Hello".to_string());
    let upper = Slot::new(false);
    let (n, g, u) = (name.clone(), greeting.clone(), upper.clone());

    cli.command("greet", "Greet a person", move |_| {
        tracing::debug!("executing greet command");
        let line = format!("{} {}", g.get(), n.get());
        println!("{}", if u.get() { line.to_uppercase() } else { line });
        Ok(())
    })
    .flag(
        Flag::string("name", "n", &name, "Name of the person to greet")
            .required(true)
            .validate(validate::max_len(64)),
    )
    .flag(Flag::string("greeting", "g", &greeting, "Greeting to use"))
    .flag(Flag::bool("upper", "u", &upper, "Print in upper case"));
}

pub fn version(cli: &mut Cli) {
    cli.command("version", "Print version", |ctx| {
        let version = env!("CARGO_PKG_VERSION");
        if ctx.flags().get::<bool>("short").unwrap_or(false) {
            println!("{version}");
        } else {
            println!("{} {version}", ctx.cli().program());
            if ctx.globals().get::<bool>("verbose").unwrap_or(false) {
                println!("rustc >= {}", env!("CARGO_PKG_RUST_VERSION"));
            }
        }
        Ok(())
    })
    .flag(Flag::bool("short", "s", &Slot::new(false), "Print short version"));
}

pub fn sleep(cli: &mut Cli) {
    let seconds = Slot::new(0);
    let s = seconds.clone();

    cli.command("sleep", "Sleep for a while", move |_| {
        let duration = Duration::from_secs(u64::try_from(s.get())?);
        tracing::info!(?duration, "sleeping");
        std::thread::sleep(duration);
        Ok(())
    })
    .flag(
        Flag::int("time", "t", &seconds, "Time to sleep in seconds")
            .required(true)
            .validate(validate::range(0i32, 3600)),
    );
}

fn known_methods(value: &Value) -> Result<(), String> {
    let Value::StringList(methods) = value else {
        return Err(format!("expected a list of methods, got a {}", value.type_name()));
    };
    match methods
        .iter()
        .find(|m| !HTTP_METHODS.contains(&m.to_ascii_uppercase().as_str()))
    {
        Some(method) => Err(format!("unknown HTTP method {method:?}")),
        None => Ok(()),
    }
}

pub fn cors(cli: &mut Cli) {
    let origins = Slot::new(vec!["*".to_string()]);
    let methods = Slot::new(vec!["GET".to_string(), "POST".to_string()]);
    let headers = Slot::new(vec!["Content-Type".to_string()]);
    let credentials = Slot::new(false);
    let (o, m, h, c) = (
        origins.clone(),
        methods.clone(),
        headers.clone(),
        credentials.clone(),
    );

    cli.command("cors", "Print a CORS policy", move |_| {
        println!("origins: {}", o.get().join(", "));
        println!("methods: {}", m.get().join(", "));
        println!("headers: {}", h.get().join(", "));
        println!("credentials: {}", c.get());
        Ok(())
    })
    .flag(Flag::string_list("origins", "o", &origins, "Allowed origins"))
    .flag(Flag::string_list("methods", "m", &methods, "Allowed methods").validate(known_methods))
    .flag(Flag::string_list("headers", "d", &headers, "Allowed headers"))
    .flag(Flag::bool("credentials", "c", &credentials, "Allow credentials"));
}

pub fn show(cli: &mut Cli) {
    cli.command("show", "Print the global flag values", |ctx| {
        let mut out = std::io::stdout().lock();
        for flag in ctx.globals().flags().skip(1) {
            let marker = if flag.is_set() { "" } else { " (default)" };
            writeln!(out, "{}: {}{marker}", flag.long(), flag.value())?;
        }
        Ok(())
    });
}

pub fn schema(cli: &mut Cli) {
    cli.command("schema", "Print the command-line schema as JSON", |ctx| {
        let json = serde_json::to_string_pretty(&ctx.cli().describe())
            .context("failed to serialize schema")?;
        println!("{json}");
        Ok(())
    });
    cli.exempt("schema");
}
