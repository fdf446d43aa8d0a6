mod commands;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::{EnvFilter, fmt};
use typeflag::{Cli, Flag, MacAddr, Slot, validate};
use url::Url;
use uuid::Uuid;

const PROGRAM: &str = "typeflag-demo";

fn main() -> Result<()> {
    init_tracing();
    let cli = build_cli()?;
    cli.run(std::env::args())
}

fn build_cli() -> Result<Cli> {
    let mut cli = Cli::new(PROGRAM).about("Typed flags and subcommands, end to end");

    let config = Slot::new("config.json".to_string());
    let url = Slot::new(Url::parse("http://localhost:8080/").context("invalid default url")?);

    cli.flag(Flag::string("config", "c", &config, "Path to config file").required(true))
        .flag(Flag::bool("verbose", "v", &Slot::new(false), "Enable verbose output"))
        .flag(Flag::duration(
            "timeout",
            "t",
            &Slot::new(Duration::from_secs(5)),
            "Timeout for the request",
        ))
        .flag(
            Flag::int("port", "p", &Slot::new(8080), "Port to listen on")
                .validate(validate::range(1i32, 65535)),
        )
        .flag(Flag::host_port("hostport", "H", &Slot::new(String::new()), "Host:port to listen on"))
        .flag(Flag::timestamp(
            "start",
            "s",
            &Slot::new(Utc::now().fixed_offset()),
            "Start time",
        ))
        .flag(Flag::url("url", "u", &url, "URL to fetch"))
        .flag(Flag::uuid("uuid", "", &Slot::new(Uuid::nil()), "UUID to use"))
        .flag(Flag::ip_address(
            "ip",
            "",
            &Slot::new(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            "IP address to use",
        ))
        .flag(Flag::mac_address("mac", "m", &Slot::new(MacAddr::default()), "MAC address to use"))
        .flag(Flag::email("email", "e", &Slot::new(String::new()), "Email address to use"))
        .flag(Flag::file_path("file", "f", &Slot::new(PathBuf::new()), "File path to use"))
        .flag(Flag::dir_path("dir", "d", &Slot::new(PathBuf::new()), "Directory path to use"));

    commands::greet(&mut cli);
    commands::version(&mut cli);
    commands::sleep(&mut cli);
    commands::cors(&mut cli);
    commands::show(&mut cli);
    commands::schema(&mut cli);
    cli.add_completion_command();

    Ok(cli)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
