mod descriptor;
mod dictionary;
mod manifest;
mod registry;
mod server;
mod session;
mod sync;

use std::env;
use std::path::PathBuf;

use server::ServerConfig;

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut manifest_path = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--manifest" => {
                let Some(value) = args.next() else {
                    eprintln!("--manifest expects a path argument");
                    std::process::exit(2);
                };
                manifest_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                println!("Usage: lodestone_server [--manifest <path>]");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let config = ServerConfig { manifest_path };
    if let Err(err) = server::run(config) {
        eprintln!("server failed: {err}");
        std::process::exit(1);
    }
}
