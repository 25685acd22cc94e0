use clap::Parser;
use serde::Serialize;

use paybudget::api::{Cli, Command, build_check, run_http_server};
use paybudget::core::{compute_paycheck, recompute};
use paybudget::store::{JsonFileStore, restore_or_bootstrap};

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    paybudget::init_tracing();

    match Cli::parse().command {
        Command::Serve { port, state_dir } => {
            let store = JsonFileStore::new(&state_dir);
            tracing::info!(path = %store.path().display(), "using snapshot file");
            if let Err(e) = run_http_server(port, Box::new(store)).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Check(args) => match build_check(args) {
            Ok(entry) => print_json(&compute_paycheck(&entry.to_input())),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
        },
        Command::Summary { state_dir } => {
            let store = JsonFileStore::new(&state_dir);
            print_json(&recompute(&restore_or_bootstrap(&store)));
        }
    }
}
