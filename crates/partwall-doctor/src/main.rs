#![forbid(unsafe_code)]

use clap::Parser;

fn main() {
    partwall_doctor::logging::init();
    let cli = partwall_doctor::Cli::parse();
    let json = cli.json;
    if let Err(error) = partwall_doctor::run(cli) {
        if json {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("{error}");
        }
        std::process::exit(error.exit_code());
    }
}
