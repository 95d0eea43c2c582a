use clap::Parser;
use std::net::SocketAddr;

use goalplan::api::{
    Cli, Command, build_config, run_allocate_command, run_http_server, run_project_command,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => match build_config(&args.calculator) {
            Ok(config) => run_http_server(SocketAddr::new(args.host, args.port), config)
                .await
                .map_err(|e| format!("Server error: {e}")),
            Err(msg) => Err(msg),
        },
        Command::Project(args) => run_project_command(args).map(|json| println!("{json}")),
        Command::Allocate(args) => run_allocate_command(args).map(|json| println!("{json}")),
    };

    if let Err(msg) = result {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}
