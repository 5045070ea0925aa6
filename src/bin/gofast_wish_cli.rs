use std::{env, process};

use gofast_wish::{cli::commands, cli::output, init};

#[tokio::main]
async fn main() {
    init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = commands::dispatch(args).await {
        output::error(format!("Error: {err}"));
        eprintln!("{}", commands::usage());
        process::exit(1);
    }
}
