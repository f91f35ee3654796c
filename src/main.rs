use recipe_cli::cli;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();
    let code = cli::run().await;
    process::exit(code);
}
