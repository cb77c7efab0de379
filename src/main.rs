use clap::Parser;
use sponsorship_api::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = sponsorship_api::cli::run(cli).await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
