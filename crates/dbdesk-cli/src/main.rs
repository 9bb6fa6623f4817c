#[tokio::main]
async fn main() {
    if let Err(e) = dbdesk_cli::run(std::env::args().collect()).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
