#[tokio::main]
async fn main() {
    let code = aiscout::cli::run().await;
    std::process::exit(code);
}
