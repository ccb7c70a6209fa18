#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = learnhub_rust::run().await {
        eprintln!("learnhub-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
