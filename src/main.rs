use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = spectrowave::app::run().await {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
