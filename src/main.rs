#[tokio::main]
async fn main() {
    if let Err(e) = clinical_timeline::run().await {
        eprintln!("clinical-timeline: {e}");
        std::process::exit(1);
    }
}
