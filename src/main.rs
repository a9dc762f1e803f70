#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = school_lms::run().await {
        eprintln!("school-lms fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
