#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = school_lms::run_password_reset().await {
        eprintln!("reset-passwords fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
