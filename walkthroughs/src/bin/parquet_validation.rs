use term_expect::logging::setup::{init_logging, LoggingConfig};
use term_expect_walkthroughs::{parquet_validation, WalkthroughOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let options = WalkthroughOptions::from_current_dir()?;
    let outcome = parquet_validation::run(&options).await?;
    println!("{}", outcome.summary()?);

    if outcome.result.success {
        println!("SUCCESS: All expectations met!");
    } else {
        println!("FAILURE: Some expectations failed.");
    }
    Ok(())
}
