use term_expect::logging::setup::{init_logging, LoggingConfig};
use term_expect_walkthroughs::{csv_validation, WalkthroughOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let options = WalkthroughOptions::from_current_dir()?;
    csv_validation::ensure_sample_data(&options.project_dir).await?;
    let outcome = csv_validation::run(&options).await?;
    println!("{}", outcome.summary()?);

    if outcome.result.success {
        println!("SUCCESS: All expectations met!");
    } else {
        println!("FAILURE: Some expectations failed.");
        for failed in outcome.result.failed() {
            println!(
                "Failed expectation: {} on '{}'",
                failed.expectation_config.expectation_type(),
                failed.expectation_config.column()
            );
        }
    }
    Ok(())
}
