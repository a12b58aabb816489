use term_expect::logging::setup::{init_logging, LoggingConfig};
use term_expect_walkthroughs::{hello_world, WalkthroughOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let options = WalkthroughOptions::from_current_dir()?.with_open_docs(true);
    let outcome = hello_world::run(&options, hello_world::sample_people()?).await?;
    println!("{}", outcome.summary()?);

    if outcome.result.success {
        println!("SUCCESS: All expectations met!");
    } else {
        println!("FAILURE: Some expectations failed.");
    }
    Ok(())
}
