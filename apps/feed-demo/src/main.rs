use feed_demo::{run, FeedDemoOptions};

fn main() -> anyhow::Result<()> {
    #[cfg(feature = "logging")]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!("=== lazyfeed timeline demo ===");
    println!("Scrolling a simulated paged feed; posts load as rows come into view.");
    println!("Set RUST_LOG=debug to see every appended row.");
    println!();

    let summary = run(FeedDemoOptions::default())?;

    println!();
    println!(
        "Loaded {} posts in {} fetches over {} scroll steps (last demand {}).",
        summary.loaded, summary.fetches, summary.scroll_steps, summary.last_demand
    );
    Ok(())
}
