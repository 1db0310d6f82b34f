use clap::Parser;

#[tokio::main]
async fn main() {
    let args = auctioneer::arguments::Arguments::parse();
    observe::tracing::initialize(args.log_filter.as_str());
    tracing::info!("running auctioneer with validated arguments:\n{}", args);
    observe::metrics::setup_registry(Some("lead_engine".into()), None);
    auctioneer::run(args).await;
}
