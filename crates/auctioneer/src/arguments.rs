use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(long, env, default_value = "warn,auctioneer=debug,model=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "0.0.0.0:9586")]
    pub metrics_address: SocketAddr,

    /// Path of the TOML file holding the buyer registry: buyers, per-service
    /// configs, ZIP coverage and field mapping configs.
    #[clap(long, env, default_value = "registry.toml")]
    pub registry: PathBuf,

    /// Overall deadline for one bidding round. Ping calls still outstanding
    /// when it expires are abandoned and scoring proceeds with whatever
    /// arrived.
    #[clap(long, env, default_value = "5s", value_parser = humantime::parse_duration)]
    pub auction_deadline: Duration,

    /// How often a single buyer is POSTed to before failing over to the
    /// next-ranked bidder.
    #[clap(long, env, default_value = "2")]
    pub max_post_attempts: u32,

    /// Backoff before the first POST retry; doubles per further retry.
    #[clap(long, env, default_value = "500ms", value_parser = humantime::parse_duration)]
    pub post_retry_backoff: Duration,

    /// Sleep between polls when no lead is pending.
    #[clap(long, env, default_value = "1s", value_parser = humantime::parse_duration)]
    pub idle_poll_interval: Duration,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "log_filter: {}", self.log_filter)?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "registry: {}", self.registry.display())?;
        writeln!(f, "auction_deadline: {:?}", self.auction_deadline)?;
        writeln!(f, "max_post_attempts: {}", self.max_post_attempts)?;
        writeln!(f, "post_retry_backoff: {:?}", self.post_retry_backoff)?;
        writeln!(f, "idle_poll_interval: {:?}", self.idle_poll_interval)?;
        Ok(())
    }
}
