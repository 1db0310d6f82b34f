use {
    crate::{
        arguments::Arguments,
        domain::{Coordinator, Dispatcher},
        infra::{self, buyers::HttpBuyerApi, persistence::InMemory},
        run_loop::RunLoop,
    },
    anyhow::{Context, Result},
    std::sync::Arc,
};

/// Wires the engine together and runs it until killed. Startup errors are
/// fatal by design: a broken registry file or client must not come up
/// half-working.
pub async fn run(args: Arguments) -> ! {
    let run_loop = match build(&args) {
        Ok(run_loop) => run_loop,
        Err(err) => {
            tracing::error!(?err, "startup failed");
            std::process::exit(1);
        }
    };
    let _metrics_task = observe::metrics::serve(args.metrics_address);
    run_loop.run_forever().await
}

fn build(args: &Arguments) -> Result<RunLoop> {
    let registry = infra::config::load(&args.registry)
        .with_context(|| format!("loading buyer registry {}", args.registry.display()))?;
    let registry = Arc::new(registry);
    let api: Arc<dyn infra::BuyerApi> =
        Arc::new(HttpBuyerApi::new().context("building buyer http client")?);
    let persistence: Arc<dyn infra::Persistence> = Arc::new(InMemory::default());

    Ok(RunLoop {
        registry,
        persistence: persistence.clone(),
        coordinator: Coordinator {
            api: api.clone(),
            persistence: persistence.clone(),
            deadline: args.auction_deadline,
        },
        dispatcher: Dispatcher {
            api,
            persistence,
            max_attempts: args.max_post_attempts,
            retry_backoff: args.post_retry_backoff,
        },
        idle_poll_interval: args.idle_poll_interval,
    })
}
