use anyhow::Result;
use clap::Parser;
use tf_reader::cli::{Cli, Commands};
use tf_reader::{facets, info, query, report};

fn main() -> Result<()> {
    // 1. File logging
    let file_appender = tracing_appender::rolling::daily("logs", "tf_reader.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // 2. Console filter
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer()) // Stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // File
        .init();

    // 3. Panic hook
    std::panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic"
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(target: "panic", "🔥 CRASH at {}: {}", location, msg);
        eprintln!("🔥 CRASH at {}: {}", location, msg);
    }));

    let cli = Cli::parse();
    tracing::info!("🚀 TF Reader started on {:?}", cli.root);

    let catalog = cli.open_catalog()?;

    match cli.command {
        Some(Commands::Facets(args)) => facets::run(&catalog, args)?,
        None => facets::run(&catalog, facets::FacetsArgs::default())?,
        Some(Commands::Query(args)) => query::run(&catalog, args)?,
        Some(Commands::Info(args)) => info::run(&catalog, args)?,
        Some(Commands::Report(args)) => report::run(&catalog, args)?,
    }

    Ok(())
}
