use std::sync::Arc;

use signalrank_core::{
    JsonFileSink, MemorySink, ProviderSet, ReportKind, ReportSink, RunContext, RunSummary,
    SignalConfig, SignalEngine,
};

/// Single report. Files are written only when an output directory is set.
pub async fn run(
    config: SignalConfig,
    context: &RunContext,
    kinds: &[ReportKind],
    providers: ProviderSet,
    pretty: bool,
) -> RunSummary {
    let sink: Arc<dyn ReportSink> = match &config.output_dir {
        Some(dir) => Arc::new(JsonFileSink::new(Some(dir.clone())).with_pretty(pretty)),
        None => Arc::new(MemorySink::new()),
    };
    let engine = SignalEngine::new(
        config,
        providers.market_data,
        providers.high52,
        sink,
        providers.alerter,
    );
    engine.run(context, kinds).await
}
