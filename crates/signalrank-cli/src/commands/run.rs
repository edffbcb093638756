use std::sync::Arc;

use signalrank_core::{
    JsonFileSink, ProviderSet, ReportKind, RunContext, RunSummary, SignalConfig, SignalEngine,
};

/// Daily run: every report goes to a JSON file in the output directory.
///
/// Without an output directory the sink reports a configuration error and
/// each step aborts with an alert.
pub async fn run(
    config: SignalConfig,
    context: &RunContext,
    kinds: &[ReportKind],
    providers: ProviderSet,
    pretty: bool,
) -> RunSummary {
    let sink = Arc::new(JsonFileSink::new(config.output_dir.clone()).with_pretty(pretty));
    let engine = SignalEngine::new(
        config,
        providers.market_data,
        providers.high52,
        sink,
        providers.alerter,
    );
    engine.run(context, kinds).await
}
