//! Aggregate statistics over every analyzed image.

use artlens_core::{AggregateStats, ChartSlot, ClientConfig, build_stats_chart};
use dioxus::prelude::*;

use crate::blob::MountedChart;
use crate::transport::Transport;

/// Props for the [`StatsPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct StatsPanelProps {
    /// Backend the statistics are fetched from.
    config: ClientConfig,
    /// Bump to refetch, e.g. after a task completes.
    refresh: Signal<u64>,
}

/// Fetches `/stats` and shows the aggregate bar chart.
///
/// Fetches once on mount, whenever `refresh` changes, and when the
/// refresh button is pressed.
#[component]
pub fn StatsPanel(props: StatsPanelProps) -> Element {
    let mut stats = use_signal(|| Option::<AggregateStats>::None);
    let mut chart = use_signal(ChartSlot::<MountedChart>::new);
    let mut error = use_signal(|| Option::<String>::None);
    let mut loading = use_signal(|| false);
    let mut manual = use_signal(|| 0u64);

    let config = props.config.clone();
    let refresh = props.refresh;
    let _ = use_resource(move || {
        let config = config.clone();
        // Read both triggers so the resource reruns when either changes.
        let _trigger = (refresh(), manual());
        async move {
            loading.set(true);
            match load(&config).await {
                Ok((fresh, mounted)) => {
                    chart.write().replace(mounted);
                    stats.set(Some(fresh));
                    error.set(None);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "statistics unavailable");
                    error.set(Some(e));
                }
            }
            loading.set(false);
        }
    });

    let chart_url = chart.read().get().map(|c| c.url().to_owned());

    rsx! {
        section { class: "stats-panel",
            header { class: "stats-header",
                h2 { "Collection Statistics" }
                button {
                    class: "button",
                    disabled: loading(),
                    onclick: move |_| manual += 1,
                    "Refresh"
                }
            }

            if let Some(ref err) = error() {
                p { class: "upload-error", "{err}" }
            }

            if let Some(ref s) = stats() {
                p { class: "muted", "Images analyzed: {s.total_images}" }
            }

            if let Some(ref url) = chart_url {
                img { class: "chart", src: "{url}", alt: "Aggregate statistics chart" }
            }
        }
    }
}

/// Fetch the statistics and mount their chart.
async fn load(config: &ClientConfig) -> Result<(AggregateStats, MountedChart), String> {
    let transport = Transport::new(config).map_err(|e| e.to_string())?;
    let stats = transport.get_stats().await.map_err(|e| e.to_string())?;
    let mounted = MountedChart::mount(&build_stats_chart(&stats)).map_err(|e| e.to_string())?;
    Ok((stats, mounted))
}
