use std::ops::ControlFlow;

use artlens_core::{
    AiScore, ChartSlot, ClientConfig, Orchestrator, PollUpdate, StepView, TaskPhase, progress_bar,
};
use artlens_io::blob::{bytes_to_blob_url, revoke_blob_url};
use artlens_io::{
    FileUpload, MountedChart, PollOutcome, Poller, ProgressPanel, ResultsPanel, SelectedImage,
    StatsPanel, Transport,
};
use dioxus::prelude::*;

mod logging;

fn main() {
    logging::init("info");
    dioxus::launch(app);
}

/// Client config for the backend that served this page.
fn page_config() -> ClientConfig {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .map_or_else(ClientConfig::default, ClientConfig::with_base_url)
}

/// Root application component.
///
/// Owns the orchestrator, the poll loop and the histogram chart slot.
/// Each upload cancels the previous task before anything else happens,
/// so responses still in flight for it are discarded as stale.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    let config = use_hook(page_config);

    // --- Task state ---
    let mut orchestrator = use_signal({
        let config = config.clone();
        move || {
            Orchestrator::new()
                .with_resource_base(config.base_url.clone())
                .with_fractal_decimals(config.fractal_decimals)
        }
    });
    let mut generation = use_signal(|| 0u64);
    let mut histogram = use_signal(ChartSlot::<MountedChart>::new);
    let mut preview = use_signal(|| Option::<String>::None);
    let mut uploading = use_signal(|| false);
    let mut active = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let mut stats_refresh = use_signal(|| 0u64);

    // --- Presentation ---
    let mut progress = use_signal(|| progress_bar(None));
    let mut status = use_signal(String::new);
    let mut steps = use_signal(Vec::<StepView>::new);
    let mut timed_out = use_signal(Vec::<String>::new);
    let mut ai_score = use_signal(|| Option::<AiScore>::None);
    let mut fractal = use_signal(|| Option::<String>::None);
    let mut hog_src = use_signal(|| Option::<String>::None);
    let mut summary = use_signal(|| Option::<String>::None);

    use_drop(move || {
        if let Some(ref url) = *preview.peek() {
            revoke_blob_url(url);
        }
    });

    // --- Model readiness ---
    let readiness_config = config.clone();
    let models_ready = use_resource(move || {
        let config = readiness_config.clone();
        async move {
            let transport = Transport::new(&config).ok()?;
            transport.models_ready().await.ok()
        }
    });

    // --- Upload and poll ---
    let poll_config = config.clone();
    let on_select = move |image: SelectedImage| {
        generation += 1;
        let my_generation = *generation.peek();

        orchestrator.write().cancel();
        histogram.write().clear();
        progress.set(progress_bar(None));
        status.set(String::new());
        steps.set(Vec::new());
        timed_out.set(Vec::new());
        ai_score.set(None);
        fractal.set(None);
        hog_src.set(None);
        summary.set(None);
        error.set(None);
        active.set(false);

        let old_preview = preview.write().take();
        if let Some(old) = old_preview {
            revoke_blob_url(&old);
        }
        match bytes_to_blob_url(&image.bytes, image.mime) {
            Ok(url) => preview.set(Some(url)),
            Err(e) => tracing::warn!(error = %e, "image preview unavailable"),
        }

        let config = poll_config.clone();
        spawn(async move {
            let transport = match Transport::new(&config) {
                Ok(transport) => transport,
                Err(e) => {
                    error.set(Some(e.to_string()));
                    return;
                }
            };

            uploading.set(true);
            let upload = transport
                .upload(image.bytes, &image.name, image.mime)
                .await;
            uploading.set(false);

            // Another image was selected while this one was uploading.
            if *generation.peek() != my_generation {
                return;
            }
            let task_id = match upload {
                Ok(response) => response.task_id,
                Err(e) => {
                    tracing::error!(error = %e, "upload failed");
                    error.set(Some(e.to_string()));
                    return;
                }
            };

            let ticket = orchestrator.write().begin(task_id.clone());
            active.set(true);

            let poller = Poller::new(transport, &config);
            let outcome = poller
                .run(&task_id, gloo_timers::future::sleep, |payload| {
                    let update = orchestrator.write().apply(&ticket, payload.as_ref());
                    let frame = match update {
                        PollUpdate::Stale => return ControlFlow::Break(()),
                        PollUpdate::Pending => return ControlFlow::Continue(()),
                        PollUpdate::Invalid { errors } => {
                            tracing::warn!(?errors, "skipping invalid progress payload");
                            return ControlFlow::Continue(());
                        }
                        PollUpdate::Frame(frame) => *frame,
                    };

                    progress.set(frame.progress);
                    status.set(frame.status);
                    steps.set(frame.steps);
                    timed_out.set(frame.timed_out_steps);

                    let results = frame.results;
                    if results.ai_score.is_some() {
                        ai_score.set(results.ai_score);
                    }
                    if results.fractal_dimension.is_some() {
                        fractal.set(results.fractal_dimension);
                    }
                    if results.hog_image_src.is_some() {
                        hog_src.set(results.hog_image_src);
                    }
                    if results.summary.is_some() {
                        summary.set(results.summary);
                    }
                    if let Some(chart) = results.histogram_chart {
                        match MountedChart::mount(&chart) {
                            Ok(mounted) => histogram.write().replace(mounted),
                            Err(e) => tracing::error!(error = %e, "histogram chart not mounted"),
                        }
                    }

                    match frame.phase {
                        TaskPhase::Running => ControlFlow::Continue(()),
                        TaskPhase::Complete => {
                            stats_refresh += 1;
                            ControlFlow::Break(())
                        }
                        TaskPhase::Failed(message) => {
                            error.set(Some(message));
                            ControlFlow::Break(())
                        }
                        TaskPhase::Abandoned => {
                            error.set(Some("Task abandoned due to a newer upload".into()));
                            ControlFlow::Break(())
                        }
                    }
                })
                .await;

            if let PollOutcome::Exhausted { polls } = outcome
                && *generation.peek() == my_generation
            {
                error.set(Some(format!("No result after {polls} progress checks")));
            }
        });
    };

    let histogram_url = histogram.read().get().map(|c| c.url().to_owned());
    let loading_models = matches!(*models_ready.read(), Some(Some(false)));

    // --- Layout ---
    rsx! {
        style { dangerous_inner_html: include_str!("../assets/style.css") }

        div { class: "app",
            header { class: "app-header",
                h1 { "ArtLens" }
                p { class: "muted",
                    "Color histogram, AI-generation probability, fractal dimension and HOG analysis"
                }
            }

            if loading_models {
                p { class: "banner", "Analysis models are still loading. Uploads will queue until they are ready." }
            }

            FileUpload {
                on_select: on_select,
                disabled: uploading(),
            }

            if uploading() {
                p { class: "muted", "Uploading..." }
            }

            if let Some(ref url) = preview() {
                img { class: "preview", src: "{url}", alt: "Selected image" }
            }

            if let Some(ref err) = error() {
                div { class: "error-box",
                    p { "{err}" }
                }
            }

            if active() {
                ProgressPanel {
                    bar: progress(),
                    status: status(),
                    steps: steps(),
                    timed_out: timed_out(),
                }
                ResultsPanel {
                    ai_score: ai_score(),
                    fractal_dimension: fractal(),
                    hog_image_src: hog_src(),
                    histogram_url: histogram_url,
                    summary: summary(),
                }
            }

            StatsPanel {
                config: config.clone(),
                refresh: stats_refresh,
            }
        }
    }
}
