use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use log::{error, info};

use crate::chart::ChartDescription;
use crate::data::model::Dataset;
use crate::pipeline::{self, Outcome};
use crate::spec::llm::{CompletionModel, TransportError};
use crate::spec::ChartSpec;

type PendingResult = Result<Outcome, TransportError>;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<Arc<Dataset>>,

    /// Text currently in the request box.
    pub request: String,

    /// Request that produced the current spec / chart.
    pub last_request: Option<String>,

    /// Most recent parsed spec, shown as JSON.
    pub spec: Option<ChartSpec>,

    pub chart: Option<ChartDescription>,

    /// Why the last request produced no chart.
    pub chart_error: Option<String>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    /// Whether a request is in flight.
    pub loading: bool,

    /// Rows shown in the preview table.
    pub preview_rows: usize,

    model: Arc<dyn CompletionModel>,
    pending: Option<Receiver<PendingResult>>,
}

impl AppState {
    pub fn new(model: Arc<dyn CompletionModel>, preview_rows: usize) -> Self {
        Self {
            dataset: None,
            request: String::new(),
            last_request: None,
            spec: None,
            chart: None,
            chart_error: None,
            status_message: None,
            loading: false,
            preview_rows,
            model,
            pending: None,
        }
    }

    /// Ingest a newly loaded dataset; results of the previous one are dropped.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(Arc::new(dataset));
        self.spec = None;
        self.chart = None;
        self.chart_error = None;
        self.status_message = None;
    }

    pub fn can_submit(&self) -> bool {
        self.dataset.is_some() && !self.loading && !self.request.trim().is_empty()
    }

    /// Run the pipeline for the current request on a worker thread.
    pub fn submit_request(&mut self) {
        if !self.can_submit() {
            return;
        }
        let Some(dataset) = self.dataset.clone() else {
            return;
        };
        let request = self.request.trim().to_string();
        let model = Arc::clone(&self.model);
        let (tx, rx) = mpsc::channel();

        info!("Submitting request {request:?}");
        self.last_request = Some(request.clone());
        self.loading = true;
        self.status_message = None;
        self.pending = Some(rx);

        thread::spawn(move || {
            let result = pipeline::run(model.as_ref(), &dataset, &request);
            // The receiver is gone only if the app shut down.
            let _ = tx.send(result);
        });
    }

    /// Pick up a finished request, if any. Returns true when state changed.
    pub fn poll_pending(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                self.finish_with_error("Request worker stopped unexpectedly".to_string());
                return true;
            }
        };

        self.pending = None;
        self.loading = false;
        match result {
            Ok(outcome) => {
                self.spec = Some(outcome.spec);
                match outcome.chart {
                    Ok(chart) => {
                        self.chart = Some(chart);
                        self.chart_error = None;
                    }
                    Err(e) => {
                        self.chart = None;
                        self.chart_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                error!("Language model call failed: {e}");
                self.finish_with_error(format!("Error: {e}"));
            }
        }
        true
    }

    fn finish_with_error(&mut self, message: String) {
        self.pending = None;
        self.loading = false;
        self.status_message = Some(message);
    }

    /// Parsed spec as pretty JSON for display.
    pub fn spec_json(&self) -> Option<String> {
        self.spec
            .as_ref()
            .and_then(|s| serde_json::to_string_pretty(s).ok())
    }
}
