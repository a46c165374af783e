use crate::models::BandParameters;
use std::sync::{Arc, Mutex};

/// Progress of a running grid search, shareable with a reporting thread.
#[derive(Clone, Default)]
pub struct OptimizerStatus {
    inner: Arc<Mutex<OptimizerStatusData>>,
}

#[derive(Default)]
struct OptimizerStatusData {
    phase: String,
    total_cells: usize,
    completed_cells: usize,
    failed_cells: usize,
    best_net: Option<f64>,
    best_parameters: Option<BandParameters>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerStatusSnapshot {
    pub phase: String,
    pub total_cells: usize,
    pub completed_cells: usize,
    pub failed_cells: usize,
    pub best_net: Option<f64>,
    pub best_parameters: Option<BandParameters>,
}

impl OptimizerStatus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(OptimizerStatusData {
                phase: "Initializing".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn set_phase<S: Into<String>>(&self, phase: S) {
        if let Ok(mut data) = self.inner.lock() {
            data.phase = phase.into();
        }
    }

    pub fn set_progress(&self, total_cells: usize, completed_cells: usize, failed_cells: usize) {
        if let Ok(mut data) = self.inner.lock() {
            data.total_cells = total_cells;
            data.completed_cells = completed_cells;
            data.failed_cells = failed_cells;
        }
    }

    pub fn set_best(&self, parameters: BandParameters, net: f64) {
        if let Ok(mut data) = self.inner.lock() {
            data.best_parameters = Some(parameters);
            data.best_net = Some(net);
        }
    }

    pub fn snapshot(&self) -> OptimizerStatusSnapshot {
        if let Ok(data) = self.inner.lock() {
            OptimizerStatusSnapshot {
                phase: data.phase.clone(),
                total_cells: data.total_cells,
                completed_cells: data.completed_cells,
                failed_cells: data.failed_cells,
                best_net: data.best_net,
                best_parameters: data.best_parameters,
            }
        } else {
            OptimizerStatusSnapshot {
                phase: "Status unavailable".to_string(),
                total_cells: 0,
                completed_cells: 0,
                failed_cells: 0,
                best_net: None,
                best_parameters: None,
            }
        }
    }
}
