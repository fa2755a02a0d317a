use crate::{
    api::{
        error::{BatchError, Result},
        limits,
        run::{Metric, Param, Run, RunStatus, RunTag},
    },
    timestamp, Client, ExperimentId, RunId,
};

/// A run that is buffered in memory until it is submitted.
///
/// It allows logging [parameters][self::TrackingRun::log_param()],
/// [tags][self::TrackingRun::log_tag()] and [metrics][self::TrackingRun::log_metric()].
#[derive(Debug, Clone)]
pub struct TrackingRun {
    start_time: i64,
    param_buffer: Vec<Param>,
    tag_buffer: Vec<RunTag>,
    metric_buffer: Vec<Vec<Metric>>,
}

impl Default for TrackingRun {
    fn default() -> Self {
        TrackingRun::new()
    }
}

impl TrackingRun {
    pub fn new() -> Self {
        TrackingRun {
            start_time: timestamp(),
            param_buffer: Vec::new(),
            tag_buffer: Vec::new(),
            metric_buffer: Vec::new(),
        }
    }

    pub fn log_param(&mut self, key: &str, value: &str) -> Result<(), BatchError> {
        if self.param_buffer.len() >= limits::BATCH_PARAMS {
            return Err(BatchError::TooManyParams(self.param_buffer.len() + 1));
        }
        self.param_buffer.push(Param::new(key, value));
        Ok(())
    }

    pub fn log_tag(&mut self, key: &str, value: &str) -> Result<(), BatchError> {
        if self.tag_buffer.len() >= limits::BATCH_TAGS {
            return Err(BatchError::TooManyTags(self.tag_buffer.len() + 1));
        }
        self.tag_buffer.push(RunTag::new(key, value));
        Ok(())
    }

    pub fn log_metric(&mut self, key: &str, value: f64, step: i64) {
        let metric = Metric {
            key: key.to_owned(),
            value,
            timestamp: timestamp(),
            step,
        };
        match self.metric_buffer.last_mut() {
            Some(chunk) if chunk.len() < limits::BATCH_METRICS => chunk.push(metric),
            _ => {
                let mut chunk = Vec::with_capacity(limits::BATCH_METRICS);
                chunk.push(metric);
                self.metric_buffer.push(chunk);
            }
        }
    }

    /// Create the run, send everything that was logged and mark it finished.
    ///
    /// If sending fails after the run was created, the run is marked failed
    /// on a best-effort basis and the original error is returned.
    pub fn submit(self, client: &dyn Client, experiment: &ExperimentId) -> Result<Run> {
        let mut run = client.create_run(experiment, self.start_time, &[])?;
        let id = run.info.run_id.clone();
        if let Err(error) = self.send_buffers(client, &id) {
            if let Err(cleanup) = client.update_run(&id, RunStatus::Failed, timestamp()) {
                tracing::warn!(run = %id, %cleanup, "could not mark run as failed");
            }
            return Err(error);
        }
        run.info = client.update_run(&id, RunStatus::Finished, timestamp())?;
        run.data.params = self.param_buffer;
        run.data.tags = self.tag_buffer;
        run.data.metrics = self.metric_buffer.into_iter().flatten().collect();
        Ok(run)
    }

    fn send_buffers(&self, client: &dyn Client, id: &RunId) -> Result<()> {
        if !self.param_buffer.is_empty() || !self.tag_buffer.is_empty() {
            client.log_batch(id, &[], &self.param_buffer, &self.tag_buffer)?;
        }
        for chunk in &self.metric_buffer {
            client.log_batch(id, chunk, &[], &[])?;
        }
        Ok(())
    }
}
