//! Local batch executor.
//!
//! Splits positional columns into row partitions and runs each partition
//! through a [`PredictUdf`] on the blocking pool. Results come back in input
//! order.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use super::udf::PredictUdf;
use crate::error::{PyfuncError, Result};
use crate::frame::{FrameError, Value};

/// Executor limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Partitions predicted concurrently.
    pub workers: usize,
    /// Rows per partition.
    pub batch_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            batch_size: 1024,
        }
    }
}

pub struct BatchExecutor {
    config: ExecutorConfig,
    permits: Arc<Semaphore>,
}

impl BatchExecutor {
    /// Zero limits are raised to one.
    pub fn new(config: ExecutorConfig) -> Self {
        let config = ExecutorConfig {
            workers: config.workers.max(1),
            batch_size: config.batch_size.max(1),
        };
        Self {
            permits: Arc::new(Semaphore::new(config.workers)),
            config,
        }
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Predict every row of `columns`.
    pub async fn run(&self, udf: Arc<PredictUdf>, columns: Vec<Vec<Value>>) -> Result<Vec<Value>> {
        let rows = columns.first().map(Vec::len).unwrap_or(0);
        for (i, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(FrameError::RaggedColumn {
                    label: i.to_string(),
                    expected: rows,
                    actual: column.len(),
                }
                .into());
            }
        }
        if rows == 0 {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::new();
        for start in (0..rows).step_by(self.config.batch_size) {
            let end = (start + self.config.batch_size).min(rows);
            let partition: Vec<Vec<Value>> = columns.iter().map(|c| c[start..end].to_vec()).collect();

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|e| PyfuncError::Predict(e.to_string()))?;
            let udf = Arc::clone(&udf);
            tasks.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                udf.call(partition)
            }));
        }

        tracing::debug!(rows, partitions = tasks.len(), "batch dispatched");

        let mut out = Vec::with_capacity(rows);
        for joined in join_all(tasks).await {
            let values = joined.map_err(|e| PyfuncError::Predict(format!("partition task failed: {}", e)))??;
            out.extend(values);
        }
        Ok(out)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limits_raised() {
        let executor = BatchExecutor::new(ExecutorConfig { workers: 0, batch_size: 0 });
        assert_eq!(executor.config(), ExecutorConfig { workers: 1, batch_size: 1 });
    }

    #[test]
    fn test_default_uses_cpu_count() {
        assert_eq!(ExecutorConfig::default().workers, num_cpus::get());
    }
}
