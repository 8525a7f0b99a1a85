//! Worker pool that feeds raw entries through per-worker repositories.
//!
//! Parsers are never shared: every worker builds its own [`Repository`] from
//! the same configuration. Only the aggregated statistics are shared.

use crate::config::RepositoryConfig;
use crate::entry_parsers::EntryParserFactory;
use crate::error::{ConfigError, ParseError};
use crate::models::RawEntry;
use crate::parse_result::ParseResult;
use crate::repository::Repository;
use crate::statistics::ParsingStatistics;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Configuration for the ingest pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Number of worker threads to use (0 = auto-detect)
    pub num_workers: usize,
    /// Maximum number of items in each queue
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            queue_capacity: 10_000,
        }
    }
}

/// Work item for the worker queue
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub sequence: usize,
    pub entry: RawEntry,
}

/// Outcome of one entry, tagged with its input position.
#[derive(Debug)]
pub struct IngestOutcome {
    pub sequence: usize,
    pub result: Result<ParseResult, ParseError>,
}

/// Result of one ingestion run, outcomes in input order.
#[derive(Debug)]
pub struct IngestReport {
    pub outcomes: Vec<IngestOutcome>,
    pub statistics: ParsingStatistics,
}

pub struct IngestPool {
    config: IngestConfig,
    repository: RepositoryConfig,
    factory: EntryParserFactory,
    global_statistics: Arc<Mutex<ParsingStatistics>>,
}

impl IngestPool {
    /// Validates the repository configuration by building it once.
    pub fn new(repository: RepositoryConfig, factory: EntryParserFactory) -> Result<Self, ConfigError> {
        Self::with_config(repository, factory, IngestConfig::default())
    }

    pub fn with_config(
        repository: RepositoryConfig,
        factory: EntryParserFactory,
        config: IngestConfig,
    ) -> Result<Self, ConfigError> {
        Repository::new(&repository, &factory)?;
        info!(
            repository = %repository.name,
            parsers = repository.parsers.len(),
            "Ingest pool ready"
        );

        Ok(Self {
            config,
            repository,
            factory,
            global_statistics: Arc::new(Mutex::new(ParsingStatistics::new())),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        if self.config.num_workers > 0 {
            self.config.num_workers
        } else {
            rayon::current_num_threads()
        }
    }

    /// Statistics accumulated over every run of this pool.
    pub fn global_statistics(&self) -> ParsingStatistics {
        self.global_statistics.lock().clone()
    }

    pub fn reset_statistics(&self) {
        *self.global_statistics.lock() = ParsingStatistics::new();
    }

    /// Producer/consumer run over bounded queues with dedicated workers.
    pub fn run(&self, entries: Vec<RawEntry>) -> Result<IngestReport, ConfigError> {
        let capacity = self.config.queue_capacity.max(1);
        let (work_sender, work_receiver): (Sender<WorkItem>, Receiver<WorkItem>) = bounded(capacity);
        let (result_sender, result_receiver): (Sender<IngestOutcome>, Receiver<IngestOutcome>) =
            bounded(capacity);
        let workers = self.worker_count();

        let (mut outcomes, worker_stats) = thread::scope(|scope| {
            scope.spawn(move || {
                for (sequence, entry) in entries.into_iter().enumerate() {
                    if work_sender.send(WorkItem { sequence, entry }).is_err() {
                        break;
                    }
                }
            });

            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let work_receiver = work_receiver.clone();
                    let result_sender = result_sender.clone();
                    scope.spawn(move || self.work(worker, work_receiver, result_sender))
                })
                .collect();

            // Workers hold the remaining handles; the queues close when they finish.
            drop(work_receiver);
            drop(result_sender);

            let outcomes: Vec<IngestOutcome> = result_receiver.iter().collect();
            let worker_stats: Vec<Result<ParsingStatistics, ConfigError>> = handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect();
            (outcomes, worker_stats)
        });

        let mut statistics = ParsingStatistics::new();
        for stats in worker_stats {
            statistics.merge(&stats?);
        }
        outcomes.sort_by_key(|outcome| outcome.sequence);

        self.global_statistics.lock().merge(&statistics);
        info!(status = %statistics.generate_status_line(), "Ingest run finished");

        Ok(IngestReport { outcomes, statistics })
    }

    fn work(
        &self,
        worker: usize,
        work_receiver: Receiver<WorkItem>,
        result_sender: Sender<IngestOutcome>,
    ) -> Result<ParsingStatistics, ConfigError> {
        let repository = Repository::new(&self.repository, &self.factory)?;
        let mut statistics = ParsingStatistics::new();

        while let Ok(item) = work_receiver.recv() {
            let started = Instant::now();
            let result = repository.parse(&item.entry);
            statistics.record(&result, started.elapsed().as_micros() as u64);

            if let Err(error) = &result {
                warn!(worker, sequence = item.sequence, reason = error.kind(), %error, "Entry skipped");
            }

            let outcome = IngestOutcome {
                sequence: item.sequence,
                result,
            };
            if result_sender.send(outcome).is_err() {
                break;
            }
        }

        Ok(statistics)
    }

    /// Work-stealing run on the rayon pool; one repository per rayon split.
    pub fn parse_batch(&self, entries: &[RawEntry]) -> Result<IngestReport, ConfigError> {
        let timed: Option<Vec<(IngestOutcome, u64)>> = entries
            .par_iter()
            .enumerate()
            .map_init(
                || Repository::new(&self.repository, &self.factory).ok(),
                |repository, (sequence, entry)| {
                    let repository = repository.as_ref()?;
                    let started = Instant::now();
                    let result = repository.parse(entry);
                    let micros = started.elapsed().as_micros() as u64;
                    Some((IngestOutcome { sequence, result }, micros))
                },
            )
            .collect();

        let timed = timed.ok_or_else(|| ConfigError::InstantiationFailed {
            parser: self.repository.name.clone(),
            error_message: "worker could not build the repository".to_string(),
        })?;

        let mut statistics = ParsingStatistics::new();
        let outcomes = timed
            .into_iter()
            .map(|(outcome, micros)| {
                statistics.record(&outcome.result, micros);
                outcome
            })
            .collect();

        self.global_statistics.lock().merge(&statistics);
        Ok(IngestReport { outcomes, statistics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, DataType, RepositoryFieldConfig, RepositoryParserConfig};
    use crate::models::FieldValue;

    fn repository() -> RepositoryConfig {
        RepositoryConfig::new("metrics").with_parser(
            RepositoryParserConfig::new("pairs", "delimited")
                .with_property(keys::DELIMITER, "=")
                .with_field(
                    RepositoryFieldConfig::new("value", DataType::Long)
                        .with_property(keys::POSITION, "2"),
                ),
        )
    }

    fn entries(count: usize) -> Vec<RawEntry> {
        (0..count)
            .map(|i| {
                let timestamp = if i % 10 == 9 {
                    "garbage".to_string()
                } else {
                    "2024-01-01T00:00:00.000Z".to_string()
                };
                RawEntry::new(timestamp, "app", "host", "6", format!("n={}", i))
            })
            .collect()
    }

    #[test]
    fn test_default_config() {
        let pool = IngestPool::new(repository(), EntryParserFactory::new()).unwrap();
        assert_eq!(pool.config().num_workers, 0);
        assert!(pool.worker_count() >= 1);
    }

    #[test]
    fn test_invalid_configuration_is_rejected_up_front() {
        let broken = RepositoryConfig::new("r").with_parser(RepositoryParserConfig::new("p", "nope"));
        assert!(matches!(
            IngestPool::new(broken, EntryParserFactory::new()),
            Err(ConfigError::ParserNotFound(_))
        ));
    }

    #[test]
    fn test_run_preserves_order_and_counts() {
        let config = IngestConfig {
            num_workers: 3,
            queue_capacity: 4,
        };
        let pool = IngestPool::with_config(repository(), EntryParserFactory::new(), config).unwrap();
        let report = pool.run(entries(50)).unwrap();

        assert_eq!(report.outcomes.len(), 50);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.sequence, i);
            match &outcome.result {
                Ok(result) => assert_eq!(result.entry.field("value"), Some(&FieldValue::Long(i as i64))),
                Err(error) => {
                    assert_eq!(i % 10, 9);
                    assert_eq!(error.kind(), "InvalidTimestamp");
                }
            }
        }

        assert_eq!(report.statistics.total_entries, 50);
        assert_eq!(report.statistics.skipped_entries, 5);
        assert_eq!(report.statistics.parser_distribution["pairs"], 45);
        assert_eq!(pool.global_statistics().total_entries, 50);
    }

    #[test]
    fn test_parse_batch_matches_run() {
        let pool = IngestPool::new(repository(), EntryParserFactory::new()).unwrap();
        let batch = pool.parse_batch(&entries(20)).unwrap();
        assert_eq!(batch.outcomes.len(), 20);
        assert_eq!(batch.statistics.stored_entries, 18);
        assert!(batch
            .outcomes
            .iter()
            .enumerate()
            .all(|(i, outcome)| outcome.sequence == i));

        pool.run(entries(10)).unwrap();
        assert_eq!(pool.global_statistics().total_entries, 30);
        pool.reset_statistics();
        assert_eq!(pool.global_statistics().total_entries, 0);
    }

    #[test]
    fn test_empty_input() {
        let pool = IngestPool::new(repository(), EntryParserFactory::new()).unwrap();
        let report = pool.run(Vec::new()).unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.statistics.total_entries, 0);
    }
}
