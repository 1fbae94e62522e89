use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::dataset::{DatasetFile, UpdateSummary};
use crate::domain::{DrawNo, DrawRecord, ExitPolicy};
use crate::error::LottoError;
use crate::lottery::DrawClient;
use crate::schedule;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Consecutive rounds to probe at most; probing stops at the first miss.
    pub max_rounds: u32,
    /// Pause between two probes. Not applied before the first one.
    pub probe_delay: Duration,
    /// Raise `max_rounds` to the number of rounds the draw calendar says are out.
    pub catch_up: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_rounds: 1,
            probe_delay: Duration::from_secs(1),
            catch_up: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Updated,
    NoNewRound,
    WriteFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub dataset: String,
    pub outcome: SyncOutcome,
    pub previous_round: u32,
    pub probed: Vec<u32>,
    pub added: Vec<DrawRecord>,
    pub summary: Option<UpdateSummary>,
    pub error: Option<String>,
}

impl SyncReport {
    pub fn next_round(&self) -> u32 {
        self.previous_round.saturating_add(1)
    }

    /// 0 when something was written, 1 on a write failure. A run that found
    /// nothing new exits 1 under [`ExitPolicy::Retry`] and 0 under
    /// [`ExitPolicy::Quiet`].
    pub fn exit_code(&self, policy: ExitPolicy) -> u8 {
        match (self.outcome, policy) {
            (SyncOutcome::Updated, _) => 0,
            (SyncOutcome::NoNewRound, ExitPolicy::Retry) => 1,
            (SyncOutcome::NoNewRound, ExitPolicy::Quiet) => 0,
            (SyncOutcome::WriteFailed, _) => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub round: u32,
    pub record: Option<DrawRecord>,
    pub error: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestResult {
    pub dataset: String,
    pub latest_round: u32,
    pub expected_round: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub dataset: String,
    pub created: bool,
}

type Sleeper = Box<dyn Fn(Duration)>;

pub struct App<C: DrawClient> {
    dataset: DatasetFile,
    client: C,
    sleeper: Sleeper,
}

impl<C: DrawClient> App<C> {
    pub fn new(dataset: DatasetFile, client: C) -> Self {
        Self {
            dataset,
            client,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replaces the pause used between probes.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn dataset(&self) -> &DatasetFile {
        &self.dataset
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn sync(&self, options: &SyncOptions) -> SyncReport {
        self.sync_at(options, Utc::now())
    }

    /// Probes the rounds after the dataset's latest one and writes each hit
    /// as soon as it arrives, so a later failure keeps earlier rounds.
    pub fn sync_at(&self, options: &SyncOptions, now: DateTime<Utc>) -> SyncReport {
        let previous_round = self.dataset.latest_round();
        info!("latest round in {}: {previous_round}", self.dataset.path());

        let mut budget = options.max_rounds.max(1);
        if options.catch_up {
            budget = budget.max(schedule::overdue_rounds(previous_round, now));
        }

        let mut report = SyncReport {
            dataset: self.dataset.path().to_string(),
            outcome: SyncOutcome::NoNewRound,
            previous_round,
            probed: Vec::new(),
            added: Vec::new(),
            summary: None,
            error: None,
        };

        let mut round = DrawNo::after(previous_round);
        for attempt in 0..budget {
            if attempt > 0 && !options.probe_delay.is_zero() {
                (self.sleeper)(options.probe_delay);
            }
            info!("checking round {round}");
            report.probed.push(round.get());

            let Some(record) = self.client.fetch_draw(round) else {
                break;
            };
            match self.dataset.update(std::slice::from_ref(&record)) {
                Ok(summary) => {
                    info!("added {record}");
                    report.added.push(record);
                    report.summary = Some(summary);
                }
                Err(err) => {
                    error!("{err}");
                    report.error = Some(err.to_string());
                    report.outcome = SyncOutcome::WriteFailed;
                    return report;
                }
            }
            round = round.next();
        }

        if !report.added.is_empty() {
            report.outcome = SyncOutcome::Updated;
        }
        report
    }

    /// Fetches one round without touching the dataset.
    pub fn fetch(&self, round: DrawNo) -> FetchResult {
        self.fetch_at(round, Utc::now())
    }

    pub fn fetch_at(&self, round: DrawNo, now: DateTime<Utc>) -> FetchResult {
        let (record, error) = match self.client.try_fetch(round) {
            Ok(record) => (Some(record), None),
            Err(err) => (None, Some(err.to_string())),
        };
        FetchResult {
            round: round.get(),
            record,
            error,
            scheduled_date: schedule::draw_date(round).map(|date| date.to_string()),
            scheduled_passed: schedule::is_published(round, now),
        }
    }

    pub fn latest(&self) -> Result<LatestResult, LottoError> {
        let dataset = self.dataset.load()?;
        Ok(LatestResult {
            dataset: self.dataset.path().to_string(),
            latest_round: dataset.latest_round().unwrap_or(0),
            expected_round: schedule::expected_latest_round(Utc::now()),
        })
    }

    pub fn init(&self) -> Result<InitResult, LottoError> {
        let created = self.dataset.init()?;
        if created {
            info!("created empty dataset {}", self.dataset.path());
        }
        Ok(InitResult {
            dataset: self.dataset.path().to_string(),
            created,
        })
    }
}
