//! Observers for learner runs
//!
//! Observers allow composable data collection during a run without coupling
//! the learners to specific output formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Error, Result, learners::DegenerateStateWarning, ports::Observer, surprisal::SurprisalRecord,
};

/// Progress bar observer - shows run progress on stderr
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    hidden: bool,
    label: String,
    warnings: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            hidden: false,
            label: String::new(),
            warnings: 0,
        }
    }

    /// Observer that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            ..Self::new()
        }
    }

    /// Steps completed so far.
    pub fn position(&self) -> u64 {
        self.progress_bar.as_ref().map_or(0, ProgressBar::position)
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_run_start(&mut self, label: &str, steps: usize) -> Result<()> {
        let pb = if self.hidden {
            let pb = ProgressBar::hidden();
            pb.set_length(steps as u64);
            pb
        } else {
            ProgressBar::new(steps as u64)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps ({msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        pb.set_message(label.to_string());
        self.label = label.to_string();
        self.warnings = 0;
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_record(&mut self, _record: &SurprisalRecord) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
        Ok(())
    }

    fn on_warning(&mut self, _warning: &DegenerateStateWarning) -> Result<()> {
        self.warnings += 1;
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} W:{}", self.label, self.warnings));
        }
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("{} done", self.label));
        }
        Ok(())
    }
}

/// Logs every record at debug level.
#[derive(Debug, Default)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for TracingObserver {
    fn on_run_start(&mut self, label: &str, steps: usize) -> Result<()> {
        self.label = label.to_string();
        info!(label, steps, "computing surprisal measures");
        Ok(())
    }

    fn on_record(&mut self, record: &SurprisalRecord) -> Result<()> {
        debug!(
            label = %self.label,
            t = record.t,
            observation = record.observation,
            ps = record.predictive,
            bs = record.bayesian,
            cs = record.corrected,
            "step"
        );
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<()> {
        info!(label = %self.label, "done computing surprisal measures");
        Ok(())
    }
}

/// One line of a JSONL export.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonlEvent<'a> {
    Record {
        label: &'a str,
        record: &'a SurprisalRecord,
    },
    Warning {
        label: &'a str,
        warning: &'a DegenerateStateWarning,
    },
}

/// JSONL observer - one JSON object per record and per warning
pub struct JsonlObserver {
    writer: BufWriter<File>,
    label: String,
}

impl JsonlObserver {
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
            label: String::new(),
        })
    }
}

fn write_event(writer: &mut BufWriter<File>, event: &JsonlEvent<'_>) -> Result<()> {
    serde_json::to_writer(&mut *writer, event)?;
    writeln!(writer)?;
    Ok(())
}

impl Observer for JsonlObserver {
    fn on_run_start(&mut self, label: &str, _steps: usize) -> Result<()> {
        self.label = label.to_string();
        Ok(())
    }

    fn on_record(&mut self, record: &SurprisalRecord) -> Result<()> {
        let event = JsonlEvent::Record {
            label: &self.label,
            record,
        };
        write_event(&mut self.writer, &event)
    }

    fn on_warning(&mut self, warning: &DegenerateStateWarning) -> Result<()> {
        let event = JsonlEvent::Warning {
            label: &self.label,
            warning,
        };
        write_event(&mut self.writer, &event)
    }

    fn on_run_end(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Summary of one learner run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub label: String,
    pub steps: usize,
    /// Steps with a `NaN` or infinite score.
    pub degenerate_steps: usize,
    /// Updates that fell back to the uniform prior.
    pub warnings: usize,
    /// Means over finite values only; `None` when there are none.
    pub mean_predictive: Option<f64>,
    pub mean_bayesian: Option<f64>,
    pub mean_corrected: Option<f64>,
}

impl RunSummary {
    /// Save summary to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load summary from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FiniteMean {
    sum: f64,
    count: usize,
}

impl FiniteMean {
    fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Accumulates a [`RunSummary`] while the run streams past.
#[derive(Debug, Default)]
pub struct SummaryObserver {
    label: String,
    steps: usize,
    degenerate_steps: usize,
    warnings: usize,
    predictive: FiniteMean,
    bayesian: FiniteMean,
    corrected: FiniteMean,
}

impl SummaryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            label: self.label.clone(),
            steps: self.steps,
            degenerate_steps: self.degenerate_steps,
            warnings: self.warnings,
            mean_predictive: self.predictive.mean(),
            mean_bayesian: self.bayesian.mean(),
            mean_corrected: self.corrected.mean(),
        }
    }
}

impl Observer for SummaryObserver {
    fn on_run_start(&mut self, label: &str, _steps: usize) -> Result<()> {
        *self = Self {
            label: label.to_string(),
            ..Self::default()
        };
        Ok(())
    }

    fn on_record(&mut self, record: &SurprisalRecord) -> Result<()> {
        self.steps += 1;
        if record.is_degenerate() {
            self.degenerate_steps += 1;
        }
        self.predictive.push(record.predictive);
        self.bayesian.push(record.bayesian);
        self.corrected.push(record.corrected);
        Ok(())
    }

    fn on_warning(&mut self, _warning: &DegenerateStateWarning) -> Result<()> {
        self.warnings += 1;
        Ok(())
    }
}

/// Fans every event out to a list of borrowed observers, in order.
///
/// The first failing observer aborts the event.
#[derive(Default)]
pub struct ObserverSet<'a> {
    observers: Vec<&'a mut dyn Observer>,
}

impl<'a> ObserverSet<'a> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn with(mut self, observer: &'a mut dyn Observer) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: &'a mut dyn Observer) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Observer for ObserverSet<'_> {
    fn on_run_start(&mut self, label: &str, steps: usize) -> Result<()> {
        self.observers
            .iter_mut()
            .try_for_each(|o| o.on_run_start(label, steps))
    }

    fn on_record(&mut self, record: &SurprisalRecord) -> Result<()> {
        self.observers.iter_mut().try_for_each(|o| o.on_record(record))
    }

    fn on_warning(&mut self, warning: &DegenerateStateWarning) -> Result<()> {
        self.observers
            .iter_mut()
            .try_for_each(|o| o.on_warning(warning))
    }

    fn on_run_end(&mut self) -> Result<()> {
        self.observers.iter_mut().try_for_each(|o| o.on_run_end())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::types::ModelVariant;

    fn record(t: usize, predictive: f64) -> SurprisalRecord {
        SurprisalRecord {
            t,
            observation: 1,
            hidden: 0,
            predictive,
            bayesian: 0.5,
            corrected: 1.0,
            parameters: vec![1.0, 2.0],
        }
    }

    fn warning() -> DegenerateStateWarning {
        DegenerateStateWarning {
            variant: ModelVariant::AlternationProbability,
            t: 0,
        }
    }

    #[test]
    fn test_summary_observer_skips_non_finite_values() {
        let mut summary = SummaryObserver::new();
        summary.on_run_start("CD_AP", 3).unwrap();
        summary.on_warning(&warning()).unwrap();
        summary.on_record(&record(0, 1.0)).unwrap();
        summary.on_record(&record(1, f64::INFINITY)).unwrap();
        summary.on_record(&record(2, 2.0)).unwrap();
        summary.on_run_end().unwrap();

        let result = summary.summary();
        assert_eq!(result.label, "CD_AP");
        assert_eq!(result.steps, 3);
        assert_eq!(result.degenerate_steps, 1);
        assert_eq!(result.warnings, 1);
        assert!((result.mean_predictive.unwrap() - 1.5).abs() < 1e-12);
        assert!((result.mean_bayesian.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_observer_set_fans_out() {
        let mut first = SummaryObserver::new();
        let mut second = ProgressObserver::hidden();
        {
            let mut set = ObserverSet::new().with(&mut first).with(&mut second);
            assert_eq!(set.len(), 2);
            set.on_run_start("GRW_SP", 2).unwrap();
            set.on_record(&record(2, 0.3)).unwrap();
            set.on_record(&record(3, 0.4)).unwrap();
            set.on_run_end().unwrap();
        }
        assert_eq!(first.summary().steps, 2);
        assert_eq!(second.position(), 2);
    }

    #[test]
    fn test_jsonl_observer_writes_one_line_per_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut jsonl = JsonlObserver::new(&path).unwrap();
        jsonl.on_run_start("CD_TP", 2).unwrap();
        jsonl.on_warning(&warning()).unwrap();
        jsonl.on_record(&record(0, f64::NAN)).unwrap();
        jsonl.on_run_end().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "warning");
        assert_eq!(lines[0]["warning"]["t"], 0);
        assert_eq!(lines[1]["event"], "record");
        assert_eq!(lines[1]["label"], "CD_TP");
        assert!(lines[1]["record"]["predictive"].is_null());
    }

    #[test]
    fn test_summary_without_finite_values_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("degenerate.json");
        let mut summary = SummaryObserver::new();
        summary.on_run_start("CD_SP", 1).unwrap();
        let mut degenerate = record(0, f64::NAN);
        degenerate.bayesian = f64::INFINITY;
        degenerate.corrected = f64::NAN;
        summary.on_record(&degenerate).unwrap();

        let result = summary.summary();
        assert_eq!(result.degenerate_steps, 1);
        assert_eq!(result.mean_predictive, None);
        assert_eq!(result.mean_corrected, None);
        result.save(&path).unwrap();
        assert_eq!(RunSummary::load(&path).unwrap(), result);

        assert_eq!(SummaryObserver::new().summary().mean_bayesian, None);
    }

    #[test]
    fn test_run_summary_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let summary = RunSummary {
            label: "CD_SP".to_string(),
            steps: 10,
            mean_predictive: Some(0.7),
            ..RunSummary::default()
        };
        summary.save(&path).unwrap();
        assert_eq!(RunSummary::load(&path).unwrap(), summary);
    }
}
