//! Console rendering of scan results

use async_trait::async_trait;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{Table, Tabled};

use yapps_core::domain::{Outcome, OutcomeStatus, ScanSummary};
use yapps_core::port::ResultSink;
use yapps_core::{AppError, Result};

/// Prints outcomes as soon as the scheduler harvests them
pub struct ConsoleSink {
    verbose: bool,
    json: bool,
    printed: usize,
}

impl ConsoleSink {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self {
            verbose,
            json,
            printed: 0,
        }
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Render one outcome, or `None` when it is filtered out
    pub fn render(&self, outcome: &Outcome) -> Result<Option<String>> {
        if !self.verbose && !outcome.status.is_open() {
            return Ok(None);
        }
        if self.json {
            return serde_json::to_string(outcome)
                .map(Some)
                .map_err(|e| AppError::Sink(e.to_string()));
        }

        let reason = match &outcome.status {
            OutcomeStatus::Error(reason) => reason.as_str(),
            _ => "",
        };
        Ok(Some(
            format!(
                "{:<16} {} {:<6} {}",
                outcome.host.to_string(),
                paint(&outcome.status),
                outcome.port,
                reason
            )
            .trim_end()
            .to_string(),
        ))
    }
}

fn paint(status: &OutcomeStatus) -> ColoredString {
    let label = format!("{:<8}", status.as_str());
    match status {
        OutcomeStatus::Open => label.green().bold(),
        OutcomeStatus::Closed => label.red(),
        OutcomeStatus::TimedOut => label.yellow(),
        OutcomeStatus::Error(_) => label.magenta(),
    }
}

#[async_trait]
impl ResultSink for ConsoleSink {
    async fn accept(&mut self, outcome: Outcome) -> Result<()> {
        if let Some(line) = self.render(&outcome)? {
            println!("{}", line);
            self.printed += 1;
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "HOST")]
    host: String,
    #[tabled(rename = "SCANNED")]
    scanned: usize,
    #[tabled(rename = "OPEN")]
    open: usize,
    #[tabled(rename = "CLOSED")]
    closed: usize,
    #[tabled(rename = "TIMEOUT")]
    timed_out: usize,
    #[tabled(rename = "ERROR")]
    errors: usize,
    #[tabled(rename = "TIME (ms)")]
    elapsed_ms: i64,
}

impl From<&ScanSummary> for SummaryRow {
    fn from(s: &ScanSummary) -> Self {
        Self {
            host: if s.cancelled {
                format!("{} (cancelled)", s.host)
            } else {
                s.host.to_string()
            },
            scanned: s.harvested,
            open: s.open,
            closed: s.closed,
            timed_out: s.timed_out,
            errors: s.errors,
            elapsed_ms: s.elapsed_ms,
        }
    }
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a ScanSummary,
}

/// Summary block printed after all hosts
pub fn render_summaries(summaries: &[ScanSummary], json: bool) -> Result<String> {
    if json {
        let lines = summaries
            .iter()
            .map(|summary| serde_json::to_string(&SummaryLine { summary }))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        return Ok(lines.join("\n"));
    }
    let rows: Vec<SummaryRow> = summaries.iter().map(SummaryRow::from).collect();
    Ok(Table::new(rows).to_string())
}
