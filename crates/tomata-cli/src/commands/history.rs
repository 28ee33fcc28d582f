use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use clap::Subcommand;
use tomata_core::{EventBus, History, HistoryStore, SessionRecorder};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Sessions for one day (defaults to today)
    Day {
        /// Date as YYYY-MM-DD
        date: Option<String>,
    },
    /// Sessions for the ISO week containing a date (defaults to today)
    Week {
        /// Date as YYYY-MM-DD
        date: Option<String>,
    },
    /// Sessions for the month containing a date (defaults to today)
    Month {
        /// Date as YYYY-MM-DD
        date: Option<String>,
    },
    /// Sessions in a half-open day range
    Range {
        /// First day, inclusive (YYYY-MM-DD)
        from: String,
        /// Last day, exclusive (YYYY-MM-DD)
        to: String,
    },
    /// Days that have at least one session
    Days,
    /// Delete sessions older than the given number of days
    Prune {
        /// Age threshold in days
        #[arg(long)]
        days: u32,
    },
    /// Delete the entire session history
    Clear,
}

fn parse_day(raw: Option<String>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match raw {
        Some(s) => Ok(NaiveDate::parse_from_str(&s, "%Y-%m-%d")?),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = HistoryStore::open()?;

    match action {
        HistoryAction::Day { date } => {
            let sessions = History::new(&store).for_day(parse_day(date)?)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Week { date } => {
            let sessions = History::new(&store).for_week(parse_day(date)?)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Month { date } => {
            let sessions = History::new(&store).for_month(parse_day(date)?)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Range { from, to } => {
            let from = NaiveDate::parse_from_str(&from, "%Y-%m-%d")?;
            let to = NaiveDate::parse_from_str(&to, "%Y-%m-%d")?;
            let sessions = History::new(&store).in_range(from, to)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Days => {
            let days = History::new(&store).days_with_sessions()?;
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
        HistoryAction::Prune { days } => {
            let cutoff = Utc::now() - Duration::days(i64::from(days));
            let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
            let removed = recorder.clear_older_than(cutoff)?;
            println!("removed {removed} sessions");
        }
        HistoryAction::Clear => {
            let recorder = SessionRecorder::new(store, Arc::new(EventBus::new()));
            recorder.clear_all()?;
            println!("history cleared");
        }
    }
    Ok(())
}
