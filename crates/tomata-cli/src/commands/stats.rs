use clap::Subcommand;
use serde::Serialize;
use tomata_core::history::{
    group_by_time_of_day, most_productive_month_day, most_productive_time_of_day,
    most_productive_weekday, productivity_totals,
};
use tomata_core::{History, HistoryStore};

#[derive(Subcommand)]
pub enum StatsAction {
    /// All-time aggregate statistics
    All,
    /// Today's completed sessions and focus time
    Today,
    /// Productivity breakdown over the whole history
    Productivity,
}

#[derive(Serialize)]
struct TodayStats {
    completed: usize,
    work_secs: u64,
}

#[derive(Serialize)]
struct Productivity {
    best_time_of_day: Option<String>,
    best_weekday: Option<String>,
    best_month_day: Option<u32>,
    by_time_of_day: Vec<(String, u64)>,
    total_sessions: u64,
    total_work_secs: u64,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = HistoryStore::open()?;

    match action {
        StatsAction::All => {
            let stats = store.load_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Today => {
            let today = chrono::Utc::now().date_naive();
            let sessions = History::new(&store).for_day(today)?;
            let completed: Vec<_> = sessions.iter().filter(|s| s.is_completed).collect();
            let today = TodayStats {
                completed: completed.len(),
                work_secs: completed.iter().map(|s| s.duration_secs).sum(),
            };
            println!("{}", serde_json::to_string_pretty(&today)?);
        }
        StatsAction::Productivity => {
            let sessions = store.all_sessions()?;
            let (total_sessions, total_work_secs) = productivity_totals(&sessions);
            let by_time_of_day = group_by_time_of_day(&sessions)
                .into_iter()
                .map(|(bucket, group)| {
                    let completed = group.iter().filter(|s| s.is_completed).count() as u64;
                    (bucket.label().to_string(), completed)
                })
                .collect();
            let report = Productivity {
                best_time_of_day: most_productive_time_of_day(&sessions)
                    .map(|b| b.label().to_string()),
                best_weekday: most_productive_weekday(&sessions).map(|d| d.to_string()),
                best_month_day: most_productive_month_day(&sessions),
                by_time_of_day,
                total_sessions,
                total_work_secs,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
