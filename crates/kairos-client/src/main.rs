// Kairos/crates/kairos-client/src/main.rs

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use kairos_client::{models::Goal, telemetry, ClientConfig, ClientError, KairosState};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "kairos", about = "Goal and habit coaching from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Command {
    /// Today's checklist
    Today,
    /// Flip a habit for today
    Toggle { habit_id: String },
    /// Log a tracker value for today
    Log {
        tracker_id: String,
        value: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Streaks and completion rates over the progress window
    Habits,
    /// Tracker trends over the progress window
    Trackers,
    /// Show the active coaching session, starting one if needed
    Coach,
    /// Send a message to the coach
    Chat { message: String },
}

#[cfg(feature = "cli")]
async fn require_goal(state: &KairosState) -> anyhow::Result<Goal> {
    match state.active_goal().await? {
        Some(goal) => Ok(goal),
        None => Err(ClientError::precondition("no active goal; create one first").into()),
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing_with_default("warn");

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    config.print_config();
    let state = KairosState::new(config)?;
    let goal = require_goal(&state).await?;
    let today = state.today();

    match cli.command {
        Command::Today => {
            let habits = state.habits(&goal.id, None).await?;
            let logs = state.today_logs().await?;
            let log = logs.iter().find(|log| log.goal_id == goal.id);
            println!("{} ({})", goal.title, today);
            for habit in habits.iter().filter(|h| h.is_active()) {
                let done = log.map(|l| l.is_completed(&habit.id)).unwrap_or(false);
                println!("  [{}] {} ({})", if done { "x" } else { " " }, habit.title, habit.id);
            }
            let progress = state.today_progress(&goal.id).await?;
            println!("{}/{} done ({}%)", progress.completed, progress.total, progress.percent());
        }
        Command::Toggle { habit_id } => {
            let log = state.toggle_habit(&goal.id, &habit_id).await?;
            let state_label = if log.is_completed(&habit_id) { "done" } else { "not done" };
            println!("{} is now {}", habit_id, state_label);
        }
        Command::Log { tracker_id, value, notes } => {
            state.log_tracker(&goal.id, &tracker_id, value, notes.as_deref()).await?;
            println!("Logged {} for {}", value, tracker_id);
        }
        Command::Habits => {
            let habits = state.habits(&goal.id, None).await?;
            for stats in state.habit_overview(&goal.id, today).await? {
                let title = habits
                    .iter()
                    .find(|h| h.id == stats.habit_id)
                    .map(|h| h.title.as_str())
                    .unwrap_or(stats.habit_id.as_str());
                if stats.starts_in_future {
                    println!("  {}: starts {}", title, stats.activated_on.map(|d| d.to_string()).unwrap_or_default());
                } else {
                    println!("  {}: streak {}, {}% of {} days", title, stats.streak, stats.completion_rate, stats.effective_days);
                }
            }
        }
        Command::Trackers => {
            let trackers = state.trackers(&goal.id).await?;
            for stats in state.tracker_overview(&goal.id, today).await? {
                let tracker = trackers.iter().find(|t| t.id == stats.tracker_id);
                let name = tracker.map(|t| t.name.as_str()).unwrap_or(stats.tracker_id.as_str());
                let unit = tracker.map(|t| t.unit.as_str()).unwrap_or("");
                match stats.latest {
                    Some(latest) => println!(
                        "  {}: {}{} (avg {:.1}, {}, {} points)",
                        name,
                        latest,
                        unit,
                        stats.average,
                        stats.trend.as_str(),
                        stats.data_points
                    ),
                    None => println!("  {}: no entries yet", name),
                }
            }
        }
        Command::Coach => {
            let session = match state.coaching_session(&goal.id).await? {
                Some(session) => session,
                None => state.start_coaching(&goal.id, None).await?,
            };
            for message in &session.messages {
                println!("{:?}: {}", message.role, message.content);
            }
            for (index, change) in session.pending_changes() {
                println!("  proposed #{}: {} ({})", index, change.description, change.kind);
            }
        }
        Command::Chat { message } => {
            let session = match state.coaching_session(&goal.id).await? {
                Some(session) => session,
                None => state.start_coaching(&goal.id, None).await?,
            };
            let session = state.send_message(&goal.id, &session.id, &message).await?;
            if let Some(reply) = session.messages.last() {
                println!("{}", reply.content);
            }
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
