use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, bail, eyre};
use quiz_core::model::{HistoryRecord, QuestionDraft, QuizSettings, Topic};
use services::{AppServices, Clock, CustomQuizDraft};

mod play;

const DEFAULT_LOG_FILTER: &str = "quiz=info,services=info,storage=warn";

#[derive(Parser, Debug)]
#[command(name = "quiz", version, about = "Timed multiple-choice quizzes in the terminal")]
struct Args {
    /// `SQLite` database URL or file path.
    #[arg(long = "db", env = "QUIZ_DB_URL", default_value = "sqlite://quiz.sqlite3", global = true)]
    db_url: String,

    /// Keep everything in memory for this run.
    #[arg(long, global = true)]
    memory: bool,

    /// Seconds allowed per question.
    #[arg(long, env = "QUIZ_QUESTION_SECONDS", default_value_t = 30, global = true)]
    question_seconds: u32,

    /// Percentage needed to pass.
    #[arg(long, env = "QUIZ_PASS_PERCENTAGE", default_value_t = 70, global = true)]
    pass_percentage: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the default admin and user accounts.
    Seed,
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUIZ_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a user account and sign in.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUIZ_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List bundled and custom topics.
    Topics,
    /// Take (or resume) a quiz.
    Play { topic: String },
    /// List accounts (admins only).
    Users,
    /// Show completed attempts.
    History {
        /// Every user's attempts (admins only).
        #[arg(long)]
        all: bool,
    },
    /// Store a custom quiz from a JSON array of questions (admins only).
    AddQuiz {
        topic: String,
        file: PathBuf,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Delete a custom quiz (admins only).
    RemoveQuiz { topic: String },
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// `SQLite` refuses to open a missing file; create it and its parent first.
fn prepare_sqlite_file(db_url: &str) -> color_eyre::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| eyre!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn build_services(args: &Args) -> color_eyre::Result<AppServices> {
    let settings = QuizSettings::new(args.question_seconds, args.pass_percentage)?;
    let clock = Clock::default_clock();
    if args.memory {
        return Ok(AppServices::in_memory(clock, settings)?);
    }

    let db_url = normalize_sqlite_url(&args.db_url);
    prepare_sqlite_file(&db_url)?;
    AppServices::new_sqlite(&db_url, clock, settings)
        .await
        .wrap_err_with(|| format!("opening {db_url}"))
}

async fn require_admin(services: &AppServices) -> color_eyre::Result<()> {
    match services.auth().current().await? {
        Some(identity) if identity.is_admin() => Ok(()),
        Some(identity) => bail!("{} is not an admin", identity.username),
        None => bail!("sign in first with `quiz login`"),
    }
}

fn print_records(records: &[HistoryRecord]) {
    if records.is_empty() {
        println!("No attempts yet.");
        return;
    }
    for record in records {
        println!(
            "{}  {:<16} {:<16} {}/{} ({}%)  {:.0}s",
            record.date.format("%Y-%m-%d %H:%M"),
            record.username,
            record.topic,
            record.score,
            record.total_questions,
            record.percentage,
            record.time_taken,
        );
    }
}

async fn run(args: Args) -> color_eyre::Result<()> {
    let services = build_services(&args).await?;

    match args.command {
        Command::Seed => {
            let added = services.auth().seed_default_accounts().await?;
            println!("Added {added} default account(s).");
        }
        Command::Login { email, password } => {
            services.auth().seed_default_accounts().await?;
            let identity = services.auth().login(&email, &password).await?;
            println!("Signed in as {} ({:?}).", identity.username, identity.role);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            services.auth().seed_default_accounts().await?;
            let identity = services
                .auth()
                .register(&username, &email, &password)
                .await?;
            println!("Registered and signed in as {}.", identity.username);
        }
        Command::Users => {
            require_admin(&services).await?;
            for account in services.auth().accounts().await? {
                println!(
                    "{:>4}  {:<16} {:<28} {:?}",
                    account.id, account.username, account.email, account.role
                );
            }
        }
        Command::Logout => {
            services.auth().logout().await?;
            println!("Signed out.");
        }
        Command::Whoami => match services.auth().current().await? {
            Some(identity) => println!(
                "{} <{}> ({:?})",
                identity.username, identity.email, identity.role
            ),
            None => println!("Not signed in."),
        },
        Command::Topics => {
            for topic in services.catalog().list_topics().await? {
                let origin = if topic.custom { "custom" } else { "bundled" };
                println!(
                    "{:<20} {:>3} questions  {:<12} {:<8} {origin}",
                    topic.name,
                    topic.question_count,
                    topic.category,
                    topic.difficulty.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Play { topic } => {
            let topic = Topic::new(topic)?;
            play::play(&services, &topic).await?;
        }
        Command::History { all } => {
            let history = services.history();
            if all {
                require_admin(&services).await?;
                print_records(&history.recent().await?);
                let overview = history.admin_overview().await?;
                println!(
                    "{} users, {} attempts, average {:.2}%",
                    overview.total_users, overview.total_attempts, overview.average_percentage
                );
            } else {
                let identity = services
                    .auth()
                    .current()
                    .await?
                    .ok_or_else(|| eyre!("sign in first with `quiz login`"))?;
                print_records(&history.for_user(&identity.username).await?);
                if let Some(stats) = history.user_stats(&identity.username).await? {
                    println!(
                        "{} quizzes taken, accuracy {}%, average time {}s, best score {}, best time {:.0}s",
                        stats.quizzes_taken,
                        stats.accuracy,
                        stats.average_time_secs,
                        stats.best_score,
                        stats.best_time_secs
                    );
                }
            }
        }
        Command::AddQuiz {
            topic,
            file,
            category,
            difficulty,
        } => {
            require_admin(&services).await?;
            let topic = Topic::new(topic)?;
            let raw = std::fs::read_to_string(&file)
                .wrap_err_with(|| format!("reading {}", file.display()))?;
            let questions: Vec<QuestionDraft> = serde_json::from_str(&raw)
                .wrap_err_with(|| format!("parsing {}", file.display()))?;
            let draft = CustomQuizDraft {
                questions,
                category,
                difficulty,
                cover_photo: None,
            };
            let count = services.catalog().save_custom_quiz(&topic, draft).await?;
            println!("Saved {topic} with {count} questions.");
        }
        Command::RemoveQuiz { topic } => {
            require_admin(&services).await?;
            let topic = Topic::new(topic)?;
            services.catalog().delete_custom_quiz(&topic).await?;
            println!("Removed {topic}.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();
    run(Args::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn play_takes_topic_and_global_options() {
        let args =
            Args::try_parse_from(["quiz", "play", "Cyber Security", "--question-seconds", "10"])
                .unwrap();
        assert_eq!(args.question_seconds, 10);
        assert!(matches!(args.command, Command::Play { ref topic } if topic == "Cyber Security"));
    }

    #[test]
    fn register_takes_account_details() {
        let args = Args::try_parse_from([
            "quiz",
            "register",
            "--username",
            "carol",
            "--email",
            "carol@example.com",
            "--password",
            "pw",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Register { ref username, .. } if username == "carol"
        ));
    }

    #[test]
    fn sqlite_urls_are_normalized() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/quiz.db"),
            "sqlite:///tmp/quiz.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/quiz.db"), "sqlite:///tmp/quiz.db");
        assert!(normalize_sqlite_url("quiz.db").starts_with("sqlite:///"));
    }
}
