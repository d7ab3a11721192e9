//! Command parsing and execution.
//!
//! Every command runs after the session has been bootstrapped, so
//! `session.current_user()` is already decided when a command starts.

use anyhow::{bail, Context, Result};
use learngenix_core::models::{
    topics_by_subject, Difficulty, ExerciseType, NewExercise, Role, SubmitAnswer, UserIdentity,
};
use learngenix_core::{Config, SessionManager, TokenBackend};
use tracing::warn;

use crate::format::{activity_line, exercise_block, format_duration, format_optional, truncate_string};

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "LEARNGENIX_PASSWORD";

/// Page size for exercise listings
const DEFAULT_PAGE_SIZE: u32 = 100;

pub const USAGE: &str = "\
Usage: learngenix [--token-store keyring|file|memory] <command> [args]

Commands:
  whoami                              Show the logged in user
  login [email]                       Log in (password from prompt or LEARNGENIX_PASSWORD)
  register <name> <email> <role>      Create a student or teacher account and log in
  logout                              Forget the stored session
  resend-confirmation <email>         Send the confirmation email again
  dashboard                           Stats, progress and recent activity
  subjects                            List subjects and their topics
  topics [subject_id]                 List topics, optionally for one subject
  next <subject_id> [difficulty]      Get the next exercise to practice
  submit <exercise_id> <answer> [s]   Submit an answer, optionally with seconds spent
  progress                            Recorded attempts
  exercises [skip] [limit]            List exercises (teachers)
  new-exercise <subject_id> <type> <difficulty> <title> <content> [answer]
                                      Create an exercise (teachers)
  delete-exercise <id>                Delete an exercise (teachers)
  help                                Show this message";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    WhoAmI,
    Login { email: Option<String> },
    Register { name: String, email: String, role: Role },
    Logout,
    ResendConfirmation { email: String },
    Dashboard,
    Subjects,
    Topics { subject_id: Option<String> },
    Next { subject_id: String, difficulty: Difficulty },
    Submit { exercise_id: String, answer: String, time_spent: Option<u64> },
    Progress,
    Exercises { skip: u32, limit: u32 },
    NewExercise(NewExercise),
    DeleteExercise { id: String },
    Help,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub token_backend: Option<TokenBackend>,
    pub command: Command,
}

impl Cli {
    /// Parse arguments, not including the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut token_backend = None;
        let mut rest: Vec<&str> = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--token-store" => {
                    let value = iter.next().context("--token-store needs a value")?;
                    token_backend = Some(value.parse::<TokenBackend>()?);
                }
                "--ephemeral" => token_backend = Some(TokenBackend::Memory),
                "-h" | "--help" => rest.push("help"),
                other => rest.push(other),
            }
        }

        let command = match rest.as_slice() {
            [] | ["help"] => Command::Help,
            ["whoami"] => Command::WhoAmI,
            ["login"] => Command::Login { email: None },
            ["login", email] => Command::Login {
                email: Some(email.to_string()),
            },
            ["register", name, email, role] => {
                let role = role.parse::<Role>().map_err(anyhow::Error::msg)?;
                if !role.is_registrable() {
                    bail!("Accounts can only be registered as student or teacher");
                }
                Command::Register {
                    name: name.to_string(),
                    email: email.to_string(),
                    role,
                }
            }
            ["logout"] => Command::Logout,
            ["resend-confirmation", email] => Command::ResendConfirmation {
                email: email.to_string(),
            },
            ["dashboard"] => Command::Dashboard,
            ["subjects"] => Command::Subjects,
            ["topics"] => Command::Topics { subject_id: None },
            ["topics", subject_id] => Command::Topics {
                subject_id: Some(subject_id.to_string()),
            },
            ["next", subject_id] => Command::Next {
                subject_id: subject_id.to_string(),
                difficulty: Difficulty::default(),
            },
            ["next", subject_id, difficulty] => Command::Next {
                subject_id: subject_id.to_string(),
                difficulty: difficulty.parse::<Difficulty>().map_err(anyhow::Error::msg)?,
            },
            ["submit", exercise_id, answer] => Command::Submit {
                exercise_id: exercise_id.to_string(),
                answer: answer.to_string(),
                time_spent: None,
            },
            ["submit", exercise_id, answer, secs] => Command::Submit {
                exercise_id: exercise_id.to_string(),
                answer: answer.to_string(),
                time_spent: Some(secs.parse::<u64>().context("Seconds spent must be a whole number")?),
            },
            ["progress"] => Command::Progress,
            ["exercises"] => Command::Exercises {
                skip: 0,
                limit: DEFAULT_PAGE_SIZE,
            },
            ["exercises", skip] => Command::Exercises {
                skip: skip.parse::<u32>().context("skip must be a number")?,
                limit: DEFAULT_PAGE_SIZE,
            },
            ["exercises", skip, limit] => Command::Exercises {
                skip: skip.parse::<u32>().context("skip must be a number")?,
                limit: limit.parse::<u32>().context("limit must be a number")?,
            },
            ["new-exercise", subject_id, kind, difficulty, title, content, answer @ ..]
                if answer.len() <= 1 =>
            {
                let mut exercise = NewExercise::new(*title, *content, parse_exercise_type(kind)?);
                exercise.subject_id = Some(subject_id.to_string());
                exercise.difficulty = difficulty.parse::<Difficulty>().map_err(anyhow::Error::msg)?;
                exercise.correct_answer = answer.first().map(|a| a.to_string());
                Command::NewExercise(exercise)
            }
            ["delete-exercise", id] => Command::DeleteExercise { id: id.to_string() },
            [name, ..] => bail!("Unknown command or wrong arguments: {}", name),
        };

        Ok(Self {
            token_backend,
            command,
        })
    }
}

fn parse_exercise_type(s: &str) -> Result<ExerciseType> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "multiple_choice" => Ok(ExerciseType::MultipleChoice),
        "open_ended" => Ok(ExerciseType::OpenEnded),
        "true_false" => Ok(ExerciseType::TrueFalse),
        "matching" => Ok(ExerciseType::Matching),
        other => bail!("Unknown exercise type {:?}", other),
    }
}

fn require_user(session: &SessionManager) -> Result<UserIdentity> {
    session
        .current_user()
        .context("Not logged in. Run `learngenix login` first.")
}

fn require_teacher(session: &SessionManager) -> Result<UserIdentity> {
    let user = require_user(session)?;
    if !user.can_manage_exercises() {
        bail!("Only teachers can manage exercises (you are a {})", user.role);
    }
    Ok(user)
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn prompt_email() -> Result<String> {
    eprint!("Email: ");
    let mut email = String::new();
    std::io::stdin()
        .read_line(&mut email)
        .context("Failed to read email")?;
    Ok(email.trim().to_string())
}

pub async fn run(command: Command, session: &SessionManager, config: &mut Config) -> Result<()> {
    let api = session.api();

    match command {
        Command::Help => println!("{}", USAGE),

        Command::WhoAmI => match session.current_user() {
            Some(user) => println!("{} <{}> ({})", user.name, user.email, user.role),
            None => println!("Not logged in"),
        },

        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_email()?,
            };
            let password = read_password()?;
            let user = session.login(&email, &password).await?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Welcome back, {}!", user.first_name());
        }

        Command::Register { name, email, role } => {
            let password = read_password()?;
            let user = session.register(&name, &email, &password, role).await?;

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Account created. Welcome, {} ({})!", user.first_name(), user.role);
        }

        Command::Logout => {
            session.logout().await;
            println!("Logged out");
        }

        Command::ResendConfirmation { email } => {
            let resent = api.resend_confirmation(&email).await?;
            println!("{} ({})", resent.message, resent.email);
        }

        Command::Dashboard => {
            require_user(session)?;
            let (summary, subjects, topics) =
                futures::try_join!(api.dashboard_summary(), api.subjects(), api.topics())?;

            println!("Hello, {}!", summary.user.first_name());
            println!();
            let stats = &summary.stats;
            println!(
                "Completed {}/{} exercises ({}%)  ·  average score {:.1}  ·  {} points",
                stats.completed_exercises,
                stats.total_exercises,
                stats.completion_percent(),
                stats.average_score,
                stats.total_points
            );
            println!(
                "Streak {} (best {})  ·  practice time {}",
                stats.current_streak,
                stats.best_streak,
                stats.total_time_display()
            );
            if let Some(created) = summary.created_exercises {
                println!("Exercises created: {}", created);
            }

            println!();
            println!("Overall progress: {}%", summary.progress.general);
            for subject in &subjects {
                if let Some(pct) = summary.progress.by_subject.get(&subject.id) {
                    println!("  {:<30} {:>3}%", subject.name, pct);
                }
            }
            println!("{} subjects, {} topics available", subjects.len(), topics.len());

            if !summary.achievements.is_empty() {
                println!();
                println!("Achievements:");
                for achievement in &summary.achievements {
                    println!(
                        "  {} - {}",
                        format_optional(&achievement.name, "?"),
                        format_optional(&achievement.description, "")
                    );
                }
            }

            if !summary.recent_activity.is_empty() {
                println!();
                println!(
                    "Recent activity ({} of {} correct):",
                    summary.recent_correct(),
                    summary.recent_activity.len()
                );
                for activity in &summary.recent_activity {
                    println!("  {}", activity_line(activity));
                }
            }
        }

        Command::Subjects => {
            let (subjects, topics) = futures::try_join!(api.subjects(), api.topics())?;
            let (grouped, orphans) = topics_by_subject(&subjects, &topics);

            for (subject, topics) in grouped {
                println!("{}  [{}]", subject.name, subject.id);
                if let Some(ref description) = subject.description {
                    println!("  {}", truncate_string(description, 70));
                }
                for topic in topics {
                    println!(
                        "  - {} ({})",
                        topic.name,
                        format_optional(&topic.difficulty, "medium")
                    );
                }
            }
            if !orphans.is_empty() {
                println!("Other topics:");
                for topic in orphans {
                    println!("  - {}", topic.name);
                }
            }
        }

        Command::Topics { subject_id } => {
            let topics = api.topics().await?;
            let topics: Vec<_> = topics
                .iter()
                .filter(|t| subject_id.is_none() || t.subject_id == subject_id)
                .collect();
            for topic in &topics {
                println!(
                    "{}  {:<30} {:<8} {}",
                    topic.id,
                    truncate_string(&topic.name, 30),
                    format_optional(&topic.difficulty, "medium"),
                    format_optional(&topic.description, "")
                );
            }
            println!("{} topics", topics.len());
        }

        Command::Next {
            subject_id,
            difficulty,
        } => {
            require_user(session)?;
            let exercise = api.next_exercise(&subject_id, difficulty).await?;
            println!("{}", exercise_block(&exercise));
        }

        Command::Submit {
            exercise_id,
            answer,
            time_spent,
        } => {
            require_user(session)?;
            let result = api
                .submit_exercise(&SubmitAnswer {
                    exercise_id,
                    answer,
                    time_spent,
                })
                .await?;
            if result.is_correct {
                println!("Correct! +{:.0} points", result.score);
            } else {
                println!("Not quite. Score: {:.0}", result.score);
            }
        }

        Command::Progress => {
            require_user(session)?;
            let progress = api.progress().await?;
            if progress.is_empty() {
                println!("No attempts recorded yet");
            }
            for attempt in &progress {
                println!(
                    "{} {:<36} {:>5.0} pts {:>6}",
                    if attempt.is_correct == Some(true) { "✓" } else { "✗" },
                    attempt.exercise_id,
                    attempt.score,
                    attempt.time_spent.map(format_duration).unwrap_or_default()
                );
            }
            if let Some(avg) = learngenix_core::models::average_score(&progress) {
                println!("Average score: {:.1}", avg);
            }
        }

        Command::Exercises { skip, limit } => {
            require_teacher(session)?;
            let exercises = api.list_exercises(skip, limit).await?;
            for exercise in &exercises {
                println!(
                    "{}  {:<8} {:<16} {}",
                    exercise.id,
                    exercise.difficulty,
                    exercise.kind.display_name(),
                    truncate_string(&exercise.title, 50)
                );
            }
            println!("{} exercises", exercises.len());
        }

        Command::NewExercise(exercise) => {
            require_teacher(session)?;
            let created = api.create_exercise(&exercise).await?;
            println!("Created exercise {}", created.id);
        }

        Command::DeleteExercise { id } => {
            require_teacher(session)?;
            api.delete_exercise(&id).await?;
            println!("Deleted exercise {}", id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(Cli::parse(&args(&[])).unwrap().command, Command::Help);
        assert_eq!(Cli::parse(&args(&["whoami"])).unwrap().command, Command::WhoAmI);
        assert_eq!(
            Cli::parse(&args(&["topics", "s1"])).unwrap().command,
            Command::Topics {
                subject_id: Some("s1".to_string())
            }
        );
        assert_eq!(
            Cli::parse(&args(&["login", "ana@x.com"])).unwrap().command,
            Command::Login {
                email: Some("ana@x.com".to_string())
            }
        );
        assert_eq!(
            Cli::parse(&args(&["next", "s1"])).unwrap().command,
            Command::Next {
                subject_id: "s1".to_string(),
                difficulty: Difficulty::Medium
            }
        );
    }

    #[test]
    fn test_parse_token_store_flag() {
        let cli = Cli::parse(&args(&["--token-store", "file", "logout"])).unwrap();
        assert_eq!(cli.token_backend, Some(TokenBackend::File));
        assert_eq!(cli.command, Command::Logout);

        let cli = Cli::parse(&args(&["whoami", "--ephemeral"])).unwrap();
        assert_eq!(cli.token_backend, Some(TokenBackend::Memory));

        assert!(Cli::parse(&args(&["--token-store"])).is_err());
        assert!(Cli::parse(&args(&["--token-store", "vault", "whoami"])).is_err());
    }

    #[test]
    fn test_register_only_student_or_teacher() {
        let cli = Cli::parse(&args(&["register", "Bob", "b@x.com", "teacher"])).unwrap();
        assert_eq!(
            cli.command,
            Command::Register {
                name: "Bob".to_string(),
                email: "b@x.com".to_string(),
                role: Role::Teacher
            }
        );
        assert!(Cli::parse(&args(&["register", "Eve", "e@x.com", "admin"])).is_err());
    }

    #[test]
    fn test_parse_submit_and_new_exercise() {
        let cli = Cli::parse(&args(&["submit", "e1", "3/4", "42"])).unwrap();
        assert_eq!(
            cli.command,
            Command::Submit {
                exercise_id: "e1".to_string(),
                answer: "3/4".to_string(),
                time_spent: Some(42)
            }
        );
        assert!(Cli::parse(&args(&["submit", "e1", "3/4", "soon"])).is_err());

        let cli = Cli::parse(&args(&[
            "new-exercise", "s1", "true-false", "easy", "Sol", "¿El sol es una estrella?", "true",
        ]))
        .unwrap();
        match cli.command {
            Command::NewExercise(exercise) => {
                assert_eq!(exercise.kind, ExerciseType::TrueFalse);
                assert_eq!(exercise.difficulty, Difficulty::Easy);
                assert_eq!(exercise.subject_id.as_deref(), Some("s1"));
                assert_eq!(exercise.correct_answer.as_deref(), Some("true"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command() {
        let err = Cli::parse(&args(&["fly"])).unwrap_err();
        assert!(err.to_string().contains("fly"));
        assert!(Cli::parse(&args(&["logout", "now"])).is_err());
    }
}
