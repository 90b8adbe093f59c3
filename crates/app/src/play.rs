use color_eyre::eyre::WrapErr;
use quiz_core::model::{QuizResult, Topic};
use services::{AppServices, QuizEvent, QuizRunner, QuizSession, RunnerUpdate, SessionError};
use storage::StorageError;
use tokio::io::{AsyncBufReadExt, BufReader};

const OPTION_KEYS: [char; 4] = ['a', 'b', 'c', 'd'];

/// One line of player input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Event(QuizEvent),
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str, session: &QuizSession) -> Input {
    let line = line.trim().to_ascii_lowercase();
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Input::Invalid("type h for help".into());
    };

    match command {
        "n" | "next" => Input::Event(QuizEvent::Next),
        "p" | "prev" => Input::Event(QuizEvent::Previous),
        "s" | "submit" => Input::Event(QuizEvent::Submit),
        "r" | "retry" => Input::Event(QuizEvent::Retry),
        "h" | "?" | "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        "g" | "go" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(number) if number >= 1 => Input::Event(QuizEvent::JumpTo(number - 1)),
            _ => Input::Invalid("usage: g <question number>".into()),
        },
        key => {
            let mut chars = key.chars();
            let position = match (chars.next(), chars.next()) {
                (Some(c), None) => OPTION_KEYS.iter().position(|k| *k == c),
                _ => None,
            };
            match position {
                Some(i) => {
                    let question = session.current_question();
                    Input::Event(QuizEvent::SelectAnswer {
                        question_id: question.id(),
                        option: question.options()[i].clone(),
                    })
                }
                None => Input::Invalid(format!("unknown command {key:?}; type h for help")),
            }
        }
    }
}

fn print_help() {
    println!("  a-d      choose an option");
    println!("  n / p    next / previous question");
    println!("  g <num>  go to question <num>");
    println!("  s        submit (once every question is answered)");
    println!("  r        start over");
    println!("  q        leave; progress is kept");
}

fn print_question(session: &QuizSession) {
    let question = session.current_question();
    let progress = session.progress();
    println!();
    println!(
        "[{}] Question {}/{}  score {}  answered {}/{}",
        session.topic(),
        progress.current_index + 1,
        progress.total,
        progress.score,
        progress.answered,
        progress.total,
    );
    println!("{}", question.text());
    let selected = session.selected_answer(question.id());
    for (key, option) in OPTION_KEYS.iter().zip(question.options()) {
        let marker = if selected == Some(option.as_str()) { '*' } else { ' ' };
        println!(" {marker}{key}) {option}");
    }
    if session.is_answered(question.id()) && selected.is_none() {
        println!("  (time ran out on this one)");
    }
}

fn print_result(result: &QuizResult) {
    println!();
    println!(
        "{}: {}/{} correct, {}% ({}) in {:.0}s",
        result.topic(),
        result.score(),
        result.total_questions(),
        result.percentage(),
        if result.passed() { "passed" } else { "failed" },
        result.time_taken_secs(),
    );
    println!("Type r to try again or q to quit.");
}

fn report(runner: &QuizRunner, update: &RunnerUpdate) {
    let session = runner.session();
    match update {
        RunnerUpdate::Answered(outcome) => {
            println!(
                "Score {}/{}.",
                outcome.score,
                session.questions().len()
            );
            if runner.can_submit() {
                println!("Every question is answered; type s to submit.");
            }
        }
        RunnerUpdate::Moved { .. } | RunnerUpdate::Restarted => print_question(session),
        RunnerUpdate::Unchanged => println!("No question in that direction."),
        RunnerUpdate::Counting { remaining } => {
            if *remaining <= 5 || remaining % 10 == 0 {
                println!("  {remaining}s left");
            }
        }
        RunnerUpdate::Expired { .. } => {
            println!("Time's up!");
            print_question(session);
        }
        RunnerUpdate::Finished(result) => print_result(result),
    }
}

/// Why a submit request is not forwarded.
fn submit_refusal(session: &QuizSession) -> &'static str {
    if session.is_complete() {
        "This attempt is already submitted; type r to try again."
    } else {
        "Answer every question before submitting."
    }
}

fn report_interrupted(err: &StorageError) {
    tracing::warn!("submit interrupted: {err}");
    println!("Could not save the result ({err}); type s to try again.");
}

/// Interactive loop: timer ticks and stdin lines race, whichever comes first
/// is applied to the runner.
pub async fn play(services: &AppServices, topic: &Topic) -> color_eyre::Result<()> {
    let mut runner = QuizRunner::start(services.quiz_loop(), topic)
        .await
        .wrap_err_with(|| format!("starting {topic}"))?;
    println!(
        "{} questions, {}s each. Type h for help.",
        runner.session().questions().len(),
        runner.session().settings().question_seconds()
    );
    print_question(runner.session());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = runner.wait_tick() => match runner.on_tick().await {
                Ok(update) => report(&runner, &update),
                Err(SessionError::Storage(err)) if runner.session().is_finalizing() => {
                    report_interrupted(&err);
                }
                Err(err) => return Err(err.into()),
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line, runner.session()) {
                    Input::Event(QuizEvent::Submit) if !runner.can_submit() => {
                        println!("{}", submit_refusal(runner.session()));
                    }
                    Input::Event(event) => match runner.dispatch(event).await {
                        Ok(update) => report(&runner, &update),
                        Err(err @ (SessionError::Completed | SessionError::IndexOutOfRange { .. })) => {
                            println!("{err}");
                        }
                        Err(SessionError::Storage(err)) if runner.session().is_finalizing() => {
                            report_interrupted(&err);
                        }
                        Err(err) => return Err(err.into()),
                    },
                    Input::Help => print_help(),
                    Input::Quit => break,
                    Input::Invalid(message) => println!("{message}"),
                }
            }
        }
    }

    let session = runner.close();
    if !session.is_complete() {
        tracing::debug!("leaving {topic} at question {}", session.current_index() + 1);
        println!("Progress saved; run `quiz play \"{topic}\"` to resume.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionDraft, QuestionId, QuizSettings};
    use quiz_core::time::fixed_now;

    fn session() -> QuizSession {
        let questions = (1..=2)
            .map(|id| {
                QuestionDraft::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["w".into(), "x".into(), "y".into(), "z".into()],
                    "y",
                )
                .validate()
                .unwrap()
            })
            .collect();
        QuizSession::new(
            Topic::new("T").unwrap(),
            questions,
            fixed_now(),
            &QuizSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn letters_select_options_of_current_question() {
        let session = session();
        assert_eq!(
            parse_input(" C ", &session),
            Input::Event(QuizEvent::SelectAnswer {
                question_id: QuestionId::new(1),
                option: "y".into(),
            })
        );
        assert!(matches!(parse_input("e", &session), Input::Invalid(_)));
        assert!(matches!(parse_input("ab", &session), Input::Invalid(_)));
    }

    #[test]
    fn submit_after_completion_is_reported_as_done() {
        let mut session = session();
        assert_eq!(
            submit_refusal(&session),
            "Answer every question before submitting."
        );
        session.submit(fixed_now()).unwrap();
        assert_eq!(
            submit_refusal(&session),
            "This attempt is already submitted; type r to try again."
        );
    }

    #[test]
    fn navigation_commands_parse() {
        let session = session();
        assert_eq!(parse_input("n", &session), Input::Event(QuizEvent::Next));
        assert_eq!(parse_input("p", &session), Input::Event(QuizEvent::Previous));
        assert_eq!(parse_input("g 2", &session), Input::Event(QuizEvent::JumpTo(1)));
        assert!(matches!(parse_input("g 0", &session), Input::Invalid(_)));
        assert!(matches!(parse_input("", &session), Input::Invalid(_)));
        assert_eq!(parse_input("q", &session), Input::Quit);
    }
}
