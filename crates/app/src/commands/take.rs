use std::sync::Arc;

use assess_core::model::{AgeBand, RenderHint};
use services::sessions::RunOutcome;
use services::{AssessmentRunner, SessionConfig, SessionObservation, SessionStatus, UiEvent};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, watch};

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Answer(usize),
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) if n >= 1 => Command::Answer(n - 1),
        _ => Command::Unknown,
    }
}

/// Tracks what has already been printed so repeated observations stay quiet.
#[derive(Default)]
struct Screen {
    question: usize,
    locked: bool,
    remaining: Option<u32>,
    notice: Option<String>,
}

impl Screen {
    fn render(&mut self, view: &SessionObservation) {
        if view.notice.is_some() && view.notice != self.notice {
            self.notice.clone_from(&view.notice);
            if let Some(notice) = &view.notice {
                eprintln!("! {notice}");
            }
        }

        let Some(question) = &view.question else {
            return;
        };
        if view.question_number != self.question {
            self.question = view.question_number;
            self.locked = false;
            self.remaining = None;
            println!();
            println!(
                "Question {}/{}  [{}]",
                view.question_number,
                view.total_questions,
                question.category().as_str()
            );
            match question.hint() {
                Some(RenderHint::ColorSwatch(hex)) => println!("  (colour {hex})"),
                Some(RenderHint::Emoji(emoji)) => println!("  {emoji}"),
                None => {}
            }
            println!("{}", question.prompt());
            for (i, option) in question.options().iter().enumerate() {
                println!("  {}) {option}", i + 1);
            }
            println!("Answer 1-{} or q to quit.", question.options().len());
        }

        if view.status == SessionStatus::Presenting && self.remaining != Some(view.time_remaining) {
            self.remaining = Some(view.time_remaining);
            if view.time_remaining % 5 == 0 || view.time_remaining <= 3 {
                println!("  {}s left", view.time_remaining);
            }
        }

        if view.is_locked() && !self.locked {
            self.locked = true;
            if let Some(answer) = &view.last_answer {
                let correct = question
                    .options()
                    .get(answer.correct_index)
                    .map_or("", String::as_str);
                match (answer.timed_out(), answer.is_correct) {
                    (true, _) => println!("Time's up. The answer was: {correct}"),
                    (false, true) => println!("Correct!"),
                    (false, false) => println!("Not quite. The answer was: {correct}"),
                }
            }
        }
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

/// Collect name and age until the session accepts them. `false` means the user gave up.
async fn intake(
    input: &mut Input,
    tx: &mpsc::Sender<UiEvent>,
    observed: &mut watch::Receiver<SessionObservation>,
    mut name: Option<String>,
    mut age: Option<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    loop {
        let Some(name_value) = (match name.take() {
            Some(n) => Some(n),
            None => prompt(input, "Name: ").await?,
        }) else {
            return Ok(false);
        };
        let Some(age_value) = (match age.take() {
            Some(a) => Some(a),
            None => prompt(input, "Age: ").await?,
        }) else {
            return Ok(false);
        };

        drop(observed.borrow_and_update());
        tx.send(UiEvent::SubjectSubmitted {
            name: name_value,
            age: age_value,
        })
        .await?;

        let view = loop {
            observed.changed().await?;
            let view = observed.borrow_and_update().clone();
            if view.status != SessionStatus::AwaitingSubject || view.intake_errors.is_some() {
                break view;
            }
        };
        match view.intake_errors {
            Some(errors) if view.status == SessionStatus::AwaitingSubject => {
                eprintln!("{errors}");
            }
            _ => return Ok(true),
        }
    }
}

pub async fn execute(
    storage: &Storage,
    band: AgeBand,
    name: Option<String>,
    age: Option<String>,
    config: SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = AssessmentRunner::new(
        band,
        Arc::clone(&storage.patients),
        Arc::clone(&storage.results),
        config,
    )?;
    let mut observed = runner.subscribe();
    let (tx, rx) = mpsc::channel(16);
    let session = tokio::spawn(runner.run(rx));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("{} assessment", band.label());
    if intake(&mut input, &tx, &mut observed, name, age).await? {
        let mut screen = Screen::default();
        screen.render(&observed.borrow_and_update().clone());
        loop {
            tokio::select! {
                changed = observed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view = observed.borrow_and_update().clone();
                    screen.render(&view);
                    if view.is_completed() {
                        break;
                    }
                }
                line = input.next_line() => match line?.as_deref().map(parse_command) {
                    None | Some(Command::Quit) => {
                        let _ = tx.send(UiEvent::Exit).await;
                        break;
                    }
                    Some(Command::Answer(index)) => tx.send(UiEvent::OptionSelected(index)).await?,
                    Some(Command::Unknown) => eprintln!("Enter an option number or q."),
                },
            }
        }
    } else {
        let _ = tx.send(UiEvent::Exit).await;
    }
    drop(tx);

    match session.await?? {
        RunOutcome::Completed(completion) => {
            let summary = &completion.summary;
            println!();
            println!(
                "Score: {}/{} ({:.0}%)",
                summary.score, summary.total_questions, summary.percentage
            );
            for (category, tally) in &summary.categories {
                println!("  {:<16} {}/{}", category.as_str(), tally.correct, tally.total);
            }
            match completion.saved().await {
                Ok(id) => println!("Saved as result {id}."),
                Err(err) => eprintln!("Result not saved: {err}"),
            }
        }
        RunOutcome::Exited => println!("Session ended. Nothing was saved."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_based_answers_and_quit() {
        assert_eq!(parse_command(" 2 "), Command::Answer(1));
        assert_eq!(parse_command("Q"), Command::Quit);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("0"), Command::Unknown);
        assert_eq!(parse_command("two"), Command::Unknown);
    }
}
