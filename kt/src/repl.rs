//! Interactive chat REPL
//!
//! A thin text loop over [`TutorService`]; all progression rules live there.

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::domain::TurnRole;
use crate::error::TutorError;
use crate::tutor::{TutorService, TutorSession};

enum SlashResult {
    Continue,
    Quit,
}

/// Interactive session for one learner and chapter
pub struct ChatRepl {
    service: TutorService,
    tutor: TutorSession,
}

impl ChatRepl {
    pub fn new(service: TutorService, tutor: TutorSession) -> Self {
        Self { service, tutor }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Bslema!");
        Ok(())
    }

    fn print_welcome(&self) {
        let session = self.tutor.session();
        println!();
        println!(
            "{} {} / {}",
            "KhirMinTaki".bright_cyan().bold(),
            session.learner_id(),
            session.chapter_id()
        );
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();

        // Replay the saved conversation
        for turn in self.tutor.turns() {
            match turn.role {
                TurnRole::User => println!("{} {}", ">".bright_green(), turn.text),
                TurnRole::Assistant => println!("{}\n", turn.text),
            }
        }
        self.print_status();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        debug!(%cmd, "handle_slash_command: called");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/progress" | "/p" => {
                self.print_status();
                SlashResult::Continue
            }
            "/plan" => {
                match self.tutor.session().study_plan() {
                    Some(plan) => println!("{}\n", plan),
                    None => println!("{}", "No study plan yet.".dimmed()),
                }
                SlashResult::Continue
            }
            "/score" => {
                match parts.get(1).and_then(|s| s.parse::<i64>().ok()) {
                    Some(score) => match self.service.submit_quiz_score(&mut self.tutor, score).await {
                        Ok(()) => println!("{} Quiz score recorded: {}", "✓".green(), score),
                        Err(e) => print_error(&e),
                    },
                    None => println!("{} Usage: /score <0-100>", "?".yellow()),
                }
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the chat", "/quit".yellow());
        println!("  {:14} Show phase and progress", "/progress".yellow());
        println!("  {:14} Show the study plan", "/plan".yellow());
        println!("  {:14} Record a quiz score", "/score N".yellow());
        println!();
    }

    fn print_status(&self) {
        let session = self.tutor.session();
        let mut status = format!("Phase: {}", session.phase());
        if let Some((asked, total)) = self.tutor.assessment_progress() {
            status.push_str(&format!("  Diagnostic: {}/{}", asked, total));
        }
        if let Some(score) = session.latest_quiz_score() {
            status.push_str(&format!("  Last quiz: {}/100", score));
        }
        println!("{}", status.dimmed());
    }

    async fn process_user_input(&mut self, input: &str) {
        match self.service.send_message(&mut self.tutor, input).await {
            Ok(reply) => {
                println!();
                println!("{}", reply.text);
                println!();
                if reply.phase_changed {
                    println!("{} Study plan ready, moving to {}", "✓".green(), reply.phase);
                }
                if reply.resume_updated {
                    println!("{}", "Course summary updated.".dimmed());
                }
            }
            Err(TutorError::ProgressNotSaved {
                source,
                reply: Some(text),
            }) => {
                println!();
                println!("{}", text);
                println!();
                println!("{} Your progress could not be saved: {}", "⚠".yellow(), source);
            }
            Err(e) => print_error(&e),
        }
    }
}

fn print_error(e: &TutorError) {
    println!("{} {}", "✗".red(), e);
    if e.is_provider_failure() {
        println!("{}", "Please try again in a moment.".dimmed());
    }
}
