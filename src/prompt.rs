use anyhow::Result;
use colored::*;
use std::io::{self, BufRead, Write};

pub trait Prompt {
    /// Ask a yes/no question. Anything but an explicit yes counts as no.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Reads answers from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        print!("{} {} ", "?".cyan().bold(), format!("{} (y/n) [n]", question).cyan());
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(is_yes(&input))
    }
}

/// Answers yes to everything (`--yes`).
pub struct AssumeYes;

impl Prompt for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        println!("{} {} {}", "?".cyan().bold(), question.cyan(), "y".bold());
        Ok(true)
    }
}

pub fn is_yes(input: &str) -> bool {
    let ans = input.trim().to_lowercase();
    ans == "y" || ans == "yes"
}

#[cfg(test)]
pub mod scripted {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays fixed answers and records the questions asked.
    pub struct ScriptedPrompt {
        answers: RefCell<VecDeque<bool>>,
        asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub fn new(answers: &[bool]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().copied().collect()),
                asked: RefCell::new(Vec::new()),
            }
        }

        pub fn asked(&self) -> Vec<String> {
            self.asked.borrow().clone()
        }
    }

    impl Prompt for ScriptedPrompt {
        fn confirm(&self, question: &str) -> Result<bool> {
            self.asked.borrow_mut().push(question.to_string());
            Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
        }
    }
}
