//! Console helpers for the demos.

use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub const RESET: &str = "\x1B[0m";
pub const RED: &str = "\x1B[31m";
pub const GREEN: &str = "\x1B[32m";
pub const WHITE: &str = "\x1B[37m";
pub const BRIGHT_BLUE: &str = "\x1B[94m";

pub fn colored(color: &str, text: &str) -> String {
    format!("{}{}{}", color, text, RESET)
}

pub fn print_red(text: &str) {
    println!("{}", colored(RED, text));
}

pub fn print_green(text: &str) {
    println!("{}", colored(GREEN, text));
}

pub fn print_white(text: &str) {
    println!("{}", colored(WHITE, text));
}

pub fn print_blue(text: &str) {
    println!("{}", colored(BRIGHT_BLUE, text));
}

/// Reads lines from stdin behind a colored prompt until Ctrl+D.
pub struct Prompt {
    text: String,
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub fn show_help(&self) {
        print_white("(Enter text at the prompt. Use Ctrl+D to exit)\n");
    }

    pub fn show(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", colored(BRIGHT_BLUE, &self.text))?;
        stdout.flush()
    }

    /// Shows the prompt and waits for a line. `None` at end of input.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.show()?;
        let line = self.lines.next_line().await?;
        if line.is_none() {
            println!();
        }
        Ok(line.map(|line| line.trim().to_string()))
    }
}
