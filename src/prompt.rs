//! Interactive prompts: yes/no confirmations and the numbered menu.
//!
//! Answers are accepted in English and Russian, case- and
//! whitespace-insensitive, with a configurable default for empty input.
//! `--assume-yes` bypasses stdin entirely for unattended runs.
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

const AFFIRMATIVE: [&str; 4] = ["y", "yes", "д", "да"];
const NEGATIVE: [&str; 4] = ["n", "no", "н", "нет"];

/// How many garbage answers we tolerate before taking the default.
const MAX_ATTEMPTS: usize = 3;

/// Top-level menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Install,
    Exit,
}

/// Parse a single answer line. Empty input takes the default; an
/// unrecognized answer is `None` so the caller can re-ask.
pub fn parse_answer(input: &str, default: bool) -> Option<bool> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return Some(default);
    }
    if AFFIRMATIVE.contains(&normalized.as_str()) {
        return Some(true);
    }
    if NEGATIVE.contains(&normalized.as_str()) {
        return Some(false);
    }
    None
}

/// Ask a yes/no question on stdout/stdin.
pub fn confirm(question: &str, default: bool, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        tracing::info!("--assume-yes: answering yes to \"{question}\"");
        return Ok(true);
    }
    let stdin = io::stdin();
    confirm_from(&mut stdin.lock(), question, default)
}

fn confirm_from<R: BufRead>(reader: &mut R, question: &str, default: bool) -> Result<bool> {
    let suffix = if default { "[Y/n]" } else { "[y/N]" };
    for _ in 0..MAX_ATTEMPTS {
        print!("{question} {suffix}: ");
        io::stdout().flush().context("flush prompt")?;
        let mut line = String::new();
        let read = reader.read_line(&mut line).context("read answer")?;
        if read == 0 {
            // stdin closed; fall back to the default.
            return Ok(default);
        }
        if let Some(answer) = parse_answer(&line, default) {
            return Ok(answer);
        }
        println!("Please answer yes or no (да/нет).");
    }
    Ok(default)
}

/// Present the numbered menu and read a selection.
pub fn menu(assume_yes: bool) -> Result<MenuChoice> {
    if assume_yes {
        tracing::info!("--assume-yes: selecting install");
        return Ok(MenuChoice::Install);
    }
    let stdin = io::stdin();
    menu_from(&mut stdin.lock())
}

fn menu_from<R: BufRead>(reader: &mut R) -> Result<MenuChoice> {
    println!();
    println!("  1) Install / update the stack");
    println!("  2) Exit");
    for _ in 0..MAX_ATTEMPTS {
        print!("Select an option [1-2]: ");
        io::stdout().flush().context("flush menu")?;
        let mut line = String::new();
        let read = reader.read_line(&mut line).context("read menu selection")?;
        if read == 0 {
            return Ok(MenuChoice::Exit);
        }
        match line.trim() {
            "1" => return Ok(MenuChoice::Install),
            "2" => return Ok(MenuChoice::Exit),
            _ => println!("Please enter 1 or 2."),
        }
    }
    Ok(MenuChoice::Exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn english_and_russian_forms() {
        for yes in ["y", "YES", " Да ", "д", "yes"] {
            assert_eq!(parse_answer(yes, false), Some(true), "{yes}");
        }
        for no in ["n", "No", "НЕТ", "н", " no "] {
            assert_eq!(parse_answer(no, true), Some(false), "{no}");
        }
    }

    #[test]
    fn empty_input_takes_default() {
        assert_eq!(parse_answer("", true), Some(true));
        assert_eq!(parse_answer("  \n", false), Some(false));
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert_eq!(parse_answer("maybe", true), None);
        assert_eq!(parse_answer("yess", false), None);
    }

    #[test]
    fn confirm_reasks_then_falls_back_to_default() {
        let mut input = Cursor::new("what\nhuh\nnope-not-valid\n");
        let answer = confirm_from(&mut input, "Proceed?", false).unwrap();
        assert!(!answer);
    }

    #[test]
    fn confirm_accepts_second_attempt() {
        let mut input = Cursor::new("bogus\nда\n");
        let answer = confirm_from(&mut input, "Proceed?", false).unwrap();
        assert!(answer);
    }

    #[test]
    fn closed_stdin_takes_default() {
        let mut input = Cursor::new("");
        assert!(confirm_from(&mut input, "Proceed?", true).unwrap());
        assert!(!confirm_from(&mut input, "Proceed?", false).unwrap());
    }

    #[test]
    fn menu_selection() {
        let mut input = Cursor::new("1\n");
        assert_eq!(menu_from(&mut input).unwrap(), MenuChoice::Install);
        let mut input = Cursor::new("x\n2\n");
        assert_eq!(menu_from(&mut input).unwrap(), MenuChoice::Exit);
        let mut input = Cursor::new("");
        assert_eq!(menu_from(&mut input).unwrap(), MenuChoice::Exit);
    }
}
