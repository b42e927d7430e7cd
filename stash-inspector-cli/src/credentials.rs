//! Interactive credential collection for the CLI.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use stash_inspector_core::Credentials;

use crate::CliResult;

/// Use supplied values where present and prompt for the rest.
pub(crate) fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
) -> CliResult<Credentials> {
    let username = match non_blank(username) {
        Some(username) => username,
        None => prompt_line("Username: ")?,
    };
    if username.is_empty() {
        return Err("username is required".into());
    }
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password: ")?,
    };
    Ok(Credentials::new(username, password))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn prompt_line(prompt: &str) -> CliResult<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Read a password without echo. Piped input is read as a plain line.
fn prompt_password(prompt: &str) -> CliResult<String> {
    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    eprint!("{prompt}");
    io::stderr().flush()?;
    let result = read_hidden_line();
    eprintln!();
    result
}

fn read_hidden_line() -> CliResult<String> {
    let _guard = RawModeGuard::enable()?;
    let mut buffer = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match apply_key(&mut buffer, &key) {
            PromptKey::Continue => {}
            PromptKey::Submit => return Ok(buffer),
            PromptKey::Cancel => return Err("password entry cancelled".into()),
        }
    }
}

/// Keeps the terminal in raw mode until dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PromptKey {
    Continue,
    Submit,
    Cancel,
}

fn apply_key(buffer: &mut String, key: &KeyEvent) -> PromptKey {
    match key.code {
        KeyCode::Enter => PromptKey::Submit,
        KeyCode::Esc => PromptKey::Cancel,
        KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            PromptKey::Cancel
        }
        KeyCode::Backspace => {
            buffer.pop();
            PromptKey::Continue
        }
        KeyCode::Char(ch) => {
            buffer.push(ch);
            PromptKey::Continue
        }
        _ => PromptKey::Continue,
    }
}
