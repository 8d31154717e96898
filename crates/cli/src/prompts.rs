use std::io::{self, IsTerminal, Write};

use stagecraft_lib::prompt::{Decision, Prompter};

/// Asks on stderr and reads the answer from stdin.
///
/// Falls back to each gate's default when `--no-prompt` is given or either
/// stream is not a terminal.
pub struct TerminalPrompter {
  interactive: bool,
}

impl TerminalPrompter {
  pub fn new(no_prompt: bool) -> Self {
    Self {
      interactive: !no_prompt && io::stdin().is_terminal() && io::stderr().is_terminal(),
    }
  }

  fn ask(&self, decision: &Decision) -> io::Result<bool> {
    let default = decision.default_answer();
    let hint = if default { "[Y/n]" } else { "[y/N]" };

    let mut stderr = io::stderr();
    write!(stderr, "{} {} ", decision.message, hint)?;
    stderr.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_answer(&input, default))
  }
}

impl Prompter for TerminalPrompter {
  fn confirm(&self, decision: &Decision) -> bool {
    if !self.interactive {
      return decision.default_answer();
    }
    self.ask(decision).unwrap_or_else(|_| decision.default_answer())
  }
}

fn parse_answer(input: &str, default: bool) -> bool {
  match input.trim().to_ascii_lowercase().as_str() {
    "y" | "yes" => true,
    "n" | "no" => false,
    _ => default,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stagecraft_lib::prompt::DecisionPoint;

  #[test]
  fn empty_answer_takes_default() {
    assert!(parse_answer("\n", true));
    assert!(!parse_answer("", false));
  }

  #[test]
  fn explicit_answers_override_default() {
    assert!(parse_answer("Yes\n", false));
    assert!(!parse_answer(" n ", true));
  }

  #[test]
  fn no_prompt_answers_with_defaults() {
    let prompter = TerminalPrompter::new(true);
    assert!(prompter.confirm(&Decision::new(DecisionPoint::PolicyChange, "apply?")));
    assert!(!prompter.confirm(&Decision::new(DecisionPoint::DeleteRole, "delete?")));
  }
}
