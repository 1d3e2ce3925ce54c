use anyhow::{Context, Result};
use colored::*;
use std::io::{BufRead, Write};

/// A prompt result. `Back` is the reserved "return to the previous menu" answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Value(T),
    Back,
}

pub trait Prompter {
    /// Single choice. Returns the index into `choices`.
    fn select(&mut self, title: &str, choices: &[String], back_label: &str)
    -> Result<Answer<usize>>;
    /// Several choices. Never returns an empty list; nothing picked is `Back`.
    fn multi_select(&mut self, title: &str, choices: &[String]) -> Result<Answer<Vec<usize>>>;
    /// Free text. An empty line yields `default`.
    fn text(&mut self, prompt: &str, default: &str) -> Result<Answer<String>>;
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
    fn message(&mut self, text: &str) -> Result<()>;
}

/// Line-oriented prompter over any reader/writer pair. End of input answers
/// `Back` so every menu eventually unwinds.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush().context("Failed to flush prompt output")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read user input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn print_choices(&mut self, title: &str, choices: &[String]) -> Result<()> {
        writeln!(self.output, "\n{} {}", ">".cyan(), title.bold())?;
        for (i, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {}", i + 1, choice)?;
        }
        Ok(())
    }

    fn parse_indices(raw: &str, len: usize) -> Option<Vec<usize>> {
        let mut picked = Vec::new();
        for part in raw.split([',', ' ']).filter(|p| !p.is_empty()) {
            let n: usize = part.parse().ok()?;
            if n == 0 || n > len {
                return None;
            }
            if !picked.contains(&(n - 1)) {
                picked.push(n - 1);
            }
        }
        Some(picked)
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn select(
        &mut self,
        title: &str,
        choices: &[String],
        back_label: &str,
    ) -> Result<Answer<usize>> {
        self.print_choices(title, choices)?;
        writeln!(self.output, "  {:>2}) {}", 0, back_label.dimmed())?;
        loop {
            write!(self.output, "{} ", "→".cyan())?;
            let Some(line) = self.read_line()? else {
                return Ok(Answer::Back);
            };
            if line == "0" {
                return Ok(Answer::Back);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(Answer::Value(n - 1)),
                _ => writeln!(self.output, "{} Invalid choice: '{}'", "⚠️".yellow(), line)?,
            }
        }
    }

    fn multi_select(&mut self, title: &str, choices: &[String]) -> Result<Answer<Vec<usize>>> {
        self.print_choices(title, choices)?;
        writeln!(
            self.output,
            "  {}",
            "(numbers separated by spaces or commas, empty or 0 to go back)".dimmed()
        )?;
        loop {
            write!(self.output, "{} ", "→".cyan())?;
            let Some(line) = self.read_line()? else {
                return Ok(Answer::Back);
            };
            if line.is_empty() || line == "0" {
                return Ok(Answer::Back);
            }
            match Self::parse_indices(&line, choices.len()) {
                Some(picked) if !picked.is_empty() => return Ok(Answer::Value(picked)),
                _ => writeln!(self.output, "{} Invalid selection: '{}'", "⚠️".yellow(), line)?,
            }
        }
    }

    fn text(&mut self, prompt: &str, default: &str) -> Result<Answer<String>> {
        if default.is_empty() {
            write!(self.output, "{} {} ", ">".cyan(), prompt)?;
        } else {
            write!(self.output, "{} {} [{}] ", ">".cyan(), prompt, default.dimmed())?;
        }
        Ok(match self.read_line()? {
            None => Answer::Back,
            Some(line) if line.is_empty() => Answer::Value(default.to_string()),
            Some(line) => Answer::Value(line),
        })
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        write!(self.output, "{} {} {} ", ">".cyan(), prompt, hint)?;
        Ok(match self.read_line()? {
            None => default,
            Some(line) if line.is_empty() => default,
            Some(line) => matches!(line.to_lowercase().as_str(), "y" | "yes"),
        })
    }

    fn message(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn choices() -> Vec<String> {
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    }

    #[test]
    fn test_select_retries_until_valid() {
        let mut p = prompter("9\nabc\n2\n");
        assert_eq!(p.select("Pick", &choices(), "[Back]").unwrap(), Answer::Value(1));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Invalid choice: '9'"));
    }

    #[test]
    fn test_select_back_on_zero_and_eof() {
        assert_eq!(prompter("0\n").select("Pick", &choices(), "[Back]").unwrap(), Answer::Back);
        assert_eq!(prompter("").select("Pick", &choices(), "[Back]").unwrap(), Answer::Back);
    }

    #[test]
    fn test_multi_select_parses_lists() {
        let mut p = prompter("3, 1 3\n");
        assert_eq!(p.multi_select("Pick", &choices()).unwrap(), Answer::Value(vec![2, 0]));
        assert_eq!(prompter("\n").multi_select("Pick", &choices()).unwrap(), Answer::Back);
    }

    #[test]
    fn test_text_default_and_eof() {
        assert_eq!(
            prompter("\n").text("Name", "exported_code.txt").unwrap(),
            Answer::Value("exported_code.txt".to_string())
        );
        assert_eq!(
            prompter("  out.txt \n").text("Name", "x").unwrap(),
            Answer::Value("out.txt".to_string())
        );
        assert_eq!(prompter("").text("Name", "x").unwrap(), Answer::Back);
    }

    #[test]
    fn test_confirm() {
        assert!(prompter("y\n").confirm("Sure?", false).unwrap());
        assert!(!prompter("\n").confirm("Sure?", false).unwrap());
        assert!(prompter("").confirm("Sure?", true).unwrap());
    }
}
