//! Interactive session: one `CatalogSession` kept alive across commands.

use std::sync::Arc;

use anyhow::Result;
use client_core::{view::PaginationView, CatalogSession, SessionSnapshot};
use shared::domain::BookId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::render;

const HELP: &str = "\
commands:
  search <text>   search titles, authors and ISBNs (page resets to 1)
  clear           drop the search text
  page <n>        jump to page n
  next | prev     move one page
  show <id>       print one book
  borrow <id>     mark a book as borrowed
  return <id>     mark a book as available again
  delete <id>     remove a book
  retry           repeat the last search
  help            this text
  quit            leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Search(String),
    Page(u32),
    Next,
    Prev,
    Show(BookId),
    Borrow(BookId),
    Return(BookId),
    Delete(BookId),
    Retry,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let id = |what: &str| {
        if rest.is_empty() {
            Err(format!("usage: {what} <id>"))
        } else {
            Ok(BookId::from(rest))
        }
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "search" | "s" => ShellCommand::Search(rest.to_string()),
        "clear" => ShellCommand::Search(String::new()),
        "page" | "p" => ShellCommand::Page(
            rest.parse()
                .ok()
                .filter(|page| *page > 0)
                .ok_or_else(|| "usage: page <n> (n >= 1)".to_string())?,
        ),
        "next" | "n" => ShellCommand::Next,
        "prev" => ShellCommand::Prev,
        "show" => ShellCommand::Show(id("show")?),
        "borrow" => ShellCommand::Borrow(id("borrow")?),
        "return" => ShellCommand::Return(id("return")?),
        "delete" | "rm" => ShellCommand::Delete(id("delete")?),
        "retry" => ShellCommand::Retry,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(command))
}

pub async fn run(session: Arc<CatalogSession>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    session.fetch(None).await;
    print_snapshot(&mut stdout, &session.snapshot().await).await?;

    loop {
        stdout.write_all(b"catalog> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };
        debug!(?command, "shell: command");

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                stdout.write_all(format!("{HELP}\n").as_bytes()).await?;
                continue;
            }
            ShellCommand::Show(id) => {
                let text = match session.book(&id).await {
                    Ok(book) => render::book_detail(&book),
                    Err(err) => render::error_banner(&err.to_string()),
                };
                stdout.write_all(format!("{text}\n").as_bytes()).await?;
                continue;
            }
            ShellCommand::Search(query) => {
                session.search(query).await;
            }
            ShellCommand::Page(page) => {
                session.change_page(page).await;
            }
            ShellCommand::Next | ShellCommand::Prev => {
                let snapshot = session.snapshot().await;
                let pagination = PaginationView::from_page(&snapshot.current_page);
                let target = if command == ShellCommand::Next {
                    pagination.next_page()
                } else {
                    pagination.previous_page()
                };
                match target {
                    Some(page) => {
                        session.change_page(page).await;
                    }
                    None => {
                        stdout.write_all(b"no more pages in that direction\n").await?;
                        continue;
                    }
                }
            }
            // Mutation errors are already recorded in the session and shown
            // in the banner below.
            ShellCommand::Borrow(id) => {
                let _ = session.borrow_book(&id).await;
            }
            ShellCommand::Return(id) => {
                let _ = session.return_book(&id).await;
            }
            ShellCommand::Delete(id) => {
                let _ = session.delete_book(&id).await;
            }
            ShellCommand::Retry => {
                session.retry().await;
            }
        }

        print_snapshot(&mut stdout, &session.snapshot().await).await?;
    }

    Ok(())
}

async fn print_snapshot(stdout: &mut tokio::io::Stdout, snapshot: &SessionSnapshot) -> Result<()> {
    stdout
        .write_all(format!("{}\n", render::snapshot(snapshot)).as_bytes())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbs_and_arguments() {
        assert_eq!(
            parse_command("search  the left hand "),
            Ok(Some(ShellCommand::Search("the left hand".to_string())))
        );
        assert_eq!(parse_command("clear"), Ok(Some(ShellCommand::Search(String::new()))));
        assert_eq!(parse_command("page 3"), Ok(Some(ShellCommand::Page(3))));
        assert_eq!(
            parse_command("BORROW 42"),
            Ok(Some(ShellCommand::Borrow(BookId::from("42"))))
        );
        assert_eq!(parse_command("q"), Ok(Some(ShellCommand::Quit)));
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("page 0").is_err());
        assert!(parse_command("page two").is_err());
        assert!(parse_command("return").is_err());
        assert!(parse_command("lend 4").is_err());
    }
}
