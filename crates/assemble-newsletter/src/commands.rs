use anyhow::{Context, Result};

/// One line typed at the session prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Topic(String),
    Start(String),
    End(String),
    Count(String),
    Fetch,
    Regenerate,
    List,
    /// 1-based position as shown by `list`
    Delete(usize),
    Html,
    Preview,
    Edit,
    Server,
    Copy,
    Export,
    Scrape,
    Articles,
    Send,
    Status,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
Form:
  topic <ai|senior|forsale>   choose the newsletter section
  start <YYYY-MM-DD>          start of the date range (blank clears)
  end <YYYY-MM-DD>            end of the date range (blank clears)
  count <n>                   number of headlines to request

Headlines:
  fetch                       get headlines for the current form
  regenerate                  have the service pick new articles, then fetch
  list                        show the current headlines
  delete <n>                  remove headline n and rebuild the HTML

HTML:
  html                        print the HTML fragment
  preview                     show the fragment as rendered text
  edit                        replace the fragment (finish with a line containing only '.')
  server                      restore the markup the service supplied
  copy                        copy the fragment to the clipboard
  export                      save the section as an HTML file

Senior housing service:
  scrape                      pull new articles from the news sources
  articles                    list every stored article
  send                        send the newsletter

  status                      show form and result state
  help                        show this help
  quit                        leave";

pub fn parse_command(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "" => Command::Empty,
        "topic" => Command::Topic(required(word, rest)?),
        "start" => Command::Start(rest.to_string()),
        "end" => Command::End(rest.to_string()),
        "count" => Command::Count(required(word, rest)?),
        "fetch" | "get" => Command::Fetch,
        "regenerate" | "regen" => Command::Regenerate,
        "list" | "ls" => Command::List,
        "delete" | "del" | "rm" => {
            let position: usize = required(word, rest)?
                .parse()
                .context("Usage: delete <n> where n is a headline number from 'list'")?;
            if position == 0 {
                anyhow::bail!("Headlines are numbered from 1");
            }
            Command::Delete(position)
        }
        "html" => Command::Html,
        "preview" => Command::Preview,
        "edit" => Command::Edit,
        "server" => Command::Server,
        "copy" => Command::Copy,
        "export" | "save" => Command::Export,
        "scrape" => Command::Scrape,
        "articles" => Command::Articles,
        "send" => Command::Send,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => anyhow::bail!("Unknown command: {}. Type 'help' for the list.", other),
    };

    Ok(command)
}

fn required(word: &str, rest: &str) -> Result<String> {
    if rest.is_empty() {
        anyhow::bail!("'{}' needs a value. Type 'help' for usage.", word);
    }
    Ok(rest.to_string())
}
