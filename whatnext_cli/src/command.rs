use std::str::FromStr;

use thiserror::Error;
use whatnext_core::data::{ActivityId, CategoryId, UserId};

/// One line of user input.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    Categories,
    Activities,
    Select(CategoryId),
    Pick,
    AddCategory { name: String, public: bool },
    RenameCategory { id: CategoryId, name: String },
    DeleteCategory(CategoryId),
    AddActivity { name: String, url: Option<String>, public: bool },
    EditActivity { id: ActivityId, name: String, url: Option<String> },
    DeleteActivity(ActivityId),
    Hide(CategoryId),
    Unhide(CategoryId),
    Login(UserId),
    Logout,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Type a command, or `help` to list them.")]
    Empty,
    #[error("Unknown command `{0}`. Type `help` to list the commands.")]
    UnknownCommand(String),
    #[error("Missing {0}.")]
    MissingArgument(&'static str),
    #[error("`{0}` is not a valid ID.")]
    InvalidId(String),
}

pub const HELP: &str = "\
categories                      list visible categories
activities                      list activities of the selected category
select <id>                     select a category
pick                            give me the next activity
add-category <name> [--public]  create a category
rename-category <id> <name>     rename a category
delete-category <id>            delete a category and its activities
add-activity <name> [url] [--public]
                                add an activity to the selected category
edit-activity <id> <name> [url] change an activity
delete-activity <id>            delete an activity
hide <id> / unhide <id>         hide or unhide a public category
login <user> / logout           switch user
quit                            leave";

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let command = match verb {
            "" => return Err(ParseError::Empty),
            "categories" | "c" => Command::Categories,
            "activities" | "a" => Command::Activities,
            "select" => Command::Select(CategoryId(parse_id(rest)?)),
            "pick" | "next" => Command::Pick,
            "add-category" => {
                let (words, public) = take_flag(rest, "--public");
                Command::AddCategory { name: required(&words, "category name")?, public }
            }
            "rename-category" => {
                let (id, name) = split_id(rest)?;
                Command::RenameCategory { id: CategoryId(id), name: required(name, "category name")? }
            }
            "delete-category" => Command::DeleteCategory(CategoryId(parse_id(rest)?)),
            "add-activity" => {
                let (words, public) = take_flag(rest, "--public");
                let (name, url) = split_url(&words);
                Command::AddActivity { name: required(&name, "activity name")?, url, public }
            }
            "edit-activity" => {
                let (id, rest) = split_id(rest)?;
                let (name, url) = split_url(rest);
                Command::EditActivity { id: ActivityId(id), name: required(&name, "activity name")?, url }
            }
            "delete-activity" => Command::DeleteActivity(ActivityId(parse_id(rest)?)),
            "hide" => Command::Hide(CategoryId(parse_id(rest)?)),
            "unhide" => Command::Unhide(CategoryId(parse_id(rest)?)),
            "login" => Command::Login(UserId::from(required(rest, "user")?)),
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

fn required(value: &str, what: &'static str) -> Result<String, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ParseError::MissingArgument(what))
    } else {
        Ok(value.to_string())
    }
}

fn parse_id(value: &str) -> Result<u64, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::MissingArgument("ID"));
    }
    value.parse().map_err(|_| ParseError::InvalidId(value.to_string()))
}

/// Splits a leading ID off the arguments.
fn split_id(rest: &str) -> Result<(u64, &str), ParseError> {
    match rest.split_once(char::is_whitespace) {
        Some((id, rest)) => Ok((parse_id(id)?, rest.trim())),
        None => Ok((parse_id(rest)?, "")),
    }
}

/// Removes every occurrence of `flag` from the words, reporting whether there
/// was one.
fn take_flag(rest: &str, flag: &str) -> (String, bool) {
    let mut found = false;
    let words: Vec<&str> = rest
        .split_whitespace()
        .filter(|word| {
            let is_flag = *word == flag;
            found |= is_flag;
            !is_flag
        })
        .collect();
    (words.join(" "), found)
}

/// Treats a trailing word that looks like a link as the url.
fn split_url(words: &str) -> (String, Option<String>) {
    match words.rsplit_once(char::is_whitespace) {
        Some((name, last)) if last.contains("://") => (name.trim().to_string(), Some(last.to_string())),
        None if words.contains("://") => (String::new(), Some(words.to_string())),
        _ => (words.trim().to_string(), None),
    }
}
