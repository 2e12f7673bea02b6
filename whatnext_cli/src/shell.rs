use std::fmt::Write as _;

use whatnext_core::{
    data::{ActivityChanges, ActivityDraft, CategoryChanges, CategoryDraft, Entity},
    CoreError, MemoryGateway, Session,
};

use crate::command::{Command, HELP};

/// What the shell should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs one command against the session and returns the text to show.
pub async fn execute(
    session: &mut Session<MemoryGateway>,
    command: Command,
) -> Result<(String, Flow), CoreError> {
    let output = match command {
        Command::Categories => list_categories(session),
        Command::Activities => list_activities(session),
        Command::Select(id) => {
            let category = session.select_category(id)?;
            format!("Selected {}.", category.name)
        }
        Command::Pick => match session.pick_next() {
            None => "Nothing to pick from yet.".to_string(),
            Some(pick) => match pick.activity {
                Some(activity) => match activity.link() {
                    Some(link) => format!("{}: {} <{link}>", pick.category.name, activity.name),
                    None => format!("{}: {}", pick.category.name, activity.name),
                },
                None => format!("{}: no activities yet.", pick.category.name),
            },
        },
        Command::AddCategory { name, public } => {
            let category = session.create_category(CategoryDraft { name, is_public: public }).await?;
            format!("Created category {} [{}].", category.name, category.id)
        }
        Command::RenameCategory { id, name } => {
            session.update_category(id, CategoryChanges::rename(name)).await?;
            "Renamed.".to_string()
        }
        Command::DeleteCategory(id) => {
            session.delete_category(id).await?;
            "Deleted the category and its activities.".to_string()
        }
        Command::AddActivity { name, url, public } => {
            let draft = ActivityDraft { name, url, is_public: public };
            let activity = session.create_activity(draft).await?;
            format!("Added activity {} [{}].", activity.name, activity.id)
        }
        Command::EditActivity { id, name, url } => {
            let changes = ActivityChanges { name: Some(name), url, is_public: None };
            session.update_activity(id, changes).await?;
            "Updated.".to_string()
        }
        Command::DeleteActivity(id) => {
            session.delete_activity(id).await?;
            "Deleted.".to_string()
        }
        Command::Hide(id) => {
            session.hide_category(id).await?;
            "Hidden.".to_string()
        }
        Command::Unhide(id) => {
            session.unhide_category(id).await?;
            "Visible again.".to_string()
        }
        Command::Login(user) => {
            let previous = session.viewer().user_id().cloned();
            session.gateway().sign_in(user);
            match session.log_in().await {
                Ok(Some(user)) => format!("Logged in as {user}."),
                Ok(None) => "Nobody is logged in.".to_string(),
                Err(err) => {
                    // keep the auth provider in line with the session's viewer
                    match previous {
                        Some(previous) => session.gateway().sign_in(previous),
                        None => session.gateway().sign_out(),
                    }
                    return Err(err);
                }
            }
        }
        Command::Logout => {
            session.gateway().sign_out();
            session.log_out().await?;
            "Logged out.".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok((String::new(), Flow::Quit)),
    };
    Ok((output, Flow::Continue))
}

fn list_categories(session: &Session<MemoryGateway>) -> String {
    if session.categories().is_empty() {
        return "No categories.".to_string();
    }
    let selected = session.selected_category().map(|c| c.id);
    let mut out = String::new();
    for category in session.categories() {
        let marker = if Some(category.id) == selected { '*' } else { ' ' };
        let scope = if category.is_shared() { "public" } else { "private" };
        let _ = writeln!(out, "{marker} [{}] {} ({scope})", category.id, category.name);
    }
    out.trim_end().to_string()
}

fn list_activities(session: &Session<MemoryGateway>) -> String {
    let mut out = String::new();
    if let Some(category) = session.selected_category() {
        let _ = writeln!(out, "Activities in {}:", category.name);
    }
    let mut any = false;
    for activity in session.listed_activities() {
        any = true;
        let category = session.category(activity.category_id).map_or("?", |c| c.name.as_str());
        let _ = match activity.link() {
            Some(link) => writeln!(out, "  [{}] {} / {} <{link}>", activity.id, category, activity.name),
            None => writeln!(out, "  [{}] {} / {}", activity.id, category, activity.name),
        };
    }
    if !any {
        out.push_str("No activities.");
    }
    out.trim_end().to_string()
}
