use clap::Subcommand;
use std::sync::Arc;

use crate::storage::{User, UserStore};

/// User management subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// List all users
    List,

    /// Show user details
    Show {
        /// Exact, case-sensitive username
        username: String,
    },
}

impl UserCommands {
    /// Execute the user command
    pub async fn execute(self, user_store: Arc<dyn UserStore>) -> anyhow::Result<()> {
        match self {
            UserCommands::List => {
                let users = user_store.list().await?;
                print!("{}", render_user_table(&users));
            }

            UserCommands::Show { username } => match user_store.find_by_username(&username).await? {
                Some(user) => print!("{}", render_user_details(&user)),
                None => anyhow::bail!("No user named {}", username),
            },
        }

        Ok(())
    }
}

fn render_user_table(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.\n".to_string();
    }

    let mut out = format!("{:<36} {:<20} {:<30} {:<20}\n", "ID", "Username", "Email", "Created");
    out.push_str(&"-".repeat(109));
    out.push('\n');

    for user in users {
        out.push_str(&format!(
            "{:<36} {:<20} {:<30} {:<20}\n",
            user.id,
            truncate(&user.username, 18),
            truncate(&user.email, 28),
            user.created_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    out
}

fn render_user_details(user: &User) -> String {
    format!(
        "User Details:\n  ID:       {}\n  Username: {}\n  Email:    {}\n  Created:  {}\n  Updated:  {}\n",
        user.id, user.username, user.email, user.created_at, user.updated_at
    )
}

/// Truncate string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
