mod sessions;
mod users;

pub use sessions::SessionCommands;
pub use users::UserCommands;

use clap::{Parser, Subcommand};

/// Notes Server - session-authenticated personal notes API
#[derive(Parser)]
#[command(name = "notes-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve {
        /// Keep users, notes and sessions in process memory instead of PostgreSQL
        #[arg(long)]
        in_memory: bool,
    },

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Session maintenance commands
    #[command(subcommand)]
    Sessions(SessionCommands),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_optional() {
        let cli = Cli::try_parse_from(["notes-server"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["notes-server", "serve", "--in-memory"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { in_memory: true })));
    }

    #[test]
    fn user_show_takes_a_username() {
        let cli = Cli::try_parse_from(["notes-server", "user", "show", "alice"]).unwrap();
        match cli.command {
            Some(Commands::User(UserCommands::Show { username })) => assert_eq!(username, "alice"),
            _ => panic!("expected user show"),
        }
    }
}
