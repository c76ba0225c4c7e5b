use clap::Subcommand;

use crate::auth::SessionManager;

/// Session maintenance subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Delete every expired session record now
    Purge,
}

impl SessionCommands {
    pub async fn execute(self, session_manager: &SessionManager) -> anyhow::Result<()> {
        match self {
            SessionCommands::Purge => {
                let purged = session_manager.purge_expired().await?;
                println!("Purged {} expired session(s).", purged);
            }
        }

        Ok(())
    }
}
