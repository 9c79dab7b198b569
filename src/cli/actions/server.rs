use crate::{
    api,
    cli::{actions::Action, globals::GlobalArgs},
};
use anyhow::{anyhow, Result};
use secrecy::ExposeSecret;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            let mut dsn = Url::parse(&dsn)?;

            // An explicit --db-password wins over the one embedded in the DSN
            if !globals.db_password.expose_secret().is_empty() {
                dsn.set_password(Some(globals.db_password.expose_secret()))
                    .map_err(|()| anyhow!("Error setting password"))?;
            }

            api::new(port, dsn.to_string(), globals).await?;
        }
    }

    Ok(())
}
