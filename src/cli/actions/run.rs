use crate::cli::actions::Action;
use crate::collector::loader;
use crate::exporter;
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter fails to start
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run { settings } => {
            let specs = loader::load_all(&settings);
            exporter::new(settings, specs).await?;
        }
    }

    Ok(())
}
