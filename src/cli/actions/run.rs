use crate::cli::actions::{rate_limit, resolve, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Resolve(args) => resolve::execute(&args),
        Action::RateLimit(args) => rate_limit::execute(args).await,
    }
}
