pub mod rate_limit;
pub mod resolve;

// The match over actions lives in `run` so this module stays a plain list.
mod run;

#[derive(Debug)]
pub enum Action {
    Resolve(resolve::Args),
    RateLimit(rate_limit::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
