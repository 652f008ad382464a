pub mod server;

mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// # Errors
    /// Returns an error if the gate fails to bind or stops with an error.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
