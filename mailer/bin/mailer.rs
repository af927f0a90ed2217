#[cfg(not(unix))]
compile_error!("Only unix is currently supported");

use mailer_common::{Config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Unable to load configuration: {e}");
    })?;

    mailer::Mailer::new(config)?.run().await
}
