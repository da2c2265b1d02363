//! Serve command

use anyhow::Context;
use contact_form::{ConfigLoader, ConfigSource};
use contact_form_api::ServerState;
use std::net::SocketAddr;

pub async fn handle(
    source: ConfigSource,
    bind: SocketAddr,
    body_limit: usize,
) -> anyhow::Result<()> {
    let state = ServerState::new(ConfigLoader::new(), source)?.with_body_limit(body_limit);
    contact_form_api::serve(bind, state)
        .await
        .with_context(|| format!("serving on {bind}"))
}
