/// Which end of the connection we are. Decides masking in both directions.
pub trait RolePolicy: Send + Sync + 'static {
    /// Servers receive masked frames and send unmasked ones.
    const SERVER: bool;
    /// Clients mask everything they send.
    const CLIENT: bool = !Self::SERVER;
}

#[derive(Debug, Copy, Clone)]
pub struct Client;

#[derive(Debug, Copy, Clone)]
pub struct Server;

impl RolePolicy for Client {
    const SERVER: bool = false;
}

impl RolePolicy for Server {
    const SERVER: bool = true;
}

pub(crate) fn label<R: RolePolicy>() -> &'static str { if R::SERVER { "SRV" } else { "CLI" } }
