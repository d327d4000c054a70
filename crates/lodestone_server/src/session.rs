use lodestone_shared::connection::ConnectionContext;

/// A logged-in client as the synchronizer sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub id: u64,
    pub username: String,
    pub context: ConnectionContext,
}

impl Connection {
    pub fn new(id: u64, username: impl Into<String>, context: ConnectionContext) -> Self {
        Self {
            id,
            username: username.into(),
            context,
        }
    }
}
