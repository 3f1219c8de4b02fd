use crate::context::Context;
use crate::error::Error;
use crate::response::Response;

/// A JSON:API extension, identified by its URI. An extension is active for a
/// request when the client names it in `Content-Type` and/or `Accept`; active
/// extensions run before routing and may answer the request themselves.
pub trait Extension: Send + Sync {
    fn uri(&self) -> &str;

    fn handle(&self, _ctx: &Context<'_>) -> Result<Option<Response>, Error> {
        Ok(None)
    }
}
