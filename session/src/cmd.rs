//! Helpers for turning a typed [`cdp_types::Command`] into the stringly-typed `send` the core
//! actually performs, and its response back into the command's typed `Response`.

use cdp_types::{CallId, Command, CommandResponse, MethodId, Response};

use crate::error::{CdpError, Result};

/// Deserializes a raw [`Response`] into a typed [`CommandResponse`], surfacing a protocol error
/// verbatim and a missing `result`/`error` as [`CdpError::NoResponse`].
pub fn to_command_response<T: Command>(resp: Response, method: MethodId) -> Result<CommandResponse<T::Response>> {
    if let Some(result) = resp.result {
        let result = T::response_from_value(result)?;
        Ok(CommandResponse { id: resp.id, result, method })
    } else if let Some(err) = resp.error {
        Err(err.into())
    } else {
        Err(CdpError::NoResponse)
    }
}

/// Serializes a typed command into the `(method, params)` pair `Session::send` expects.
pub fn encode_command<T: Command>(cmd: &T) -> Result<(MethodId, serde_json::Value)> {
    use cdp_types::Method;
    Ok((cmd.identifier(), serde_json::to_value(cmd)?))
}
