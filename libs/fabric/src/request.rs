use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::codec::Codec;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// Perform a one-off request/response against a reply endpoint
///
/// Opens a connection, sends the request, receives the response, and closes the connection.
pub async fn request<Req, Res, C>(endpoint: &Endpoint, request: &Req, codec: C) -> Result<Res>
where
    Req: Serialize,
    Res: for<'de> Deserialize<'de>,
    C: Codec,
{
    let mut channel = Channel::connect(endpoint, codec).await?;
    channel.send(request).await?;
    let response = channel.receive().await?;
    channel.close().await?;
    Ok(response)
}
