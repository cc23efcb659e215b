//! Reply assembly helpers.
//!
//! Served replies are always built fresh for the inbound request rather than
//! handing out the stored message, so no caller ever observes cache-owned
//! state.

use hickory_proto::op::{Message, MessageType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use hickory_proto::ProtoError;

/// Start a response stamped for `request`: same id and opcode, question
/// echoed back, recursion-desired carried over.
pub(crate) fn response_for(request: &Message) -> Message {
    let mut reply = Message::new(request.id(), MessageType::Response, request.op_code());
    reply.set_recursion_desired(request.recursion_desired());
    for query in request.queries() {
        reply.add_query(query.clone());
    }
    reply
}

/// Marker response telling the client to retry over a roomier transport.
pub(crate) fn truncated_reply(request: &Message) -> Message {
    let mut reply = response_for(request);
    reply.set_truncated(true);
    reply
}

/// Wire-format length of a message, used to decide truncation at serve time.
pub(crate) fn serialized_len(message: &Message) -> Result<usize, ProtoError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message.emit(&mut encoder)?;
    Ok(buf.len())
}
