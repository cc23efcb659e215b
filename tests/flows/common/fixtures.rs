#![allow(dead_code)]
use std::net::Ipv4Addr;
use std::str::FromStr;

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};

/// Classic UDP payload ceiling.
pub const MAX_UDP: usize = 512;

/// A-record query for `name`, with a fresh id.
pub fn make_request(name: &str) -> Message {
    let mut query = Query::new();
    query.set_name(Name::from_str(name).unwrap());
    query.set_query_type(RecordType::A);
    query.set_query_class(DNSClass::IN);

    let mut request = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    request.set_recursion_desired(true);
    request.add_query(query);
    request
}

/// Response to `request` carrying one A record per address.
pub fn make_reply(request: &Message, addrs: &[Ipv4Addr], ttl: u32) -> Message {
    let name = request.queries()[0].name().clone();
    let mut reply = Message::new(request.id(), MessageType::Response, OpCode::Query);
    for addr in addrs {
        reply.add_answer(Record::from_rdata(name.clone(), ttl, RData::A(A::from(*addr))));
    }
    reply
}

/// Sorted A-record addresses of a message's answer section.
pub fn answer_addrs(message: &Message) -> Vec<Ipv4Addr> {
    let mut addrs: Vec<Ipv4Addr> = message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::A(a) => Some(a.0),
            _ => None,
        })
        .collect();
    addrs.sort();
    addrs
}
