use super::query::{ParsedQuery, Question};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record};
use natc_domain::DomainError;
use std::net::IpAddr;

/// TTL on every synthetic or passed-through answer.
pub const ANSWER_TTL: u32 = 5;

/// Builds the response to `query`, echoing only its first question.
///
/// QR and AA are set, opcode and RD copied from the query. Every answer
/// is written; the whole message is assumed to fit one datagram.
pub fn build_response(
    query: &ParsedQuery,
    question: &Question,
    rcode: ResponseCode,
    answers: &[IpAddr],
) -> Result<Vec<u8>, DomainError> {
    let mut message = Message::response(query.id, query.op_code);
    message
        .set_recursion_desired(query.recursion_desired)
        .set_authoritative(true)
        .set_response_code(rcode)
        .add_query(question.query.clone());

    let name = question.query.name();
    for addr in answers {
        let rdata = match addr {
            IpAddr::V4(v4) => RData::A(A(*v4)),
            IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
        };
        message.add_answer(Record::from_rdata(name.clone(), ANSWER_TTL, rdata));
    }

    message
        .to_vec()
        .map_err(|e| DomainError::MalformedMessage(format!("encoding response: {}", e)))
}
