use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::Name;
use natc_domain::DomainError;

const HEADER_LEN: usize = 12;

/// First question of a query.
#[derive(Debug, Clone)]
pub struct Question {
    /// Echoed verbatim in the response.
    pub query: Query,
    /// Presentation form with a trailing dot, e.g. `"example.com."`.
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub id: u16,
    pub op_code: OpCode,
    pub recursion_desired: bool,
    /// `None` when QDCOUNT is zero.
    pub question: Option<Question>,
}

/// Decodes and validates a complete query datagram.
///
/// Responses (QR set), opcodes other than QUERY and names that point back
/// into the header are rejected. Only the first question is kept.
pub fn parse_query(buf: &[u8]) -> Result<ParsedQuery, DomainError> {
    let message = Message::from_vec(buf).map_err(|e| malformed(&e.to_string()))?;

    if message.message_type() != MessageType::Query {
        return Err(malformed("QR bit set on query"));
    }
    if message.op_code() != OpCode::Query {
        return Err(malformed(&format!(
            "unsupported opcode {:?}",
            message.op_code()
        )));
    }

    let question = match message.queries().first() {
        Some(query) => {
            reject_header_pointer(buf)?;
            Some(Question {
                domain: presentation_name(query.name())?,
                query: query.clone(),
            })
        }
        None => None,
    };

    Ok(ParsedQuery {
        id: message.id(),
        op_code: message.op_code(),
        recursion_desired: message.recursion_desired(),
        question,
    })
}

/// Builds `"label.label."` from the raw labels.
///
/// Labels must be printable ASCII without `.` or `\`, so two different wire
/// names can never share a presentation form.
fn presentation_name(name: &Name) -> Result<String, DomainError> {
    let mut domain = String::with_capacity(name.len() + 1);
    for label in name.iter() {
        if !label
            .iter()
            .all(|b| b.is_ascii_graphic() && *b != b'.' && *b != b'\\')
        {
            return Err(malformed("label is not printable ASCII"));
        }
        domain.extend(label.iter().map(|b| char::from(*b)));
        domain.push('.');
    }
    if domain.is_empty() {
        domain.push('.');
    }
    Ok(domain)
}

/// Follows the first question's name and fails on a pointer below the end
/// of the header. Runs after a successful decode, so pointers only go
/// backwards and every offset is in bounds.
fn reject_header_pointer(buf: &[u8]) -> Result<(), DomainError> {
    let mut pos = HEADER_LEN;
    for _ in 0..buf.len() {
        let Some(&len) = buf.get(pos) else {
            return Err(malformed("name runs past the datagram"));
        };
        match len {
            0 => return Ok(()),
            l if l & 0xC0 == 0xC0 => {
                let low = buf.get(pos + 1).copied().unwrap_or_default();
                let target = (usize::from(l & 0x3F) << 8) | usize::from(low);
                if target < HEADER_LEN {
                    return Err(malformed("compression pointer into header"));
                }
                pos = target;
            }
            l => pos += usize::from(l) + 1,
        }
    }
    Err(malformed("name does not terminate"))
}

fn malformed(reason: &str) -> DomainError {
    DomainError::MalformedMessage(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(id: u16, flags: u16, qd: u16, an: u16, ns: u16, ar: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        for v in [id, flags, qd, an, ns, ar] {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        buf
    }

    fn push_name(buf: &mut Vec<u8>, name: &str) {
        for label in name.split('.').filter(|l| !l.is_empty()) {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
    }

    fn simple_query(name: &str, qtype: u16) -> Vec<u8> {
        let mut buf = header(0x1234, 0x0100, 1, 0, 0, 0);
        push_name(&mut buf, name);
        buf.extend_from_slice(&qtype.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf
    }

    fn raw_name_query(name_wire: &[u8]) -> Vec<u8> {
        let mut buf = header(7, 0, 1, 0, 0, 0);
        buf.extend_from_slice(name_wire);
        buf.extend_from_slice(&[0, 1, 0, 1]);
        buf
    }

    #[test]
    fn test_parses_simple_a_query() {
        let parsed = parse_query(&simple_query("Example.COM", 1)).unwrap();

        assert_eq!(parsed.id, 0x1234);
        assert_eq!(parsed.op_code, OpCode::Query);
        assert!(parsed.recursion_desired);

        let q = parsed.question.unwrap();
        assert_eq!(q.domain, "Example.COM.");
        assert_eq!(u16::from(q.query.query_type()), 1);
        assert_eq!(u16::from(q.query.query_class()), 1);
    }

    #[test]
    fn test_zero_questions_is_not_an_error() {
        let parsed = parse_query(&header(1, 0, 0, 0, 0, 0)).unwrap();
        assert!(parsed.question.is_none());
    }

    #[test]
    fn test_root_name() {
        let parsed = parse_query(&simple_query("", 2)).unwrap();
        assert_eq!(parsed.question.unwrap().domain, ".");
    }

    #[test]
    fn test_only_first_question_is_kept() {
        let mut buf = header(9, 0, 2, 0, 0, 0);
        push_name(&mut buf, "first.example");
        buf.extend_from_slice(&[0, 1, 0, 1]);
        push_name(&mut buf, "second.example");
        buf.extend_from_slice(&[0, 28, 0, 1]);

        let q = parse_query(&buf).unwrap().question.unwrap();
        assert_eq!(q.domain, "first.example.");
    }

    #[test]
    fn test_compressed_second_question_is_accepted() {
        let mut buf = header(9, 0, 2, 0, 0, 0);
        push_name(&mut buf, "a.example");
        buf.extend_from_slice(&[0, 1, 0, 1]);
        buf.extend_from_slice(&[0xC0, 0x0C, 0, 28, 0, 1]);

        let q = parse_query(&buf).unwrap().question.unwrap();
        assert_eq!(q.domain, "a.example.");
    }

    #[test]
    fn test_distinct_binary_labels_stay_distinct_or_are_rejected() {
        let a = parse_query(&raw_name_query(b"\x01\xff\x07example\x00"));
        let b = parse_query(&raw_name_query(b"\x01\xfe\x07example\x00"));

        assert!(matches!(a, Err(DomainError::MalformedMessage(_))));
        assert!(matches!(b, Err(DomainError::MalformedMessage(_))));
    }

    #[test]
    fn test_rejects_label_with_embedded_dot() {
        let result = parse_query(&raw_name_query(b"\x03a.b\x07example\x00"));
        assert!(matches!(result, Err(DomainError::MalformedMessage(_))));
    }

    #[test]
    fn test_rejects_short_header() {
        assert!(parse_query(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_rejects_response_bit() {
        let mut buf = simple_query("example.com", 1);
        buf[2] |= 0x80;
        assert!(matches!(
            parse_query(&buf),
            Err(DomainError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_rejects_non_query_opcode() {
        for opcode in [4u8, 5] {
            let mut buf = simple_query("example.com", 1);
            buf[2] = (buf[2] & 0x87) | (opcode << 3);
            assert!(
                matches!(parse_query(&buf), Err(DomainError::MalformedMessage(_))),
                "opcode {} must be rejected",
                opcode
            );
        }
    }

    #[test]
    fn test_rejects_pointer_into_header() {
        let result = parse_query(&raw_name_query(&[0x01, b'a', 0xC0, 0x02]));
        assert!(matches!(result, Err(DomainError::MalformedMessage(_))));
    }

    #[test]
    fn test_rejects_question_count_past_buffer() {
        let mut buf = simple_query("example.com", 1);
        buf[5] = 2;
        assert!(parse_query(&buf).is_err());
    }

    #[test]
    fn test_rejects_additional_count_past_buffer() {
        let mut buf = simple_query("example.com", 1);
        buf[11] = 1;
        assert!(parse_query(&buf).is_err());
    }

    #[test]
    fn test_rejects_truncated_label() {
        let mut buf = header(1, 0, 1, 0, 0, 0);
        buf.extend_from_slice(&[5, b'a', b'b']);
        assert!(parse_query(&buf).is_err());
    }

    #[test]
    fn test_rejects_self_pointer() {
        assert!(parse_query(&raw_name_query(&[0xC0, 0x0C])).is_err());
    }

    #[test]
    fn test_rejects_forward_pointer() {
        let mut buf = header(1, 0, 1, 0, 0, 0);
        buf.extend_from_slice(&[0xC0, 0x20, 0, 1, 0, 1]);
        assert!(parse_query(&buf).is_err());
    }

    #[test]
    fn test_rejects_overlong_name() {
        let label = "a".repeat(63);
        let name = vec![label.as_str(); 5].join(".");
        assert!(parse_query(&simple_query(&name, 1)).is_err());
    }

    #[test]
    fn test_rejects_extended_label_type() {
        assert!(parse_query(&raw_name_query(&[0x41, 0x00])).is_err());
    }
}
