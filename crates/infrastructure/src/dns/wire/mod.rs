//! Connector-side DNS wire format on top of `hickory_proto::op::Message`.
//!
//! Queries are decoded in full but only the first question is kept.
//! Responses echo that question and carry A/AAAA answers under its name.

pub mod query;
pub mod response;

pub use query::{parse_query, ParsedQuery, Question};
pub use response::{build_response, ANSWER_TTL};
