//! Mapping between `natc_domain::RecordType` and `hickory_proto::rr::RecordType`.
//!
//! Both sides are total over the 16-bit type code, so the conversion goes
//! through the numeric value.

use hickory_proto::rr::RecordType as HickoryRecordType;
use natc_domain::RecordType;

pub struct RecordTypeMapper;

impl RecordTypeMapper {
    pub fn to_hickory(record_type: &RecordType) -> HickoryRecordType {
        HickoryRecordType::from(record_type.to_u16())
    }

    pub fn from_hickory(hickory_type: HickoryRecordType) -> RecordType {
        RecordType::from_u16(u16::from(hickory_type))
    }
}
