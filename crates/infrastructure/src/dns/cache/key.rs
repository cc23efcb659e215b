use hickory_proto::op::Query;
use hickory_proto::rr::{DNSClass, Name, RecordType};

/// Cache key: the identity of a lookup (name + record type + class).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: Name,
    pub record_type: RecordType,
    pub class: DNSClass,
}

impl CacheKey {
    #[inline]
    pub fn new(name: Name, record_type: RecordType, class: DNSClass) -> Self {
        Self {
            name,
            record_type,
            class,
        }
    }

    #[inline]
    pub fn from_query(query: &Query) -> Self {
        Self {
            name: query.name().clone(),
            record_type: query.query_type(),
            class: query.query_class(),
        }
    }
}

impl From<&Query> for CacheKey {
    fn from(query: &Query) -> Self {
        Self::from_query(query)
    }
}
