use std::ops::BitOr;
use std::time::{Duration, Instant};

use hickory_proto::op::Message;
use hickory_proto::rr::Record;
use tracing::{debug, warn};
use weftdns_domain::CacheError;

use super::key::CacheKey;
use super::reply;

/// A `put` with this TTL derives the validity window from the reply's answer
/// records instead.
pub(crate) const NULL_TTL: u32 = 0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Someone is waiting for the resolution
    Pending = 0,
    /// Resolved
    Resolved = 1,
}

/// Extra flags stored with an entry. Open 8-bit set; only bit 0 is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags(u8);

impl EntryFlags {
    pub const NONE: EntryFlags = EntryFlags(0);

    /// Not found in the local network; cached so we can skip another local
    /// lookup for some time.
    pub const NO_LOCAL_REPLIES: EntryFlags = EntryFlags(1 << 0);

    #[inline]
    pub fn contains(self, other: EntryFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        EntryFlags(bits)
    }
}

impl BitOr for EntryFlags {
    type Output = EntryFlags;

    fn bitor(self, rhs: EntryFlags) -> EntryFlags {
        EntryFlags(self.0 | rhs.0)
    }
}

/// One cached result, or a placeholder for a resolution in flight.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    key: CacheKey,
    status: EntryStatus,
    flags: EntryFlags,

    reply: Option<Message>,
    reply_len: usize,

    valid_until: Instant,
    put_time: Instant,

    /// Position in the expiration index, `None` while not index-resident.
    /// Maintained by `ExpirationIndex`, never by this module.
    heap_pos: Option<usize>,
}

impl CacheEntry {
    /// New pending placeholder. It self-expires after `pending_ttl` so a
    /// resolution that never arrives cannot park the key forever.
    pub(crate) fn pending(key: CacheKey, now: Instant, pending_ttl: Duration) -> Self {
        Self {
            key,
            status: EntryStatus::Pending,
            flags: EntryFlags::NONE,
            reply: None,
            reply_len: 0,
            valid_until: now + pending_ttl,
            put_time: now,
            heap_pos: None,
        }
    }

    pub(crate) fn key(&self) -> &CacheKey {
        &self.key
    }

    pub(crate) fn reply_len(&self) -> usize {
        self.reply_len
    }

    pub(crate) fn valid_until(&self) -> Instant {
        self.valid_until
    }

    pub(crate) fn heap_pos(&self) -> Option<usize> {
        self.heap_pos
    }

    pub(crate) fn set_heap_pos(&mut self, pos: Option<usize>) {
        self.heap_pos = pos;
    }

    /// The boundary is inclusive: an entry whose window ends exactly at `now`
    /// is already expired, so two callers racing the expiry instant agree.
    pub(crate) fn has_expired(&self, now: Instant) -> bool {
        self.valid_until <= now
    }

    /// Store a resolution result, transitioning Pending entries to Resolved
    /// or overwriting a previous result. Returns whether `valid_until`
    /// changed, i.e. whether the expiration index needs repositioning.
    pub(crate) fn set_reply(
        &mut self,
        reply: Option<&Message>,
        ttl: u32,
        flags: EntryFlags,
        now: Instant,
    ) -> bool {
        let prev_valid_until = match self.status {
            EntryStatus::Resolved => {
                if let Some(reply) = reply {
                    debug!(id = reply.id(), "replacing response in cache");
                }
                Some(self.valid_until)
            }
            EntryStatus::Pending => None,
        };

        self.status = EntryStatus::Resolved;
        self.flags = flags;
        self.put_time = now;

        if ttl != NULL_TTL {
            self.valid_until = now + Duration::from_secs(u64::from(ttl));
        } else if let Some(reply) = reply {
            // the entry cannot outlive its shortest-lived answer record; a
            // zero-TTL record pins the window to `now` and the entry expires
            // on its next access
            let min_ttl = reply.answers().iter().map(Record::ttl).min().unwrap_or(u32::MAX);
            self.valid_until = now + Duration::from_secs(u64::from(min_ttl));
        }

        if let Some(reply) = reply {
            self.reply_len = match reply::serialized_len(reply) {
                Ok(len) => len,
                Err(error) => {
                    warn!(id = reply.id(), %error, "failed to measure reply length");
                    0
                }
            };
            self.reply = Some(reply.clone());
        }

        match prev_valid_until {
            Some(prev) => prev != self.valid_until,
            None => true,
        }
    }

    /// Build a copy of the stored reply shaped for this particular request,
    /// with answer lifetimes rewritten to what remains of them.
    ///
    /// `Ok(None)` asks the caller to wait or start a new resolution;
    /// `Err(NoLocalReplies)` is the cached negative marker.
    pub(crate) fn served_reply(
        &self,
        request: &Message,
        max_len: usize,
        now: Instant,
    ) -> Result<Option<Message>, CacheError> {
        if self.status != EntryStatus::Resolved {
            return Ok(None);
        }

        if self.has_expired(now) {
            return Ok(None);
        }

        if self.flags.contains(EntryFlags::NO_LOCAL_REPLIES) {
            return Err(CacheError::NoLocalReplies);
        }

        if self.reply_len >= max_len {
            debug!(
                id = request.id(),
                reply_len = self.reply_len,
                max_len,
                "returning truncated response"
            );
            return Ok(Some(reply::truncated_reply(request)));
        }

        let Some(stored) = &self.reply else {
            return Ok(None);
        };

        // A record's remaining lifetime can hit zero slightly before
        // valid_until does (the two are rounded differently); serve nothing
        // rather than a partially-expired answer set.
        let passed_secs = now.saturating_duration_since(self.put_time).as_secs() as u32;
        let mut answers = Vec::with_capacity(stored.answers().len());
        for record in stored.answers() {
            let ttl = record.ttl();
            if passed_secs >= ttl {
                return Ok(None);
            }
            let mut record = record.clone();
            record.set_ttl(ttl - passed_secs);
            answers.push(record);
        }

        // spread load across equally valid answers
        fastrand::shuffle(&mut answers);

        let mut served = reply::response_for(request);
        served.set_response_code(stored.response_code());
        served.set_authoritative(true);
        for record in answers {
            served.add_answer(record);
        }
        for record in stored.name_servers() {
            served.add_name_server(record.clone());
        }
        for record in stored.additionals() {
            served.add_additional(record.clone());
        }

        Ok(Some(served))
    }
}
