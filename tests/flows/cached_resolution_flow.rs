//! Cached Resolution Flow Test
//!
//! Drives the full lifecycle the proxy runs the cache through:
//! Query → miss (placeholder) → resolver put → hit → expiry → retry

mod common;
use common::{answer_addrs, make_reply, make_request, MAX_UDP};

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use weftdns_domain::{CacheError, Config};
use weftdns_infrastructure::dns::{CacheMaintainer, EntryFlags, ResponseCache};

#[test]
fn test_miss_pending_put_hit_expire_cycle() {
    let now = Instant::now();
    let cache = ResponseCache::new(128).unwrap();
    let request = make_request("registry.weft.local.");
    let addrs = [Ipv4Addr::new(10, 32, 9, 1), Ipv4Addr::new(10, 32, 9, 2)];

    // miss: the first asker leaves a placeholder and goes off to resolve
    assert_eq!(cache.get(&request, MAX_UDP, now), Ok(None));
    assert_eq!(cache.len(), 1);

    // racers keep observing the pending entry
    assert_eq!(cache.get(&request, MAX_UDP, now), Ok(None));
    assert_eq!(cache.len(), 1);

    // the resolver lands its answer
    let reply = make_reply(&request, &addrs, 30);
    let stored = cache.put(&request, Some(&reply), 0, EntryFlags::NONE, now);
    assert!(stored > 0);

    // hits serve shaped copies until the window closes
    let served = cache
        .get(&request, MAX_UDP, now + Duration::from_secs(29))
        .unwrap()
        .unwrap();
    assert_eq!(answer_addrs(&served), addrs.to_vec());
    assert!(served.answers().iter().all(|record| record.ttl() == 1));

    // window over: the entry goes away and the cycle restarts with a miss
    let expired_at = now + Duration::from_secs(30);
    assert_eq!(cache.get(&request, MAX_UDP, expired_at), Ok(None));
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.get(&request, MAX_UDP, expired_at), Ok(None));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_negative_result_short_circuits_local_lookup() {
    let now = Instant::now();
    let config = Config::from_toml_str(
        r#"
        [cache]
        capacity = 32
        "#,
    )
    .unwrap();
    let cache = ResponseCache::from_config(&config.cache).unwrap();
    let request = make_request("outside.example.com.");

    // resolver found nothing in the local network; remember that
    cache.put(&request, None, 10, EntryFlags::NO_LOCAL_REPLIES, now);

    // callers are told "known absent", not "go resolve"
    assert_eq!(
        cache.get(&request, MAX_UDP, now + Duration::from_secs(9)),
        Err(CacheError::NoLocalReplies)
    );
}

#[tokio::test]
async fn test_maintainer_reclaims_idle_entries() {
    let cache = Arc::new(ResponseCache::new(32).unwrap());
    let request = make_request("ephemeral.weft.local.");
    let reply = make_reply(&request, &[Ipv4Addr::new(10, 32, 11, 1)], 1);

    cache.put(
        &request,
        Some(&reply),
        0,
        EntryFlags::NONE,
        Instant::now(),
    );
    assert_eq!(cache.len(), 1);

    let handle = CacheMaintainer::new(Arc::clone(&cache), 1).start();

    // never touched again: only the purge task can reclaim it
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(cache.len(), 0);

    handle.abort();
}
