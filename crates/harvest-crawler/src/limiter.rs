use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Instant};

/// Politeness throttle for content page requests.
///
/// Request starts are spaced by at least `delay`, whatever the number of
/// workers, and at most `per_host` requests are in flight for a given host.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
    per_host: usize,
    hosts: StdMutex<HashMap<String, Arc<Semaphore>>>,
}

/// Held for the duration of a request.
#[derive(Debug)]
pub struct Permit {
    _host: Option<OwnedSemaphorePermit>,
}

impl Throttle {
    pub fn new(delay: Duration, per_host: usize) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
            per_host: per_host.max(1),
            hosts: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, url: &str) -> Permit {
        let host = self.host_permits(url).acquire_owned().await.ok();
        self.wait_turn().await;
        Permit { _host: host }
    }

    async fn wait_turn(&self) {
        if self.delay.is_zero() {
            return;
        }
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            sleep_until(at).await;
        }
        *next_slot = Some(Instant::now() + self.delay);
    }

    fn host_permits(&self, url: &str) -> Arc<Semaphore> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let mut hosts = match self.hosts.lock() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        hosts
            .entry(host)
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone()
    }
}
