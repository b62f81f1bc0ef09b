//! In-memory `ObjectStore` used by the test suite: failure injection per
//! key, plus an in-flight gauge to observe the concurrency bound.

use crate::err::Error;
use crate::store::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    puts_attempted: AtomicUsize,
}

#[derive(Default)]
struct State {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), Bytes>,
    public: HashSet<(String, String)>,
    deny_keys: Vec<String>,
    fail_keys: Vec<String>,
    fail_set_public: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(name: &str) -> Self {
        let store = Self::default();
        store.lock().buckets.insert(name.to_owned());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<State> {
        self.inner.state.lock().unwrap()
    }

    /// Puts on keys containing `substr` fail with `AccessDenied`.
    pub fn deny_key(&self, substr: &str) {
        self.lock().deny_keys.push(substr.to_owned());
    }

    /// Puts on keys containing `substr` fail with `Transfer`.
    pub fn fail_key(&self, substr: &str) {
        self.lock().fail_keys.push(substr.to_owned());
    }

    pub fn fail_set_public(&self) {
        self.lock().fail_set_public = true;
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
    }

    pub fn is_public(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .public
            .contains(&(bucket.to_owned(), key.to_owned()))
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of `put_object` calls attempted, including failed ones.
    pub fn puts_attempted(&self) -> usize {
        self.inner.puts_attempted.load(Ordering::SeqCst)
    }

    /// Highest number of `put_object` calls observed simultaneously in flight.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn store_put(&self, bucket: &str, key: &str, content: Bytes) -> Result<(), Error> {
        let mut state = self.lock();
        if !state.buckets.contains(bucket) {
            return Err(Error::BucketNotFound {
                bucket: bucket.to_owned(),
            });
        }
        if state.deny_keys.iter().any(|s| key.contains(s.as_str())) {
            return Err(Error::AccessDenied {
                detail: format!("key {}", key),
            });
        }
        if state.fail_keys.iter().any(|s| key.contains(s.as_str())) {
            return Err(Error::Transfer {
                detail: format!("key {}", key),
            });
        }
        state
            .objects
            .insert((bucket.to_owned(), key.to_owned()), content);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error> {
        Ok(self.lock().buckets.contains(bucket))
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), Error> {
        self.inner.puts_attempted.fetch_add(1, Ordering::SeqCst);
        let n = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(n, Ordering::SeqCst);
        // Hold the slot long enough that concurrent puts overlap.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let result = match tokio::fs::read(path).await {
            Ok(content) => self.store_put(bucket, key, Bytes::from(content)),
            Err(_) => Err(Error::LocalNotFound {
                path: path.to_owned(),
            }),
        };
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn set_public(&self, bucket: &str, key: &str) -> Result<(), Error> {
        let mut state = self.lock();
        if state.fail_set_public {
            return Err(Error::AccessDenied {
                detail: format!("acl on {}", key),
            });
        }
        if !state
            .objects
            .contains_key(&(bucket.to_owned(), key.to_owned()))
        {
            return Err(Error::Transfer {
                detail: format!("no such object {}", key),
            });
        }
        state.public.insert((bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.lock().buckets.iter().cloned().collect();
        names.sort();
        Ok(names)
    }
}
