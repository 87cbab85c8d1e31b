//! Paged iteration over cached results
//!
//! `Pages` walks a cached result key by rank, refreshing its expiry before
//! every page so a slow consumer does not lose the result mid-walk.
//! `EntityPages` additionally hydrates each page through an `EntityCache` and
//! asks it to forget every hydrated entity that was not modified locally.

use std::collections::VecDeque;

use crate::planner::{QueryError, QueryResult};
use crate::store::Store;

/// Session-level entity cache used to hydrate ids
pub trait EntityCache {
    type Entity;

    /// Loads the entities for `ids`, in order; missing ids are skipped
    fn load(&mut self, namespace: &str, ids: &[String]) -> QueryResult<Vec<Self::Entity>>;

    /// Whether the entity has local changes not yet written
    fn is_modified(&self, entity: &Self::Entity) -> bool;

    /// Drops the entity from the cache
    fn forget(&mut self, entity: &Self::Entity);
}

/// Id pages of a cached result
pub struct Pages<'a> {
    store: &'a dyn Store,
    key: String,
    timeout: u64,
    page_size: usize,
    offset: usize,
    done: bool,
}

impl<'a> Pages<'a> {
    pub fn new(store: &'a dyn Store, key: String, timeout: u64, page_size: usize) -> QueryResult<Self> {
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        if timeout < 1 {
            return Err(QueryError::InvalidTimeout { timeout });
        }
        Ok(Self {
            store,
            key,
            timeout,
            page_size,
            offset: 0,
            done: false,
        })
    }

    /// The cached result key being walked
    pub fn key(&self) -> &str {
        &self.key
    }

    fn fetch(&mut self) -> QueryResult<Vec<String>> {
        self.store.expire(&self.key, self.timeout)?;
        let stop = self.offset + self.page_size - 1;
        Ok(self.store.zrange(&self.key, self.offset, stop)?)
    }
}

impl Iterator for Pages<'_> {
    type Item = QueryResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fetch() {
            Ok(page) if page.is_empty() => {
                self.done = true;
                None
            }
            Ok(page) => {
                self.offset += page.len();
                if page.len() < self.page_size {
                    self.done = true;
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Hydrated entities of a cached result, one at a time
pub struct EntityPages<'a, C: EntityCache> {
    namespace: String,
    pages: Pages<'a>,
    cache: &'a mut C,
    buffer: VecDeque<C::Entity>,
}

impl<'a, C: EntityCache> EntityPages<'a, C> {
    pub fn new(namespace: impl Into<String>, pages: Pages<'a>, cache: &'a mut C) -> Self {
        Self {
            namespace: namespace.into(),
            pages,
            cache,
            buffer: VecDeque::new(),
        }
    }

    fn refill(&mut self, ids: &[String]) -> QueryResult<()> {
        let entities = self.cache.load(&self.namespace, ids)?;
        for entity in &entities {
            if !self.cache.is_modified(entity) {
                self.cache.forget(entity);
            }
        }
        self.buffer.extend(entities);
        Ok(())
    }
}

impl<C: EntityCache> Iterator for EntityPages<'_, C> {
    type Item = QueryResult<C::Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.buffer.pop_front() {
                return Some(Ok(entity));
            }
            match self.pages.next()? {
                Ok(ids) => {
                    if let Err(err) = self.refill(&ids) {
                        return Some(Err(err));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Batch, MemoryStore};
    use std::collections::BTreeSet;

    fn cached(store: &MemoryStore, count: usize) -> String {
        let key = "User:cache:abc".to_string();
        let mut batch = Batch::new();
        for rank in 0..count {
            batch.zadd(key.as_str(), rank as f64, format!("id{:02}", rank));
        }
        batch.expire(key.as_str(), 5);
        store.exec(None, batch).unwrap();
        key
    }

    #[derive(Default)]
    struct Session {
        modified: BTreeSet<String>,
        forgotten: Vec<String>,
    }

    impl EntityCache for Session {
        type Entity = String;

        fn load(&mut self, namespace: &str, ids: &[String]) -> QueryResult<Vec<String>> {
            Ok(ids.iter().map(|id| format!("{}:{}", namespace, id)).collect())
        }

        fn is_modified(&self, entity: &String) -> bool {
            self.modified.contains(entity)
        }

        fn forget(&mut self, entity: &String) {
            self.forgotten.push(entity.clone());
        }
    }

    #[test]
    fn test_pages() {
        let store = MemoryStore::new();
        let key = cached(&store, 5);

        let pages: Vec<Vec<String>> = Pages::new(&store, key.clone(), 60, 2)
            .unwrap()
            .collect::<QueryResult<_>>()
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], vec!["id04"]);

        // expiry was refreshed past the original 5 seconds
        assert!(store.ttl(&key).unwrap().unwrap().as_secs() > 5);
    }

    #[test]
    fn test_pages_rejects_bad_arguments() {
        let store = MemoryStore::new();
        assert_eq!(
            Pages::new(&store, "k".into(), 10, 0).err(),
            Some(QueryError::InvalidPageSize)
        );
        assert!(Pages::new(&store, "k".into(), 0, 10).is_err());
        assert_eq!(Pages::new(&store, "k".into(), 10, 10).unwrap().count(), 0);
    }

    #[test]
    fn test_entity_pages_forget_unmodified() {
        let store = MemoryStore::new();
        let key = cached(&store, 3);
        let mut session = Session::default();
        session.modified.insert("User:id01".to_string());

        let pages = Pages::new(&store, key, 60, 2).unwrap();
        let entities: Vec<String> = EntityPages::new("User", pages, &mut session)
            .collect::<QueryResult<_>>()
            .unwrap();

        assert_eq!(entities, vec!["User:id00", "User:id01", "User:id02"]);
        assert_eq!(session.forgotten, vec!["User:id00", "User:id02"]);
    }
}
