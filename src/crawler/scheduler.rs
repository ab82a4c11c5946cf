//! Scheduler for managing the crawl frontier and page budget
//!
//! This module handles:
//! - FIFO frontier management (breadth-first order)
//! - Deduplication against visited and queued URLs
//! - Enforcing the page budget at admission and dispatch time
//! - Handing out bounded batches for concurrent fetching

use crate::url::{canonicalize, is_fetchable};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Scheduler manages the frontier queue and the visited set
///
/// The scheduler guarantees:
/// - A URL is handed out at most once per crawl
/// - URLs are handed out in the order they were admitted
/// - No more than `max_pages` URLs are ever handed out
#[derive(Debug)]
pub struct Scheduler {
    /// URLs waiting to be fetched, oldest first
    frontier: VecDeque<Url>,

    /// Every URL currently in the frontier
    queued: HashSet<Url>,

    /// Every URL already handed out for fetching
    visited: HashSet<Url>,

    /// Page budget for the crawl
    max_pages: usize,
}

impl Scheduler {
    /// Creates a new scheduler with a seed URL already admitted
    ///
    /// # Arguments
    ///
    /// * `seed` - The URL the crawl starts from
    /// * `max_pages` - Page budget for the crawl
    pub fn new(seed: &Url, max_pages: usize) -> Self {
        let mut scheduler = Self {
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            max_pages,
        };
        scheduler.admit(seed);
        scheduler
    }

    /// Adds a URL to the frontier
    ///
    /// The URL is ignored if it is not http(s), was already visited or
    /// queued, or if the frontier plus visited set already fills the budget.
    ///
    /// # Returns
    ///
    /// `true` if the URL was enqueued
    pub fn admit(&mut self, url: &Url) -> bool {
        let url = canonicalize(url);

        if !is_fetchable(&url) || self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }

        if self.visited.len() + self.queued.len() >= self.max_pages {
            return false;
        }

        self.queued.insert(url.clone());
        self.frontier.push_back(url);
        true
    }

    /// Takes up to `concurrency` URLs off the frontier
    ///
    /// Each URL is marked visited before it is returned, so a URL that fails
    /// to fetch is never retried within the crawl.
    pub fn next_batch(&mut self, concurrency: usize) -> Vec<Url> {
        let mut batch = Vec::with_capacity(concurrency);

        while batch.len() < concurrency && self.visited.len() < self.max_pages {
            let Some(url) = self.frontier.pop_front() else {
                break;
            };
            self.queued.remove(&url);

            if self.visited.insert(url.clone()) {
                batch.push(url);
            }
        }

        batch
    }

    /// Number of URLs handed out so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Returns the number of URLs in the frontier
    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Returns true once nothing more can be dispatched
    pub fn is_exhausted(&self) -> bool {
        self.frontier.is_empty() || self.visited.len() >= self.max_pages
    }

    /// Returns true if the URL has been handed out
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&canonicalize(url))
    }

    /// Records that a handed-out URL landed on `target`
    ///
    /// The target takes the URL's place in the visited set, so it is not
    /// fetched again and the page budget is unchanged.
    pub fn redirect(&mut self, url: &Url, target: &Url) {
        let url = canonicalize(url);
        let target = canonicalize(target);
        if url != target && self.visited.remove(&url) {
            self.queued.remove(&target);
            self.frontier.retain(|queued| *queued != target);
            self.visited.insert(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_new_scheduler_admits_seed() {
        let scheduler = Scheduler::new(&url("/"), 10);
        assert_eq!(scheduler.frontier_size(), 1);
        assert_eq!(scheduler.visited_count(), 0);
        assert!(!scheduler.is_exhausted());
    }

    #[test]
    fn test_fifo_order() {
        let mut scheduler = Scheduler::new(&url("/"), 10);
        scheduler.admit(&url("/a"));
        scheduler.admit(&url("/b"));

        let batch = scheduler.next_batch(10);
        assert_eq!(batch, vec![url("/"), url("/a"), url("/b")]);
    }

    #[test]
    fn test_admit_deduplicates() {
        let mut scheduler = Scheduler::new(&url("/"), 10);
        assert!(scheduler.admit(&url("/a")));
        assert!(!scheduler.admit(&url("/a")));
        assert!(!scheduler.admit(&url("/a#section")));

        scheduler.next_batch(10);
        assert!(!scheduler.admit(&url("/a")));
        assert!(!scheduler.admit(&url("/")));
    }

    #[test]
    fn test_admit_rejects_non_http() {
        let mut scheduler = Scheduler::new(&url("/"), 10);
        assert!(!scheduler.admit(&Url::parse("ftp://example.com/file").unwrap()));
    }

    #[test]
    fn test_budget_enforced_at_admission() {
        let mut scheduler = Scheduler::new(&url("/"), 3);
        assert!(scheduler.admit(&url("/a")));
        assert!(scheduler.admit(&url("/b")));
        assert!(!scheduler.admit(&url("/c")));
    }

    #[test]
    fn test_batches_respect_concurrency_and_budget() {
        let mut scheduler = Scheduler::new(&url("/"), 4);
        for path in ["/a", "/b", "/c"] {
            scheduler.admit(&url(path));
        }

        assert_eq!(scheduler.next_batch(2).len(), 2);
        assert_eq!(scheduler.next_batch(2).len(), 2);
        assert!(scheduler.next_batch(2).is_empty());
        assert_eq!(scheduler.visited_count(), 4);
        assert!(scheduler.is_exhausted());
    }

    #[test]
    fn test_visited_marked_before_dispatch() {
        let mut scheduler = Scheduler::new(&url("/"), 10);
        let batch = scheduler.next_batch(1);
        assert!(scheduler.is_visited(&batch[0]));
        assert_eq!(scheduler.frontier_size(), 0);
    }

    #[test]
    fn test_redirect_replaces_visited_url() {
        let mut scheduler = Scheduler::new(&url("/"), 10);
        scheduler.next_batch(1);

        let target = Url::parse("https://www.example.com/").unwrap();
        scheduler.redirect(&url("/"), &target);

        assert!(scheduler.is_visited(&target));
        assert!(!scheduler.is_visited(&url("/")));
        assert_eq!(scheduler.visited_count(), 1);
        assert!(!scheduler.admit(&target));
    }
}
