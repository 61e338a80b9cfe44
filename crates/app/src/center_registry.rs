//! Topic name → topic center, created on first reference.

use std::sync::Arc;

use dashmap::DashMap;

use fissionbus_domain::topic::Topic;

use crate::ports::Registry;
use crate::topic_center::TopicCenter;

/// All topic centers of one bus.
#[derive(Default)]
pub struct CenterRegistry {
    centers: DashMap<Topic, Arc<TopicCenter>>,
}

impl CenterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The center for `topic`, created if this is the first reference.
    #[must_use]
    pub fn center(&self, topic: &str) -> Arc<TopicCenter> {
        self.get_or_create(&Topic::from(topic), |topic| {
            Arc::new(TopicCenter::new(topic.clone()))
        })
    }

    /// The center for `topic`, without creating one.
    #[must_use]
    pub fn get(&self, topic: &str) -> Option<Arc<TopicCenter>> {
        self.centers
            .get(&Topic::from(topic))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Every topic referenced so far, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self
            .centers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort();
        topics
    }
}

impl Registry<Topic, Arc<TopicCenter>> for CenterRegistry {
    fn get_or_create(
        &self,
        key: &Topic,
        create: impl FnOnce(&Topic) -> Arc<TopicCenter>,
    ) -> Arc<TopicCenter> {
        let entry = self.centers.entry(key.clone()).or_insert_with(|| create(key));
        Arc::clone(entry.value())
    }
}
