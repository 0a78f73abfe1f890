/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

// Internal module tracking the connection's subscriptions and whether each is still awaiting
// its SUBACK.

use crate::config::PublishEventHandler;
use crate::mqtt::QualityOfService;

use log::*;

use std::collections::HashMap;

pub(crate) struct SubscriptionEntry {
    pub(crate) qos: QualityOfService,
    pub(crate) pending: bool,
    pub(crate) handler: Option<PublishEventHandler>,
}

#[derive(Default)]
pub(crate) struct SubscriptionTable {
    subscriptions: HashMap<String, SubscriptionEntry>,
}

impl SubscriptionTable {

    pub(crate) fn new() -> Self {
        SubscriptionTable {
            ..Default::default()
        }
    }

    /// Records a subscribe that has been written but not yet acknowledged.  Re-subscribing to
    /// a topic replaces its qos and handler.
    pub(crate) fn mark_pending(&mut self, topic: &str, qos: QualityOfService, handler: Option<PublishEventHandler>) {
        debug!("SubscriptionTable - subscription to \"{}\" pending", topic);
        self.subscriptions.insert(topic.to_string(), SubscriptionEntry {
            qos,
            pending: true,
            handler,
        });
    }

    pub(crate) fn clear_pending(&mut self, topic: &str) {
        if let Some(entry) = self.subscriptions.get_mut(topic) {
            debug!("SubscriptionTable - subscription to \"{}\" acknowledged", topic);
            entry.pending = false;
        }
    }

    pub(crate) fn clear_all_pending(&mut self) -> usize {
        let mut cleared = 0;
        for (topic, entry) in self.subscriptions.iter_mut().filter(|(_, entry)| entry.pending) {
            debug!("SubscriptionTable - clearing pending flag of \"{}\"", topic);
            entry.pending = false;
            cleared += 1;
        }

        cleared
    }

    pub(crate) fn is_pending(&self, topic: &str) -> bool {
        self.subscriptions.get(topic).map(|entry| entry.pending).unwrap_or(false)
    }

    pub(crate) fn remove(&mut self, topic: &str) -> bool {
        self.subscriptions.remove(topic).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, topic: &str) -> bool {
        self.subscriptions.contains_key(topic)
    }

    pub(crate) fn get(&self, topic: &str) -> Option<&SubscriptionEntry> {
        self.subscriptions.get(topic)
    }

    /// Handler of the subscription exactly matching the topic
    pub(crate) fn handler_for(&self, topic: &str) -> Option<PublishEventHandler> {
        self.subscriptions.get(topic).and_then(|entry| entry.handler.clone())
    }
}
