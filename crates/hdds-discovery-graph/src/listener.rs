// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery listeners.
//!
//! One listener per builtin discovery reader. On data-available the listener
//! drains the reader batch by batch, decodes each sample into a
//! [`GraphEvent`], hands the loan back to the transport, then applies the
//! batch to the graph cache. The graph signal fires once per callback when
//! any sample was observed.

use crate::builtin::{
    sample_event, BuiltinTopicData, ParticipantBuiltinTopicData, PublicationBuiltinTopicData,
    Sample, SubscriptionBuiltinTopicData,
};
use crate::event::GraphEvent;
use crate::graph::DiscoveryGraphCache;
use crate::guard::GraphSignal;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a transport `take`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TakeError {
    /// Nothing left to take; ends a drain normally.
    #[error("no data")]
    NoData,
    #[error("take failed: {0}")]
    Failed(String),
}

/// Typed builtin reader handed out by the transport.
pub trait BuiltinReader<T>: Send + Sync {
    /// Take up to `max_samples` samples (`None` = unlimited) on loan.
    fn take(&self, max_samples: Option<usize>) -> Result<Vec<Sample<T>>, TakeError>;

    /// Give a taken batch back to the transport.
    fn return_loan(&self, samples: Vec<Sample<T>>);
}

/// Untyped discovery reader as passed to listener callbacks.
pub trait DiscoveryReader: Send + Sync {
    fn topic_name(&self) -> &str;

    fn as_participant_reader(&self) -> Option<&dyn BuiltinReader<ParticipantBuiltinTopicData>> {
        None
    }

    fn as_publication_reader(&self) -> Option<&dyn BuiltinReader<PublicationBuiltinTopicData>> {
        None
    }

    fn as_subscription_reader(&self) -> Option<&dyn BuiltinReader<SubscriptionBuiltinTopicData>> {
        None
    }
}

/// Borrowed batch; returned to the reader on drop.
struct Loan<'a, T> {
    reader: &'a dyn BuiltinReader<T>,
    samples: Option<Vec<Sample<T>>>,
}

impl<'a, T> Loan<'a, T> {
    fn new(reader: &'a dyn BuiltinReader<T>, samples: Vec<Sample<T>>) -> Self {
        Self {
            reader,
            samples: Some(samples),
        }
    }

    fn samples(&self) -> &[Sample<T>] {
        self.samples.as_deref().unwrap_or_default()
    }
}

impl<T> Drop for Loan<'_, T> {
    fn drop(&mut self) {
        if let Some(samples) = self.samples.take() {
            self.reader.return_loan(samples);
        }
    }
}

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Non-empty batches taken.
    pub batches: usize,
    /// Samples observed across all batches.
    pub samples: usize,
    /// Whether the cache changed.
    pub changed: bool,
}

/// Listener for the builtin topic carrying `T`.
pub struct DiscoveryListener<T> {
    cache: Arc<DiscoveryGraphCache>,
    signal: Arc<dyn GraphSignal>,
    take_limit: Option<usize>,
    _topic: PhantomData<fn() -> T>,
}

pub type ParticipantListener = DiscoveryListener<ParticipantBuiltinTopicData>;
pub type PublisherListener = DiscoveryListener<PublicationBuiltinTopicData>;
pub type SubscriberListener = DiscoveryListener<SubscriptionBuiltinTopicData>;

impl<T: BuiltinTopicData> DiscoveryListener<T> {
    pub fn new(cache: Arc<DiscoveryGraphCache>, signal: Arc<dyn GraphSignal>) -> Self {
        Self {
            cache,
            signal,
            take_limit: None,
            _topic: PhantomData,
        }
    }

    /// Bound each take to `limit` samples (`None` = unlimited).
    pub fn with_take_limit(mut self, limit: Option<usize>) -> Self {
        self.take_limit = limit.filter(|limit| *limit > 0);
        self
    }

    pub fn take_limit(&self) -> Option<usize> {
        self.take_limit
    }

    /// Data-available callback.
    ///
    /// Failures are logged and swallowed.
    pub fn on_data_available(&self, reader: &dyn DiscoveryReader) {
        let Some(typed) = T::narrow(reader) else {
            log::error!(
                "[listener] reader '{}' is not a {} reader",
                reader.topic_name(),
                T::TOPIC
            );
            return;
        };

        match self.drain(typed) {
            Ok(report) => log::trace!(
                "[listener] {}: {} samples in {} batches (changed={})",
                T::TOPIC,
                report.samples,
                report.batches,
                report.changed
            ),
            Err(err) => log::error!("[listener] {}: {}", T::TOPIC, err),
        }
    }

    /// Take every available batch and apply it to the cache.
    ///
    /// Fails only when the first take fails; the cache is then untouched and
    /// the signal is not fired. A later failure stops the drain but keeps
    /// what was already applied.
    pub fn drain(&self, reader: &dyn BuiltinReader<T>) -> Result<DrainReport, TakeError> {
        let mut report = DrainReport::default();

        loop {
            let batch = match reader.take(self.take_limit) {
                Ok(batch) => batch,
                Err(TakeError::NoData) => break,
                Err(err) if report.batches == 0 => return Err(err),
                Err(err) => {
                    log::warn!(
                        "[listener] {}: drain stopped after {} batches: {}",
                        T::TOPIC,
                        report.batches,
                        err
                    );
                    break;
                }
            };

            let loan = Loan::new(reader, batch);
            if loan.samples().is_empty() {
                break;
            }
            let events = decode(loan.samples());
            report.batches += 1;
            report.samples += loan.samples().len();
            drop(loan);

            report.changed |= self.cache.apply_batch(events);
        }

        if report.samples > 0 {
            self.signal.signal();
        }
        Ok(report)
    }
}

fn decode<T: BuiltinTopicData>(samples: &[Sample<T>]) -> Vec<GraphEvent> {
    samples
        .iter()
        .map(sample_event)
        .filter(|event| {
            if event.guid().is_zero() {
                log::debug!("[listener] {}: skipping sample with invalid handle", T::TOPIC);
                return false;
            }
            true
        })
        .collect()
}
