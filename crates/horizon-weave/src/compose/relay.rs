//! Forwarding provider mutations to flattened positions.
//!
//! Each registered provider gets one [`Relay`], subscribed to the provider's
//! [`ProviderSignals`](super::ProviderSignals). Local events are handed to a
//! [`RelaySink`] (the composite), which remaps them with [`remap`]:
//!
//! - the provider's offset is the position of its first item in the current
//!   sequence; the local range is shifted by it and forwarded as-is
//! - a full change always asks for a refresh
//! - a provider that contributes no items has no offset, so range events for
//!   it are dropped (an insert instead asks for a refresh, since the provider
//!   is growing from empty)
//! - an event that does not agree with the provider's current items asks
//!   for a full refresh instead of guessing

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_weave_core::logging::targets;
use horizon_weave_core::ConnectionId;

use super::diff::ChangeOp;
use super::item::{FlatEntry, FlatSequence, WrappedItem};
use super::provider::{DynProvider, ItemEntry, ProviderEvent, ProviderId};

/// Receives events from attached relays.
pub(crate) trait RelaySink: Send + Sync {
    fn relay(&self, provider: ProviderId, event: &ProviderEvent);
}

/// Lifecycle of one relay. The only transition is `Attached` to `Detached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Subscribed and forwarding.
    Attached,
    /// Unsubscribed; the provider has been removed.
    Detached,
}

/// The subscription of one provider registration.
pub(crate) struct Relay {
    provider: ProviderId,
    connection: ConnectionId,
    attached: Arc<AtomicBool>,
}

impl Relay {
    /// Subscribes to `provider` and forwards its events to `sink`.
    pub(crate) fn attach(provider: &dyn DynProvider, sink: Weak<dyn RelaySink>) -> Self {
        let id = provider.id();
        let attached = Arc::new(AtomicBool::new(true));

        let flag = attached.clone();
        let connection = provider.signals().changed.connect(move |event| {
            // A snapshot taken by an emit in flight may still call us after
            // detach.
            if !flag.load(Ordering::Acquire) {
                return;
            }
            if let Some(sink) = sink.upgrade() {
                sink.relay(id, event);
            }
        });

        tracing::trace!(target: targets::RELAY, provider = ?id, "relay attached");
        Self {
            provider: id,
            connection,
            attached,
        }
    }

    pub(crate) fn state(&self) -> RelayState {
        if self.attached.load(Ordering::Acquire) {
            RelayState::Attached
        } else {
            RelayState::Detached
        }
    }

    /// Unsubscribes. Calling this again has no effect.
    pub(crate) fn detach(&self, provider: &dyn DynProvider) {
        if self.attached.swap(false, Ordering::AcqRel) {
            match provider.signals().changed.try_disconnect(self.connection) {
                Ok(()) => {
                    tracing::trace!(target: targets::RELAY, provider = ?self.provider, "relay detached");
                }
                Err(err) => {
                    tracing::warn!(target: targets::RELAY, provider = ?self.provider, %err, "relay connection already gone");
                }
            }
        }
    }
}

/// What to do with one provider event.
#[derive(Debug)]
pub(crate) enum Remap {
    /// Publish `sequence` and forward `ops`. `touched` covers the rows whose
    /// items are new to the sequence.
    Forward {
        sequence: FlatSequence,
        ops: Vec<ChangeOp>,
        touched: Range<usize>,
    },
    /// Nothing to forward.
    Skip,
    /// Rebuild and diff.
    Refresh,
}

/// Remaps a local `event` of `provider` against the `current` sequence.
///
/// With `refresh_when_emptied`, a removal that empties the provider asks for
/// a refresh so rows attached to the provider (its title) can go too.
pub(crate) fn remap(
    current: &FlatSequence,
    provider: &dyn DynProvider,
    event: &ProviderEvent,
    refresh_when_emptied: bool,
) -> Remap {
    let id = provider.id();

    // Rows are rebuilt from the provider, so a provider that currently shows
    // nothing still gets its new items laid out.
    if matches!(event, ProviderEvent::FullChange) {
        return Remap::Refresh;
    }

    let Some(offset) = current.offset_of(id) else {
        if matches!(event, ProviderEvent::RangeInserted { count, .. } if *count > 0) {
            return Remap::Refresh;
        }
        tracing::debug!(
            target: targets::RELAY,
            provider = ?id,
            ?event,
            "stale offset lookup, event dropped"
        );
        return Remap::Skip;
    };

    let segment = current.segment_len(id, offset);
    let fresh = provider.entries();
    let mut sequence = current.clone();

    let (ops, touched) = match *event {
        ProviderEvent::FullChange => return Remap::Refresh,

        ProviderEvent::RangeInserted { start, count } => {
            if count == 0 {
                return Remap::Skip;
            }
            if start > segment || segment + count != fresh.len() {
                return inconsistent(id, event, segment, fresh.len());
            }
            let position = offset + start;
            sequence.insert_entries(position, wrap(&fresh[start..start + count]));
            (
                vec![ChangeOp::Insert { position, count }],
                position..position + count,
            )
        }

        ProviderEvent::RangeRemoved { start, count } => {
            if count == 0 {
                return Remap::Skip;
            }
            if start + count > segment || segment - count != fresh.len() {
                return inconsistent(id, event, segment, fresh.len());
            }
            if fresh.is_empty() && refresh_when_emptied {
                return Remap::Refresh;
            }
            let position = offset + start;
            sequence.remove_range(position..position + count);
            (vec![ChangeOp::Remove { position, count }], position..position)
        }

        ProviderEvent::RangeMoved { from, to, count } => {
            if count == 0 || from == to {
                return Remap::Skip;
            }
            if from + count > segment || to + count > segment || fresh.len() != segment {
                return inconsistent(id, event, segment, fresh.len());
            }
            sequence.replace_range(offset, wrap(&fresh));
            (
                block_moves(offset + from, offset + to, count),
                offset..offset + segment,
            )
        }

        ProviderEvent::RangeChanged {
            start,
            count,
            ref payload,
        } => {
            if count == 0 {
                return Remap::Skip;
            }
            if start + count > segment || fresh.len() != segment {
                return inconsistent(id, event, segment, fresh.len());
            }
            let position = offset + start;
            sequence.replace_range(position, wrap(&fresh[start..start + count]));
            (
                vec![ChangeOp::Change {
                    position,
                    count,
                    payload: payload.clone(),
                }],
                position..position + count,
            )
        }
    };

    tracing::trace!(target: targets::RELAY, provider = ?id, offset, ?ops, "event remapped");
    Remap::Forward {
        sequence,
        ops,
        touched,
    }
}

/// Splits a block move into single-item moves.
///
/// The block of `count` rows at `from` ends up starting at `to`.
fn block_moves(from: usize, to: usize, count: usize) -> Vec<ChangeOp> {
    if to > from {
        let last = to + count - 1;
        (0..count).map(|_| ChangeOp::Move { from, to: last }).collect()
    } else {
        (0..count)
            .map(|k| ChangeOp::Move {
                from: from + k,
                to: to + k,
            })
            .collect()
    }
}

fn wrap(entries: &[Arc<dyn ItemEntry>]) -> Vec<FlatEntry> {
    entries
        .iter()
        .cloned()
        .map(|entry| FlatEntry::Item(WrappedItem::new(entry)))
        .collect()
}

fn inconsistent(id: ProviderId, event: &ProviderEvent, segment: usize, len: usize) -> Remap {
    tracing::debug!(
        target: targets::RELAY,
        provider = ?id,
        ?event,
        rendered = segment,
        current = len,
        "event does not match provider items, refreshing"
    );
    Remap::Refresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::diff::apply_ops;
    use crate::compose::provider::ErasedProvider;
    use crate::compose::testing::numbers;
    use crate::compose::{ListProvider, VecProvider};
    use parking_lot::Mutex;
    use slotmap::SlotMap;

    struct Setup {
        a: Arc<VecProvider<u32>>,
        b: Arc<VecProvider<u32>>,
        erased_a: ErasedProvider<VecProvider<u32>>,
        erased_b: ErasedProvider<VecProvider<u32>>,
        sequence: FlatSequence,
    }

    /// A = [1, 2] and B = [10, 20, 30], flattened behind a title row.
    fn setup() -> Setup {
        let mut ids = SlotMap::<ProviderId, ()>::with_key();
        let a = numbers(&[1, 2], 1);
        let b = numbers(&[10, 20, 30], 2);
        let erased_a = ErasedProvider::new(ids.insert(()), a.clone());
        let erased_b = ErasedProvider::new(ids.insert(()), b.clone());

        let mut sequence = FlatSequence::new();
        sequence.push(FlatEntry::Title("numbers".into()));
        for entry in erased_a.entries().into_iter().chain(erased_b.entries()) {
            sequence.push(FlatEntry::Item(WrappedItem::new(entry)));
        }

        Setup {
            a,
            b,
            erased_a,
            erased_b,
            sequence,
        }
    }

    fn values(sequence: &FlatSequence) -> Vec<Option<u32>> {
        sequence
            .iter()
            .map(|entry| entry.as_item().and_then(|item| item.item::<u32>().copied()))
            .collect()
    }

    fn forward(remap: Remap) -> (FlatSequence, Vec<ChangeOp>, Range<usize>) {
        match remap {
            Remap::Forward {
                sequence,
                ops,
                touched,
            } => (sequence, ops, touched),
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_is_shifted_by_offset() {
        let s = setup();
        s.b.insert(1, 15);

        let event = ProviderEvent::RangeInserted { start: 1, count: 1 };
        let (sequence, ops, touched) = forward(remap(&s.sequence, &s.erased_b, &event, false));

        assert_eq!(ops, vec![ChangeOp::Insert { position: 4, count: 1 }]);
        assert_eq!(touched, 4..5);
        assert_eq!(
            values(&sequence),
            vec![None, Some(1), Some(2), Some(10), Some(15), Some(20), Some(30)]
        );
    }

    #[test]
    fn test_remove_is_shifted_by_offset() {
        let s = setup();
        s.a.remove(0);

        let event = ProviderEvent::RangeRemoved { start: 0, count: 1 };
        let (sequence, ops, touched) = forward(remap(&s.sequence, &s.erased_a, &event, false));

        assert_eq!(ops, vec![ChangeOp::Remove { position: 1, count: 1 }]);
        assert!(touched.is_empty());
        assert_eq!(
            values(&sequence),
            vec![None, Some(2), Some(10), Some(20), Some(30)]
        );
    }

    #[test]
    fn test_block_move_forward_and_backward() {
        let s = setup();
        s.b.move_item(2, 0);

        // [10, 20] moves to start at 1.
        let event = ProviderEvent::RangeMoved {
            from: 0,
            to: 1,
            count: 2,
        };
        let (sequence, ops, _) = forward(remap(&s.sequence, &s.erased_b, &event, false));
        assert_eq!(
            ops,
            vec![
                ChangeOp::Move { from: 3, to: 5 },
                ChangeOp::Move { from: 3, to: 5 },
            ]
        );

        let mut replay = values(&s.sequence);
        apply_ops(&mut replay, &ops, |_| None);
        assert_eq!(replay, values(&sequence));

        // And back again.
        s.b.move_item(0, 2);
        let event = ProviderEvent::RangeMoved {
            from: 1,
            to: 0,
            count: 2,
        };
        let (restored, ops, _) = forward(remap(&sequence, &s.erased_b, &event, false));
        let mut replay = values(&sequence);
        apply_ops(&mut replay, &ops, |_| None);
        assert_eq!(replay, values(&restored));
        assert_eq!(values(&restored), values(&s.sequence));
    }

    #[test]
    fn test_change_keeps_payload() {
        let s = setup();
        s.a.modify(1, |value| *value = 5);

        let payload = crate::compose::Payload::new("value");
        let event = ProviderEvent::RangeChanged {
            start: 1,
            count: 1,
            payload: Some(payload.clone()),
        };
        let (sequence, ops, touched) = forward(remap(&s.sequence, &s.erased_a, &event, false));

        assert_eq!(
            ops,
            vec![ChangeOp::Change {
                position: 2,
                count: 1,
                payload: Some(payload),
            }]
        );
        assert_eq!(touched, 2..3);
        assert_eq!(values(&sequence)[2], Some(5));
    }

    #[test]
    fn test_stale_offset_drops_event() {
        let s = setup();
        let mut sequence = s.sequence.clone();
        sequence.remove_range(1..3);

        let event = ProviderEvent::RangeRemoved { start: 0, count: 1 };
        assert!(matches!(
            remap(&sequence, &s.erased_a, &event, false),
            Remap::Skip
        ));

        // Growing from empty needs the provider's rows laid out again.
        let event = ProviderEvent::RangeInserted { start: 0, count: 1 };
        assert!(matches!(
            remap(&sequence, &s.erased_a, &event, false),
            Remap::Refresh
        ));
    }

    #[test]
    fn test_full_change_without_rows_refreshes() {
        let s = setup();
        let mut sequence = s.sequence.clone();
        sequence.remove_range(1..3);
        assert_eq!(sequence.offset_of(s.erased_a.id()), None);

        assert!(matches!(
            remap(&sequence, &s.erased_a, &ProviderEvent::FullChange, false),
            Remap::Refresh
        ));
    }

    #[test]
    fn test_inconsistent_event_refreshes() {
        let s = setup();
        // The provider did not actually grow.
        let event = ProviderEvent::RangeInserted { start: 0, count: 2 };
        assert!(matches!(
            remap(&s.sequence, &s.erased_a, &event, false),
            Remap::Refresh
        ));

        let event = ProviderEvent::RangeChanged {
            start: 2,
            count: 5,
            payload: None,
        };
        assert!(matches!(
            remap(&s.sequence, &s.erased_b, &event, false),
            Remap::Refresh
        ));
        assert!(matches!(
            remap(&s.sequence, &s.erased_b, &ProviderEvent::FullChange, false),
            Remap::Refresh
        ));
    }

    #[test]
    fn test_emptied_provider_refreshes_when_asked() {
        let s = setup();
        s.a.clear();

        let event = ProviderEvent::RangeRemoved { start: 0, count: 2 };
        assert!(matches!(
            remap(&s.sequence, &s.erased_a, &event, true),
            Remap::Refresh
        ));
        let (_, ops, _) = forward(remap(&s.sequence, &s.erased_a, &event, false));
        assert_eq!(ops, vec![ChangeOp::Remove { position: 1, count: 2 }]);
    }

    struct Recorder(Mutex<Vec<(ProviderId, ProviderEvent)>>);

    impl RelaySink for Recorder {
        fn relay(&self, provider: ProviderId, event: &ProviderEvent) {
            self.0.lock().push((provider, event.clone()));
        }
    }

    #[test]
    fn test_relay_forwards_until_detached() {
        let s = setup();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let weak = Arc::downgrade(&recorder);
        let sink: Weak<dyn RelaySink> = weak;

        let relay = Relay::attach(&s.erased_a, sink);
        assert_eq!(relay.state(), RelayState::Attached);

        s.a.push(3);
        relay.detach(&s.erased_a);
        relay.detach(&s.erased_a);
        s.a.push(4);

        assert_eq!(relay.state(), RelayState::Detached);
        assert_eq!(s.a.signals().changed.connection_count(), 0);
        assert_eq!(
            *recorder.0.lock(),
            vec![(
                s.erased_a.id(),
                ProviderEvent::RangeInserted { start: 2, count: 1 }
            )]
        );
    }

    #[test]
    fn test_detach_after_connection_dropped() {
        let s = setup();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let weak = Arc::downgrade(&recorder);
        let sink: Weak<dyn RelaySink> = weak;

        let relay = Relay::attach(&s.erased_a, sink);
        assert!(s.a.signals().changed.disconnect(relay.connection));

        relay.detach(&s.erased_a);
        s.a.push(3);

        assert_eq!(relay.state(), RelayState::Detached);
        assert!(recorder.0.lock().is_empty());
    }
}
