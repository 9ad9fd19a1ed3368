//! A reusable meeting point for the members of one group.
//!
//! Each member deposits one payload per round. When the last member arrives,
//! the round's payloads are published in slot order and every member leaves
//! with a shared copy. The next round cannot begin filling until every member
//! has picked up the previous one.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

struct Round {
    generation: u64,
    slots: Vec<Option<Bytes>>,
    arrived: usize,
    published: Option<Arc<Vec<Bytes>>>,
    pending_readers: usize,
}

pub(crate) struct Rendezvous {
    parties: usize,
    round: Mutex<Round>,
    changed: Condvar,
}

impl Rendezvous {
    pub(crate) fn new(parties: usize) -> Self {
        Self {
            parties,
            round: Mutex::new(Round {
                generation: 0,
                slots: vec![None; parties],
                arrived: 0,
                published: None,
                pending_readers: 0,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Round> {
        self.round.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Round>) -> MutexGuard<'a, Round> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deposit `payload` in `slot` and block until every party has deposited.
    ///
    /// `slot` must be below the number of parties and unique per caller.
    pub(crate) fn exchange(&self, slot: usize, payload: Bytes) -> Arc<Vec<Bytes>> {
        let mut round = self.lock();

        // Previous round still draining.
        while round.published.is_some() {
            round = self.wait(round);
        }

        let generation = round.generation;
        debug_assert!(round.slots[slot].is_none(), "slot {slot} filled twice in one round");
        round.slots[slot] = Some(payload);
        round.arrived += 1;

        if round.arrived == self.parties {
            debug_assert!(
                round.slots.iter().all(Option::is_some),
                "every party arrived but a slot is empty"
            );
            let parts: Vec<Bytes> = round
                .slots
                .iter_mut()
                .map(|s| s.take().unwrap_or_default())
                .collect();
            round.published = Some(Arc::new(parts));
            round.pending_readers = self.parties;
            round.arrived = 0;
            self.changed.notify_all();
        } else {
            while !(round.published.is_some() && round.generation == generation) {
                round = self.wait(round);
            }
        }

        debug_assert!(round.published.is_some(), "reader woke without a published round");
        let parts = round.published.clone().unwrap_or_default();
        round.pending_readers -= 1;
        if round.pending_readers == 0 {
            round.published = None;
            round.generation += 1;
            self.changed.notify_all();
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_party_returns_own_payload() {
        let rv = Rendezvous::new(1);
        let parts = rv.exchange(0, Bytes::from_static(b"solo"));
        assert_eq!(parts.as_slice(), &[Bytes::from_static(b"solo")]);

        // Reusable.
        let parts = rv.exchange(0, Bytes::from_static(b"again"));
        assert_eq!(parts[0], Bytes::from_static(b"again"));
    }

    #[test]
    fn parties_see_all_payloads_in_slot_order() {
        let parties = 4;
        let rv = Arc::new(Rendezvous::new(parties));

        let handles: Vec<_> = (0..parties)
            .map(|slot| {
                let rv = Arc::clone(&rv);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    for round in 0..10u8 {
                        let parts = rv.exchange(slot, Bytes::from(vec![slot as u8, round]));
                        seen.push(parts);
                    }
                    seen
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            for (round, parts) in seen.iter().enumerate() {
                assert_eq!(parts.len(), parties);
                for (slot, part) in parts.iter().enumerate() {
                    assert_eq!(part.as_ref(), &[slot as u8, round as u8]);
                }
            }
        }
    }

    #[test]
    fn varied_payloads_survive_many_rounds() {
        let parties = 3;
        let rounds = 50usize;
        let rv = Arc::new(Rendezvous::new(parties));

        let handles: Vec<_> = (0..parties)
            .map(|slot| {
                let rv = Arc::clone(&rv);
                thread::spawn(move || {
                    (0..rounds)
                        .map(|round| {
                            let len = (slot * 7 + round) % 13 + 1;
                            rv.exchange(slot, Bytes::from(vec![slot as u8; len]))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            assert_eq!(seen.len(), rounds);
            for (round, parts) in seen.iter().enumerate() {
                assert_eq!(parts.len(), parties);
                for (slot, part) in parts.iter().enumerate() {
                    assert_eq!(part.len(), (slot * 7 + round) % 13 + 1);
                    assert!(part.iter().all(|b| *b == slot as u8));
                }
            }
        }
    }

    #[test]
    fn empty_payloads_are_delivered() {
        let rv = Arc::new(Rendezvous::new(2));
        let other = {
            let rv = Arc::clone(&rv);
            thread::spawn(move || rv.exchange(1, Bytes::from_static(b"x")))
        };
        let parts = rv.exchange(0, Bytes::new());
        assert_eq!(parts.as_slice(), &[Bytes::new(), Bytes::from_static(b"x")]);
        assert_eq!(other.join().unwrap(), parts);
    }
}
