use std::sync::{Condvar, Mutex};

struct RendezvousSync {
    counter: [usize; 2],
    current: usize,
}

/// A counted barrier for a fixed group of collector threads. Two counters
/// alternate, so a thread that races ahead to the next rendezvous cannot
/// disturb the threads still leaving the previous one.
pub struct Rendezvous {
    parties: usize,
    sync: Mutex<RendezvousSync>,
    condvar: Condvar,
}

impl Rendezvous {
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0);
        Rendezvous {
            parties,
            sync: Mutex::new(RendezvousSync {
                counter: [0, 0],
                current: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Wait until every party has arrived. Returns the arrival order,
    /// starting at 1. The first thread to arrive is the elected one.
    pub fn rendezvous(&self) -> usize {
        let mut inner = self.sync.lock().unwrap();
        let i = inner.current;
        inner.counter[i] += 1;
        let me = inner.counter[i];
        if me == self.parties {
            inner.current ^= 1;
            let next = inner.current;
            inner.counter[next] = 0;
            self.condvar.notify_all();
        } else {
            while inner.counter[i] < self.parties {
                inner = self.condvar.wait(inner).unwrap();
            }
        }
        me
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn single_party_never_waits() {
        let r = Rendezvous::new(1);
        assert_eq!(r.rendezvous(), 1);
        assert_eq!(r.rendezvous(), 1);
    }

    #[test]
    fn orders_are_a_permutation() {
        const N: usize = 6;
        const ROUNDS: usize = 50;
        let r = Arc::new(Rendezvous::new(N));
        let phase = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..N)
            .map(|_| {
                let r = r.clone();
                let phase = phase.clone();
                std::thread::spawn(move || {
                    let mut orders = vec![];
                    for round in 0..ROUNDS {
                        // Nobody may see a phase from a later round before everyone arrived.
                        assert!(phase.load(Ordering::SeqCst) >= round);
                        let order = r.rendezvous();
                        if order == 1 {
                            phase.fetch_add(1, Ordering::SeqCst);
                        }
                        orders.push(order);
                        r.rendezvous();
                    }
                    orders
                })
            })
            .collect();
        let all: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for round in 0..ROUNDS {
            let mut orders: Vec<usize> = all.iter().map(|o| o[round]).collect();
            orders.sort_unstable();
            assert_eq!(orders, (1..=N).collect::<Vec<_>>());
        }
        assert_eq!(phase.load(Ordering::SeqCst), ROUNDS);
    }
}
