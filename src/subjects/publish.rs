//! # PublishSubject: hot multicast of live signals.
//!
//! ```text
//! producer ─► subject.next(v) ─► roster snapshot ─┬─► member A (serialized)
//!                                                 ├─► member B (serialized)
//!                                                 └─► ...
//! ```
//!
//! ## Rules
//! - Subscribers only see items emitted after they joined.
//! - The roster is an immutable vector swapped atomically; emission iterates a snapshot.
//! - A terminal signal swaps the roster to `Terminated` exactly once. Late subscribers
//!   receive the stored terminal signal right after `on_subscribe`.
//! - A second terminal error goes to the plugin hub.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::disposables::{Disposable, DisposableRef};
use crate::error::RxError;
use crate::observable::{Observable, ObservableSource};
use crate::observers::{BoxObserver, Observer, SerializedObserver};
use crate::plugins::Plugins;
use crate::subjects::Subject;

enum Roster<T> {
    Active(Vec<Arc<Member<T>>>),
    Terminated,
}

struct Hub<T> {
    roster: ArcSwap<Roster<T>>,
    /// Guards the terminal transition and holds its error.
    error: Mutex<Option<RxError>>,
}

impl<T: Send + 'static> Hub<T> {
    fn add(&self, member: &Arc<Member<T>>) -> bool {
        loop {
            let current = self.roster.load_full();
            let next = match &*current {
                Roster::Terminated => return false,
                Roster::Active(members) => {
                    let mut members = members.clone();
                    members.push(Arc::clone(member));
                    Roster::Active(members)
                }
            };
            let prev = self.roster.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*prev, &current) {
                return true;
            }
        }
    }

    fn remove(&self, member: &Member<T>) {
        loop {
            let current = self.roster.load_full();
            let Roster::Active(members) = &*current else {
                return;
            };
            let Some(at) = members.iter().position(|m| std::ptr::eq(&**m, member)) else {
                return;
            };
            let mut members = members.clone();
            members.remove(at);
            let prev = self
                .roster
                .compare_and_swap(&current, Arc::new(Roster::Active(members)));
            if Arc::ptr_eq(&*prev, &current) {
                return;
            }
        }
    }

    /// Moves to `Terminated`, returning the members to notify, or `None` if already there.
    fn terminate(&self, error: Option<RxError>) -> Option<Vec<Arc<Member<T>>>> {
        let mut slot = self.error.lock();
        if matches!(&**self.roster.load(), Roster::Terminated) {
            return None;
        }
        *slot = error;
        let prev = self.roster.swap(Arc::new(Roster::Terminated));
        match &*prev {
            Roster::Active(members) => Some(members.clone()),
            Roster::Terminated => Some(Vec::new()),
        }
    }

    fn is_terminated(&self) -> bool {
        matches!(&**self.roster.load(), Roster::Terminated)
    }
}

/// One subscribed observer.
struct Member<T> {
    downstream: SerializedObserver<T>,
    disposed: AtomicBool,
    hub: Weak<Hub<T>>,
}

impl<T: Send + 'static> Disposable for Member<T> {
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            if let Some(hub) = self.hub.upgrade() {
                hub.remove(self);
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Member<T> {
    fn next(&self, value: T) {
        if !self.is_disposed() {
            self.downstream.next(value);
        }
    }

    fn terminate(&self, error: Option<RxError>) {
        if self.is_disposed() {
            return;
        }
        match error {
            Some(error) => self.downstream.error(error),
            None => self.downstream.complete(),
        }
    }
}

/// A subject that relays live signals to every current subscriber.
///
/// # Example
/// ```
/// use rxvisor::{PublishSubject, Subject};
///
/// let subject = PublishSubject::new();
/// subject.next("lost"); // no subscriber yet
/// subject.to_observable().subscribe_next(|v| println!("{v}")).unwrap();
/// subject.next("seen");
/// subject.complete();
/// assert!(subject.has_complete());
/// ```
pub struct PublishSubject<T> {
    hub: Arc<Hub<T>>,
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
    /// Creates a subject without subscribers.
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Hub {
                roster: ArcSwap::from_pointee(Roster::Active(Vec::new())),
                error: Mutex::new(None),
            }),
        }
    }

    /// Emits `value` to every current subscriber.
    pub fn next(&self, value: T) {
        let roster = self.hub.roster.load();
        if let Roster::Active(members) = &**roster {
            for member in members {
                member.next(value.clone());
            }
        }
    }

    /// Terminates every subscriber with `error`.
    pub fn error(&self, error: RxError) {
        match self.hub.terminate(Some(error.clone())) {
            Some(members) => {
                for member in members {
                    member.terminate(Some(error.clone()));
                }
            }
            None => Plugins::global().on_error(error),
        }
    }

    /// Completes every subscriber.
    pub fn complete(&self) {
        if let Some(members) = self.hub.terminate(None) {
            for member in members {
                member.terminate(None);
            }
        }
    }
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for PublishSubject<T> {
    fn on_subscribe(&mut self, d: DisposableRef) {
        if self.hub.is_terminated() {
            d.dispose();
        }
    }

    fn on_next(&mut self, value: T) {
        self.next(value);
    }

    fn on_error(&mut self, error: RxError) {
        self.error(error);
    }

    fn on_complete(&mut self) {
        self.complete();
    }
}

struct PublishSource<T> {
    hub: Arc<Hub<T>>,
}

impl<T: Send + 'static> ObservableSource<T> for PublishSource<T> {
    fn subscribe_actual(&self, observer: BoxObserver<T>) -> Result<(), RxError> {
        let member = Arc::new(Member {
            downstream: SerializedObserver::new(observer, false),
            disposed: AtomicBool::new(false),
            hub: Arc::downgrade(&self.hub),
        });
        member.downstream.subscribe(member.clone());
        if self.hub.add(&member) {
            if member.is_disposed() {
                self.hub.remove(&member);
            }
        } else {
            let error = self.hub.error.lock().clone();
            member.terminate(error);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "publish_subject"
    }
}

impl<T: Clone + Send + 'static> Subject<T> for PublishSubject<T> {
    fn has_observers(&self) -> bool {
        matches!(&**self.hub.roster.load(), Roster::Active(members) if !members.is_empty())
    }

    fn has_throwable(&self) -> bool {
        self.hub.is_terminated() && self.hub.error.lock().is_some()
    }

    fn has_complete(&self) -> bool {
        self.hub.is_terminated() && self.hub.error.lock().is_none()
    }

    fn throwable(&self) -> Option<RxError> {
        if self.hub.is_terminated() {
            self.hub.error.lock().clone()
        } else {
            None
        }
    }

    fn to_observable(&self) -> Observable<T> {
        Observable::assemble(PublishSource {
            hub: Arc::clone(&self.hub),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{Event, Recorder, with_global_errors};

    #[test]
    fn late_subscribers_miss_earlier_items() {
        let subject = PublishSubject::new();
        let early = Recorder::new();
        subject.to_observable().subscribe(early.boxed()).unwrap();
        subject.next(1);
        let late = Recorder::new();
        subject.to_observable().subscribe(late.boxed()).unwrap();
        subject.next(2);
        subject.complete();

        assert_eq!(early.values(), vec![1, 2]);
        assert_eq!(late.values(), vec![2]);
        early.assert_protocol();
        late.assert_protocol();
        assert!(subject.has_complete());
        assert!(!subject.has_observers());
    }

    #[test]
    fn subscribing_after_termination_replays_the_terminal() {
        let subject = PublishSubject::<u8>::new();
        subject.error(RxError::illegal_state("closed"));
        let rec = Recorder::new();
        subject.to_observable().subscribe(rec.boxed()).unwrap();
        assert_eq!(
            rec.events(),
            vec![Event::Subscribe, Event::Error("rx_illegal_state".into())]
        );
        assert!(subject.has_throwable());
        assert_eq!(subject.throwable().map(|e| e.kind()), Some(ErrorKind::IllegalState));
    }

    #[test]
    fn disposed_members_leave_the_roster() {
        let subject = PublishSubject::new();
        let rec = Recorder::new();
        subject.to_observable().subscribe(rec.boxed()).unwrap();
        assert!(subject.has_observers());
        rec.dispose();
        assert!(!subject.has_observers());
        subject.next('x');
        assert!(rec.values().is_empty());
    }

    #[test]
    fn second_terminal_error_is_undeliverable() {
        with_global_errors(|seen| {
            let subject = PublishSubject::<u8>::new();
            subject.complete();
            subject.error(RxError::null("after the end of the subject"));
            assert!(
                seen.lock()
                    .iter()
                    .any(|e| e.to_string().contains("after the end of the subject"))
            );
            assert!(subject.has_complete());
        });
    }

    #[test]
    fn works_as_an_observer_of_another_observable() {
        let subject = PublishSubject::new();
        let rec = Recorder::new();
        subject.to_observable().subscribe(rec.boxed()).unwrap();
        Observable::from_iter(vec![1, 2, 3])
            .subscribe_with(subject.clone())
            .unwrap();
        assert_eq!(rec.values(), vec![1, 2, 3]);
        assert!(rec.is_completed());
    }
}
