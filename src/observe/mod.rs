use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Explicit observer list for headless state machines.
///
/// Callbacks are cloned out before being invoked, so a callback may subscribe,
/// unsubscribe or call back into the owner that is notifying.
pub struct Subscribers<E> {
    next_id: Cell<u64>,
    list: RefCell<Vec<(SubscriptionId, Rc<dyn Fn(&E)>)>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            list: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, f: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.list.borrow_mut().push((id, Rc::new(f)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.list.borrow_mut();
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        list.len() != before
    }

    pub fn notify(&self, event: &E) {
        let callbacks: Vec<Rc<dyn Fn(&E)>> =
            self.list.borrow().iter().map(|(_, f)| f.clone()).collect();
        for f in callbacks {
            f(event);
        }
    }

    pub fn clear(&self) {
        self.list.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.list.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_in_subscription_order() {
        let subs: Subscribers<u32> = Subscribers::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = seen.clone();
        subs.subscribe(move |e| s1.borrow_mut().push(("a", *e)));
        let s2 = seen.clone();
        subs.subscribe(move |e| s2.borrow_mut().push(("b", *e)));

        subs.notify(&5);
        assert_eq!(*seen.borrow(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn test_unsubscribe_inside_callback() {
        let subs: Rc<Subscribers<()>> = Rc::new(Subscribers::new());
        let hits = Rc::new(Cell::new(0));

        let id_cell: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (subs2, hits2, id2) = (subs.clone(), hits.clone(), id_cell.clone());
        let id = subs.subscribe(move |_| {
            hits2.set(hits2.get() + 1);
            if let Some(id) = id2.get() {
                subs2.unsubscribe(id);
            }
        });
        id_cell.set(Some(id));

        subs.notify(&());
        subs.notify(&());
        assert_eq!(hits.get(), 1);
        assert!(subs.is_empty());
    }
}
