use std::collections::BTreeMap;

/// Handle returned by [`Listeners::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

/// Named-event publish/subscribe registry.
///
/// Callbacks for one event name run in subscription order.
pub struct Listeners<E> {
    next_id: u64,
    by_name: BTreeMap<String, Vec<(ListenerId, Callback<E>)>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_name: BTreeMap::new(),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, name: &str, callback: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.by_name
            .entry(name.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription. Returns false if the id was unknown.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for callbacks in self.by_name.values_mut() {
            if let Some(pos) = callbacks.iter().position(|(existing, _)| *existing == id) {
                callbacks.remove(pos);
                return true;
            }
        }
        false
    }

    /// Invoke every callback registered under `name`. Returns how many ran.
    pub fn trigger(&mut self, name: &str, event: &E) -> usize {
        match self.by_name.get_mut(name) {
            Some(callbacks) => {
                for (_, callback) in callbacks.iter_mut() {
                    callback(event);
                }
                callbacks.len()
            }
            None => 0,
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, Vec::len)
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .by_name
            .iter()
            .map(|(name, callbacks)| (name.as_str(), callbacks.len()))
            .collect();
        f.debug_struct("Listeners").field("by_name", &counts).finish()
    }
}
