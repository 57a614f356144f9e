//! Generic name-keyed existence matching.

/// A record participating in set reconciliation. The exists flag is
/// transient — cleared at the start of every pass, never persisted.
pub trait Named {
    fn name(&self) -> &str;
    fn exists(&self) -> bool;
    fn set_exists(&mut self, exists: bool);
}

/// The outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct SetDiff<T> {
    pub create: Vec<T>,
    pub update: Vec<T>,
    pub delete: Vec<T>,
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Match elements of both collections by name (first-available match, so
/// duplicate names pair off in encounter order). Unmatched new elements are
/// the create set, unmatched old elements the delete set, and matched pairs
/// flagged by `needs_update` the update set.
pub fn reconcile<T, F>(old: &mut [T], new: &mut [T], needs_update: F) -> SetDiff<T>
where
    T: Named + Clone,
    F: Fn(&T, &T) -> bool,
{
    for item in old.iter_mut() {
        item.set_exists(false);
    }
    for item in new.iter_mut() {
        item.set_exists(false);
    }

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for ni in 0..new.len() {
        let name = new[ni].name().to_string();
        if let Some(oi) = old.iter().position(|o| o.name() == name && !o.exists()) {
            old[oi].set_exists(true);
            new[ni].set_exists(true);
            pairs.push((oi, ni));
        }
    }

    let mut diff = SetDiff::default();
    for item in new.iter() {
        if !item.exists() {
            diff.create.push(item.clone());
        }
    }
    for item in old.iter() {
        if !item.exists() {
            diff.delete.push(item.clone());
        }
    }
    for (oi, ni) in pairs {
        if needs_update(&old[oi], &new[ni]) {
            diff.update.push(new[ni].clone());
        }
    }
    diff
}
