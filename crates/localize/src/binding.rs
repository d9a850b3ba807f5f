//! Weakly keyed context -> locale bindings.
//!
//! Contexts are host objects shared through `Arc`. The table keys them by
//! allocation address and keeps only a `Weak` back-reference, so a binding
//! never extends a context's lifetime. A binding whose context has been
//! dropped stays in the table until it is swept or its address is reused by
//! a new binding; either way its locale is handed back exactly once so the
//! caller can release the requirement it holds.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

type ContextId = usize;

fn context_id<C: Send + Sync + 'static>(context: &Arc<C>) -> ContextId {
    Arc::as_ptr(context) as *const () as usize
}

struct Binding {
    context: Weak<dyn Any + Send + Sync>,
    locale: String,
}

impl Binding {
    fn is_released(&self) -> bool {
        self.context.strong_count() == 0
    }
}

#[derive(Default)]
pub(crate) struct BindingTable {
    entries: HashMap<ContextId, Binding>,
}

impl BindingTable {
    /// Bind `context` to `locale`.
    ///
    /// Returns the locale of the binding that was displaced at this address,
    /// whose requirement the caller must release.
    pub(crate) fn bind<C: Send + Sync + 'static>(
        &mut self,
        context: &Arc<C>,
        locale: String,
    ) -> Option<String> {
        let weak: Weak<C> = Arc::downgrade(context);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.entries
            .insert(
                context_id(context),
                Binding {
                    context: weak,
                    locale,
                },
            )
            .map(|previous| previous.locale)
    }

    /// Remove the binding at `context`'s address, returning its locale.
    pub(crate) fn unbind<C: Send + Sync + 'static>(&mut self, context: &Arc<C>) -> Option<String> {
        self.entries
            .remove(&context_id(context))
            .map(|binding| binding.locale)
    }

    /// Locale bound to the live `context`.
    pub(crate) fn locale_of<C: Send + Sync + 'static>(&self, context: &Arc<C>) -> Option<&str> {
        self.entries
            .get(&context_id(context))
            .filter(|binding| !binding.is_released())
            .map(|binding| binding.locale.as_str())
    }

    /// Drop bindings whose context is gone, returning their locales.
    pub(crate) fn sweep(&mut self) -> Vec<String> {
        let mut released = Vec::new();
        self.entries.retain(|_, binding| {
            if binding.is_released() {
                released.push(std::mem::take(&mut binding.locale));
                false
            } else {
                true
            }
        });
        released
    }

    /// Bindings currently holding a requirement on `locale`, swept or not.
    pub(crate) fn count_for(&self, locale: &str) -> usize {
        self.entries
            .values()
            .filter(|binding| binding.locale == locale)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
