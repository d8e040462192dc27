//! Interface contracts for collaborators outside the deterministic core:
//! asset loading. Rendering, audio, and input capture are consulted through
//! similarly narrow host-defined contracts but have no interface mandated
//! here, since the core never calls into them.

/// Fetches data by id. Used only outside the tick loop (typically during
/// `setup`/`reset`); never consulted for determinism.
pub trait Loader {
    fn fetch_data(&self, id: &str, required_for_validation: bool) -> String;
}

/// Wraps an inner [`Loader`] so that non-essential fetches are skipped
/// (returning empty) while fetches marked `required_for_validation` are
/// forwarded. This is the only headless variant the core provides; an
/// unconditional always-empty loader is not implemented (see `DESIGN.md`).
pub struct HeadlessLoader<L: Loader> {
    inner: L,
}

impl<L: Loader> HeadlessLoader<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: Loader> Loader for HeadlessLoader<L> {
    fn fetch_data(&self, id: &str, required_for_validation: bool) -> String {
        if required_for_validation {
            self.inner.fetch_data(id, required_for_validation)
        } else {
            String::new()
        }
    }
}
