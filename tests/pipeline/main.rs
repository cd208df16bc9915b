mod common;

mod debounce;
mod fallback;
mod gating;
mod inflight;
mod snapshot;
