//! The collection lifecycle state machine:
//! unopened -> open -> closing -> terminal.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unopened,
    Open,
    Closing,
    Terminal,
}
