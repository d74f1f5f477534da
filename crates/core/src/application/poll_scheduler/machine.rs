//! Poll cadence state machine
//!
//! Pure decision logic: given the current mode, an event and the turbo end
//! time, produce the next mode and the timer/poll actions to perform. The
//! runner executes actions in order and owns the actual timers.

/// Cadence the consumer is polling at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Not started yet
    Idle,
    Normal,
    Turbo,
}

/// Which timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Normal,
    Turbo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Tick(TimerKind),
    /// The persisted turbo window changed
    StateChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Poll,
    ArmNormal,
    CancelNormal,
    ArmTurbo,
    CancelTurbo,
    /// Drop a stored turbo window that has ended
    ClearTurboWindow,
}

/// Advance the machine by one event
pub fn step(mode: Mode, event: Event, now_ms: i64, turbo_end_ms: Option<i64>) -> (Mode, Vec<Action>) {
    let turbo_active = turbo_end_ms.is_some_and(|end| now_ms < end);
    let window_expired = turbo_end_ms.is_some() && !turbo_active;

    match event {
        Event::Start | Event::StateChanged => reconcile(mode, turbo_active, window_expired),

        Event::Tick(TimerKind::Normal) => match mode {
            Mode::Normal => (Mode::Normal, vec![Action::Poll]),
            // Stale firing from a timer that was already cancelled
            other => (other, vec![]),
        },

        Event::Tick(TimerKind::Turbo) => match mode {
            Mode::Turbo if turbo_active => (Mode::Turbo, vec![Action::Poll, Action::ArmTurbo]),
            Mode::Turbo => {
                let mut actions = vec![Action::Poll, Action::CancelTurbo, Action::ArmNormal];
                if window_expired {
                    actions.push(Action::ClearTurboWindow);
                }
                (Mode::Normal, actions)
            }
            other => (other, vec![]),
        },
    }
}

/// Pick the mode from scratch; entering turbo polls right away and an
/// already running normal cadence is left alone
fn reconcile(mode: Mode, turbo_active: bool, window_expired: bool) -> (Mode, Vec<Action>) {
    if turbo_active {
        return (
            Mode::Turbo,
            vec![Action::CancelNormal, Action::Poll, Action::ArmTurbo],
        );
    }
    let mut actions = match mode {
        Mode::Normal => vec![],
        _ => vec![Action::CancelTurbo, Action::ArmNormal],
    };
    if window_expired {
        actions.push(Action::ClearTurboWindow);
    }
    (Mode::Normal, actions)
}
