//! Push-channel lifecycle as a pure state machine.
//!
//! The machine decides; the client loop performs the returned [`Effect`].
//! Inputs that make no sense in the current state (a transport result
//! arriving after `Disconnect`, say) are ignored.

use vocab_core::events::ConnectionState;

/// Something that happened to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionInput {
    /// Start connecting.
    Connect,
    /// The transport opened.
    Opened,
    /// The connect attempt failed.
    Failed,
    /// An open channel closed. `clean` is a normal close by the server.
    Closed {
        /// Whether the close was clean.
        clean: bool,
    },
    /// Unanswered pings; the channel is presumed dead.
    HeartbeatLost,
    /// A backoff delay elapsed.
    RetryDue,
    /// Network reachability changed.
    Online(bool),
    /// Stop for good.
    Disconnect,
}

/// What the client loop must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing.
    None,
    /// Open a transport.
    Open,
    /// Sleep out backoff delay number `attempt`, then feed `RetryDue`.
    ScheduleRetry {
        /// Zero-based attempt index.
        attempt: u32,
    },
    /// Retries are exhausted; fall back to last-known-good state.
    GiveUp {
        /// Attempts made.
        attempts: u32,
    },
    /// Drop any pending retry and close any open transport.
    Stop,
}

/// A state change and the effect to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// State before the input.
    pub from: ConnectionState,
    /// State after the input.
    pub to: ConnectionState,
    /// Work for the caller.
    pub effect: Effect,
}

impl Step {
    /// Whether the state changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Reconnect bookkeeping around [`ConnectionState`].
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    /// Consecutive failed attempts since the last successful open.
    attempt: u32,
    max_attempts: u32,
    online: bool,
    /// Set by `Connect`, cleared by `Disconnect`.
    wanted: bool,
    /// Retries ran out; only a reachability change restarts.
    exhausted: bool,
}

impl ConnectionMachine {
    /// A disconnected machine that gives up after `max_attempts` retries.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            max_attempts,
            online: true,
            wanted: false,
            exhausted: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed attempts.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether retries ran out.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether the network is believed reachable.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Feed one input.
    pub fn handle(&mut self, input: ConnectionInput) -> Step {
        use ConnectionInput as I;
        use ConnectionState as S;

        let from = self.state;
        let effect = match (from, input) {
            (_, I::Disconnect) => {
                self.wanted = false;
                self.attempt = 0;
                self.state = S::Disconnected;
                Effect::Stop
            }
            (S::Disconnected, I::Connect) => {
                self.wanted = true;
                self.exhausted = false;
                self.attempt = 0;
                if self.online {
                    self.state = S::Connecting;
                    Effect::Open
                } else {
                    Effect::None
                }
            }
            (S::Connecting, I::Opened) => {
                self.attempt = 0;
                self.state = S::Connected;
                Effect::None
            }
            (S::Connecting, I::Failed) => self.retry_or_give_up(),
            (S::Connected, I::Closed { clean: true }) => {
                self.state = S::Disconnected;
                Effect::Stop
            }
            (S::Connected, I::Closed { clean: false } | I::HeartbeatLost) => {
                self.retry_or_give_up()
            }
            (S::Reconnecting, I::RetryDue) => {
                self.state = S::Connecting;
                Effect::Open
            }
            (_, I::Online(online)) => self.reachability(online),
            _ => Effect::None,
        };

        Step {
            from,
            to: self.state,
            effect,
        }
    }

    fn retry_or_give_up(&mut self) -> Effect {
        if !self.online {
            self.state = ConnectionState::Disconnected;
            return Effect::Stop;
        }
        if self.attempt >= self.max_attempts {
            let attempts = self.attempt;
            self.state = ConnectionState::Disconnected;
            self.exhausted = true;
            self.attempt = 0;
            return Effect::GiveUp { attempts };
        }
        let attempt = self.attempt;
        self.attempt += 1;
        self.state = ConnectionState::Reconnecting;
        Effect::ScheduleRetry { attempt }
    }

    fn reachability(&mut self, online: bool) -> Effect {
        let was_online = std::mem::replace(&mut self.online, online);
        match (was_online, online, self.state) {
            (
                true,
                false,
                ConnectionState::Connected
                | ConnectionState::Connecting
                | ConnectionState::Reconnecting,
            ) => {
                self.state = ConnectionState::Disconnected;
                Effect::Stop
            }
            (false, true, ConnectionState::Disconnected) if self.wanted => {
                self.exhausted = false;
                self.attempt = 0;
                self.state = ConnectionState::Connecting;
                Effect::Open
            }
            _ => Effect::None,
        }
    }
}
