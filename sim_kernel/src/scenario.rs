//! Underflow scenario
//!
//! A fixed set of periodic consumers sharing one period, driven on a narrow
//! simulated counter so that the counter wraps every few groups. Each
//! consumer receives one message per period, numbered from 1. A stalled or
//! skipped sequence number is the failure being guarded against.

use crate::fault_injection::FaultPlan;
use crate::mailbox::MailboxDispatcher;
use crate::message_queue::TimerMessage;
use crate::timer::SimTickSource;
use core_types::ConsumerId;
use evtimer::{
    EventHandle, EvtimerConfig, EvtimerError, EvtimerStats, Payload, SharedEvtimer, Tick, TickWidth,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

/// Base of the consumer id range; slot `n` is `CONSUMER_ID_BASE + n`
pub const CONSUMER_ID_BASE: u128 = 0xe7_0000;

/// Scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of periodic consumers
    pub consumers: usize,
    /// Period shared by every consumer, in ticks
    pub period_ticks: u64,
    /// Width of the simulated counter
    pub counter_bits: u32,
    /// Counter value at start
    pub start_tick: u32,
    /// Ticks between consecutive consumers' first deadlines
    pub stagger_ticks: u64,
    /// Messages each mailbox holds before dropping
    ///
    /// A late callback that catches up more periods than this loses the
    /// overflow: the consumer sees a sequence gap and `dropped()` counts it.
    pub mailbox_capacity: usize,
    pub faults: FaultPlan,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            consumers: 8,
            period_ticks: 100,
            counter_bits: 8,
            start_tick: 0,
            stagger_ticks: 0,
            mailbox_capacity: 16,
            faults: FaultPlan::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.consumers == 0 {
            return Err(ScenarioError::InvalidConfig(
                "consumers must be at least 1".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(ScenarioError::InvalidConfig(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }
        self.stagger_span()?;
        Ok(())
    }

    /// Ticks between the first and last consumer's first deadline
    pub fn stagger_span(&self) -> Result<u64, ScenarioError> {
        let width = TickWidth::new(self.counter_bits)?;
        let last_slot = self.consumers.saturating_sub(1) as u64;
        match self.stagger_ticks.checked_mul(last_slot) {
            Some(span) if span <= width.max_delay() => Ok(span),
            _ => Err(ScenarioError::InvalidConfig(format!(
                "stagger_ticks {} over {} consumers exceeds the {}-bit delay limit {}",
                self.stagger_ticks,
                self.consumers,
                self.counter_bits,
                width.max_delay()
            ))),
        }
    }
}

/// Scenario errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("Timer error: {0}")]
    Timer(#[from] EvtimerError),

    #[error("Invalid scenario config: {0}")]
    InvalidConfig(String),

    /// Nothing armed and nothing pending: no message will ever arrive
    #[error("Timer idle at {now}")]
    Idle { now: Tick },
}

/// A registered consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSlot {
    pub id: ConsumerId,
    pub handle: EventHandle,
}

/// Periodic consumers on a wrapping simulated counter
pub struct UnderflowScenario {
    config: ScenarioConfig,
    source: SimTickSource,
    timer: SharedEvtimer<SimTickSource>,
    mailboxes: Arc<Mutex<MailboxDispatcher>>,
    consumers: Vec<ConsumerSlot>,
}

impl UnderflowScenario {
    /// Builds the counter and scheduler, and registers every consumer
    pub fn new(config: ScenarioConfig, timer_config: EvtimerConfig) -> Result<Self, ScenarioError> {
        config.validate()?;

        let source = SimTickSource::with_start(config.counter_bits, config.start_tick)?
            .with_faults(&config.faults);
        let timer = SharedEvtimer::new(source.clone(), timer_config)?;

        let mut mailboxes = MailboxDispatcher::new(config.mailbox_capacity);
        let dispatch_cost = config.faults.dispatch_cost();
        if dispatch_cost > 0 {
            mailboxes = mailboxes.with_dispatch_cost(source.clone(), dispatch_cost);
        }

        // every consumer gets the same absolute first deadline (plus stagger),
        // however long registration itself takes
        let width = source.width();
        let first = width.add(timer.now(), config.period_ticks);
        let mut consumers = Vec::with_capacity(config.consumers);
        for slot in 0..config.consumers {
            let id = ConsumerId::from_u128(CONSUMER_ID_BASE + slot as u128);
            mailboxes.add_consumer(id);
            let offset = config
                .stagger_ticks
                .checked_mul(slot as u64)
                .ok_or_else(|| ScenarioError::InvalidConfig("stagger_ticks overflows".to_string()))?;
            let deadline = width.add(first, offset);
            let handle = timer.register_at(
                deadline,
                Some(config.period_ticks),
                id,
                Payload(slot as u32),
            )?;
            consumers.push(ConsumerSlot { id, handle });
        }

        let mailboxes = Arc::new(Mutex::new(mailboxes));
        let handler_timer = timer.clone();
        let handler_mailboxes = Arc::clone(&mailboxes);
        source.set_compare_handler(move || {
            let mut mailboxes = handler_mailboxes
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            handler_timer.on_compare_match(&mut *mailboxes);
        });

        info!(
            consumers = config.consumers,
            period = config.period_ticks,
            bits = config.counter_bits,
            "underflow scenario started"
        );

        Ok(Self {
            config,
            source,
            timer,
            mailboxes,
            consumers,
        })
    }

    /// Advances to the next compare and returns what consumers received
    pub fn step_messages(&mut self) -> Result<Vec<TimerMessage>, ScenarioError> {
        if !self.source.advance_to_compare() {
            return Err(ScenarioError::Idle {
                now: self.source.current(),
            });
        }
        let messages = self.mailboxes().drain_round_robin();
        debug!(
            now = self.source.current().raw(),
            received = messages.len(),
            "scenario step"
        );
        Ok(messages)
    }

    /// Advances to the next compare and returns the consumers' output lines
    pub fn step(&mut self) -> Result<Vec<String>, ScenarioError> {
        Ok(self
            .step_messages()?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Steps until at least `count` messages have been received
    pub fn run_messages(&mut self, count: usize) -> Result<Vec<TimerMessage>, ScenarioError> {
        let mut received = Vec::with_capacity(count);
        while received.len() < count {
            received.extend(self.step_messages()?);
        }
        Ok(received)
    }

    /// Cancels one consumer's event
    pub fn cancel_consumer(&mut self, slot: usize) -> bool {
        match self.consumers.get(slot) {
            Some(consumer) => self.timer.cancel(consumer.handle),
            None => false,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn consumers(&self) -> &[ConsumerSlot] {
        &self.consumers
    }

    pub fn timer(&self) -> &SharedEvtimer<SimTickSource> {
        &self.timer
    }

    pub fn source(&self) -> &SimTickSource {
        &self.source
    }

    pub fn stats(&self) -> EvtimerStats {
        self.timer.stats()
    }

    /// Messages lost to full mailboxes
    pub fn dropped(&self) -> u64 {
        self.mailboxes().dropped()
    }

    fn mailboxes(&self) -> MutexGuard<'_, MailboxDispatcher> {
        self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for UnderflowScenario {
    fn drop(&mut self) {
        // the handler holds the timer, which holds the source
        self.source.clear_compare_handler();
    }
}
