use std::sync::Arc;

use fx_core::{ComponentRegistry, World};

use crate::clock::{SimClock, TimeSource, Timestamp};
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::effects::{EffectRegistry, ServerAuthority, StatusEffects, SweepReport};
use crate::error::SimResult;
use crate::event::EventLog;
use crate::system::System;

/// The authoritative step loop.
///
/// Owns the world, clock, effect engine, and registered systems. Each step
/// runs every system at the current time, sweeps expired effects, then moves
/// the clock forward one tick.
pub struct Simulation {
    world: World,
    clock: SimClock,
    effects: StatusEffects<ServerAuthority>,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
    last_sweep: SweepReport,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("systems", &self.systems.len())
            .field("events", &self.effects.log().len())
            .finish()
    }
}

impl Simulation {
    /// A simulation over `world` with no systems.
    pub fn new(
        world: World,
        registry: impl Into<Arc<EffectRegistry>>,
        components: impl Into<Arc<ComponentRegistry>>,
        config: SimConfig,
    ) -> Self {
        let clock = SimClock::new(config.tick_length);
        let mut effects =
            StatusEffects::new(registry, components).with_max_events(config.max_events);
        effects.sync_clock(&clock);
        Self {
            world,
            clock,
            effects,
            systems: Vec::new(),
            initialized: false,
            last_sweep: SweepReport::default(),
        }
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                world: &mut self.world,
                clock: &self.clock,
                effects: &mut self.effects,
            };
            let result = system.init(&mut ctx);
            self.systems[i] = system;
            result?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Run one step.
    pub fn tick(&mut self) -> SimResult<()> {
        if !self.initialized {
            self.init()?;
        }

        self.effects.sync_clock(&self.clock);
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let mut ctx = SimContext {
                world: &mut self.world,
                clock: &self.clock,
                effects: &mut self.effects,
            };
            let result = system.tick(&mut ctx);
            self.systems[i] = system;
            result?;
        }

        self.last_sweep = self.effects.sweep(&mut self.world);
        self.clock.advance();
        self.effects.sync_clock(&self.clock);
        Ok(())
    }

    /// Run `n` steps.
    pub fn run(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Run steps until the clock reaches `time`.
    pub fn run_until(&mut self, time: Timestamp) -> SimResult<()> {
        while self.clock.now() < time {
            self.tick()?;
        }
        Ok(())
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the simulated world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The authoritative effect engine.
    pub fn effects(&self) -> &StatusEffects<ServerAuthority> {
        &self.effects
    }

    /// Subscribe handlers here.
    pub fn effects_mut(&mut self) -> &mut StatusEffects<ServerAuthority> {
        &mut self.effects
    }

    /// The world and the effect engine together, for calls between steps.
    pub fn parts_mut(&mut self) -> (&mut World, &mut StatusEffects<ServerAuthority>) {
        (&mut self.world, &mut self.effects)
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The current simulated time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The engine's lifecycle log.
    pub fn events(&self) -> &EventLog {
        self.effects.log()
    }

    /// What the most recent step's sweep removed.
    pub fn last_sweep(&self) -> SweepReport {
        self.last_sweep
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> World {
        self.world
    }

    /// Steps run so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn tick(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
