//! Fission reactor: thermal dynamics, fuel burn, automatic temperature
//! control and the fire / meltdown failure progression.
//!
//! All percentages (`temperature`, `fission_rate`, `turbine_output`) live in
//! `[0, 100]`. Once `melted` is set the reactor is frozen for good.

use serde::{Deserialize, Serialize};

use crate::fuel_rod::FuelRod;
use crate::math::{adjust_without_overshoot, clamp, lerp, nearly_equal, sign, Band};
use crate::powered::{Powered, Resolution, Simulated};
use crate::{PowerPriority, PowerRange, ReactorDef, Signal};

/// Rate at which external setpoints move the internal targets (%/s).
const SIGNAL_SLEW_PER_S: f64 = 5.0;
/// Auto-control nudge speed (%/s).
const AUTO_TEMP_SPEED: f64 = 2.0;
/// Max step of the smoothed "correct" turbine output per second.
const CORRECT_OUTPUT_STEP: f64 = 20.0;
/// Temperature moves toward its resting point at this rate (%/s).
const TEMPERATURE_RATE: f64 = 10.0;

/// Half-widths of the optimal turbine band, derived from operator skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Tolerance {
    optimal: f64,
}

impl Tolerance {
    fn for_skill(degree_of_success: f64) -> Self {
        Self {
            optimal: lerp(2.5, 10.0, degree_of_success),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reactor {
    rods: [Option<FuelRod>; 4],
    max_power_output: f64,
    fuel_consumption_rate: f64,
    melt_down_delay: f64,
    fire_delay: f64,
    reactor_max_health: f64,
    reactor_health: f64,
    degree_of_success: f64,
    tolerance: Tolerance,
    power_on: bool,
    auto_temp: bool,

    temperature: f64,
    fission_rate: f64,
    turbine_output: f64,
    target_fission_rate: f64,
    target_turbine_output: f64,
    signal_fission_rate: Signal,
    signal_turbine_output: Signal,
    correct_turbine_output: f64,

    optimal_temperature: Band,
    allowed_temperature: Band,
    optimal_fission_rate: Band,
    allowed_fission_rate: Band,
    optimal_turbine_output: Band,

    /// Share of the grid load this reactor is expected to cover.
    load: f64,
    min_update_power_out: f64,
    max_update_power_out: f64,
    last_output: f64,

    melt_down_timer: f64,
    fire_timer: f64,
    on_fire: f64,
    burning: bool,
    melted: bool,
}

impl Reactor {
    pub fn new(def: &ReactorDef) -> Self {
        let multiplier = def.max_power_output_multiplier.max(0.0);
        let reactor_max_health = def.reactor_max_health.max(1.0);
        let degree_of_success = clamp(def.degree_of_success, 0.0, 1.0);
        let mut reactor = Self {
            rods: def.rods.map(|slot| slot.map(|rod| FuelRod::new(&rod))),
            max_power_output: (def.max_power_output * multiplier).max(0.0),
            fuel_consumption_rate: def.fuel_consumption_rate.max(0.0),
            melt_down_delay: def.melt_down_delay.max(0.0),
            fire_delay: def.fire_delay.max(0.0),
            reactor_max_health,
            reactor_health: clamp(
                def.reactor_health.unwrap_or(reactor_max_health),
                0.0,
                reactor_max_health,
            ),
            degree_of_success,
            tolerance: Tolerance::for_skill(degree_of_success),
            power_on: def.power_on,
            auto_temp: def.auto_temp,
            temperature: 0.0,
            fission_rate: 0.0,
            turbine_output: 0.0,
            target_fission_rate: 0.0,
            target_turbine_output: 0.0,
            signal_fission_rate: Signal::Hold,
            signal_turbine_output: Signal::Hold,
            correct_turbine_output: 0.0,
            optimal_temperature: Band::default(),
            allowed_temperature: Band::default(),
            optimal_fission_rate: Band::default(),
            allowed_fission_rate: Band::default(),
            optimal_turbine_output: Band::default(),
            load: 0.0,
            min_update_power_out: 0.0,
            max_update_power_out: 0.0,
            last_output: 0.0,
            melt_down_timer: 0.0,
            fire_timer: 0.0,
            on_fire: 0.0,
            burning: false,
            melted: false,
        };
        reactor.update_bands();
        reactor
    }

    // -- setpoints ---------------------------------------------------------

    pub fn set_fission_rate(&mut self, signal: impl Into<Signal>) {
        self.signal_fission_rate = clamp_signal(signal.into());
    }

    pub fn set_turbine_output(&mut self, signal: impl Into<Signal>) {
        self.signal_turbine_output = clamp_signal(signal.into());
    }

    pub fn set_power_on(&mut self, on: bool) {
        self.power_on = on;
    }

    pub fn set_auto_temp(&mut self, enabled: bool) {
        self.auto_temp = enabled;
    }

    // -- read-only state ---------------------------------------------------

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn fission_rate(&self) -> f64 {
        self.fission_rate
    }

    pub fn turbine_output(&self) -> f64 {
        self.turbine_output
    }

    pub fn target_fission_rate(&self) -> f64 {
        self.target_fission_rate
    }

    pub fn target_turbine_output(&self) -> f64 {
        self.target_turbine_output
    }

    pub fn signal_fission_rate(&self) -> Signal {
        self.signal_fission_rate
    }

    pub fn signal_turbine_output(&self) -> Signal {
        self.signal_turbine_output
    }

    pub fn correct_turbine_output(&self) -> f64 {
        self.correct_turbine_output
    }

    pub fn rods(&self) -> &[Option<FuelRod>; 4] {
        &self.rods
    }

    pub fn max_power_output(&self) -> f64 {
        self.max_power_output
    }

    pub fn power_on(&self) -> bool {
        self.power_on
    }

    pub fn auto_temp(&self) -> bool {
        self.auto_temp
    }

    pub fn degree_of_success(&self) -> f64 {
        self.degree_of_success
    }

    pub fn health(&self) -> f64 {
        self.reactor_health
    }

    pub fn max_health(&self) -> f64 {
        self.reactor_max_health
    }

    pub fn melted(&self) -> bool {
        self.melted
    }

    /// Seconds spent burning.
    pub fn on_fire(&self) -> f64 {
        self.on_fire
    }

    /// Whether the fire timer was pinned at its delay during the last tick.
    pub fn is_burning(&self) -> bool {
        self.burning
    }

    pub fn melt_down_timer(&self) -> f64 {
        self.melt_down_timer
    }

    pub fn fire_timer(&self) -> f64 {
        self.fire_timer
    }

    pub fn meltdown_time_remaining(&self) -> f64 {
        (self.melt_down_delay - self.melt_down_timer).max(0.0)
    }

    pub fn fire_time_remaining(&self) -> f64 {
        (self.fire_delay - self.fire_timer).max(0.0)
    }

    pub fn optimal_temperature(&self) -> Band {
        self.optimal_temperature
    }

    pub fn allowed_temperature(&self) -> Band {
        self.allowed_temperature
    }

    pub fn optimal_fission_rate(&self) -> Band {
        self.optimal_fission_rate
    }

    pub fn allowed_fission_rate(&self) -> Band {
        self.allowed_fission_rate
    }

    pub fn optimal_turbine_output(&self) -> Band {
        self.optimal_turbine_output
    }

    pub fn temperature_critical(&self) -> bool {
        self.temperature > self.allowed_temperature.high
    }

    pub fn temperature_hot(&self) -> bool {
        self.temperature > self.optimal_temperature.high
    }

    /// Sum of heat from rods that still have fuel.
    pub fn fuel_heat(&self) -> f64 {
        self.rods.iter().flatten().map(FuelRod::effective_heat).sum()
    }

    /// Remaining durability across seated rods, in percent of their maximum.
    pub fn fuel_percentage_left(&self) -> f64 {
        let (durability, max) = self
            .rods
            .iter()
            .flatten()
            .fold((0.0, 0.0), |(d, m), rod| (d + rod.durability(), m + rod.max_durability()));
        if max > 0.0 {
            durability / max * 100.0
        } else {
            0.0
        }
    }

    pub fn temperature_out(&self) -> f64 {
        self.temperature * 100.0
    }

    pub fn fuel_out(&self) -> f64 {
        self.fuel_heat()
    }

    pub fn load_value_out(&self) -> f64 {
        self.load
    }

    /// Output the turbines currently deliver, limited by core temperature.
    pub fn power_value_out(&self) -> f64 {
        let temperature_factor = (self.temperature / 50.0).min(1.0);
        self.max_power_output * (self.turbine_output / 100.0).min(temperature_factor)
    }

    /// Output committed to the grid during the last settlement.
    pub fn committed_output(&self) -> f64 {
        self.last_output
    }

    /// True when out of fuel under load, or when even full fission and
    /// turbine output could not cover half the load.
    pub fn need_more_fuel(&self) -> bool {
        self.need_more_fuel_with(0.5, 0.0)
    }

    fn need_more_fuel_with(&self, minimum_output_ratio: f64, min_condition: f64) -> bool {
        if self.fuel_percentage_left() <= min_condition && self.load > 0.0 {
            return true;
        }
        let max_fission_rate = self.fuel_heat().min(100.0);
        if max_fission_rate >= 100.0 {
            return false;
        }
        let theoretical_max_heat = self.generated_heat(max_fission_rate);
        let temperature_factor = (theoretical_max_heat / 50.0).min(1.0);
        let theoretical_max_output = temperature_factor.min(1.0) * self.max_power_output;
        theoretical_max_output < self.load * minimum_output_ratio
    }

    /// True when even the low end of the optimal fission band needs the
    /// turbines near their limit to keep the core from overheating.
    pub fn too_much_fuel(&self) -> bool {
        if self.fuel_percentage_left() <= 0.0 {
            return false;
        }
        let minimum_heat = self.generated_heat(self.optimal_fission_rate.low);
        minimum_heat > (self.correct_turbine_output * 1.5).min(90.0)
    }

    fn generated_heat(&self, fission_rate: f64) -> f64 {
        fission_rate * (self.fuel_heat() / 100.0) * 2.0
    }

    // -- tick internals ----------------------------------------------------

    fn update_correct_output(&mut self, dt: f64) {
        if nearly_equal(self.max_power_output, 0.0, 1e-4) {
            return;
        }
        let ideal = self.load / self.max_power_output * 100.0;
        self.correct_turbine_output += clamp(
            ideal - self.correct_turbine_output,
            -CORRECT_OUTPUT_STEP,
            CORRECT_OUTPUT_STEP,
        ) * dt;
    }

    fn update_bands(&mut self) {
        let skill = self.degree_of_success;
        let fuel_heat = self.fuel_heat();

        self.optimal_turbine_output = Band::new(
            self.correct_turbine_output - self.tolerance.optimal,
            self.correct_turbine_output + self.tolerance.optimal,
        );
        self.optimal_temperature =
            Band::lerp(Band::new(40.0, 60.0), Band::new(30.0, 70.0), skill);
        self.allowed_temperature =
            Band::lerp(Band::new(30.0, 70.0), Band::new(10.0, 90.0), skill);

        let mut optimal_fission = Band::lerp(
            Band::new(30.0, fuel_heat - 20.0),
            Band::new(20.0, fuel_heat - 10.0),
            skill,
        );
        optimal_fission.low = optimal_fission.low.min(optimal_fission.high - 10.0);
        self.optimal_fission_rate = optimal_fission;

        let mut allowed_fission =
            Band::lerp(Band::new(20.0, fuel_heat), Band::new(10.0, fuel_heat), skill);
        allowed_fission.low = allowed_fission.low.min(allowed_fission.high - 10.0);
        self.allowed_fission_rate = allowed_fission;
    }

    fn follow_signals(&mut self, dt: f64) {
        let step = dt * SIGNAL_SLEW_PER_S;
        if let Signal::Value(signal) = self.signal_fission_rate {
            self.target_fission_rate = adjust_without_overshoot(self.target_fission_rate, signal, step);
        }
        if let Signal::Value(signal) = self.signal_turbine_output {
            self.target_turbine_output =
                adjust_without_overshoot(self.target_turbine_output, signal, step);
        }
    }

    fn update_auto_temp(&mut self, speed: f64, dt: f64) {
        let desired_turbine = self.optimal_turbine_output.midpoint();
        self.target_turbine_output +=
            clamp(desired_turbine - self.target_turbine_output, -speed, speed) * dt;
        self.target_turbine_output = clamp(self.target_turbine_output, 0.0, 100.0);

        let desired_fission = self.optimal_fission_rate.midpoint();
        self.target_fission_rate +=
            clamp(desired_fission - self.target_fission_rate, -speed, speed) * dt;

        if self.temperature > self.optimal_temperature.midpoint() {
            self.target_fission_rate = (self.target_fission_rate - speed * 2.0 * dt)
                .min(self.allowed_fission_rate.high);
        } else if self.last_output < self.load {
            self.target_fission_rate = (self.target_fission_rate + speed * 2.0 * dt).min(100.0);
        }
        self.target_fission_rate = clamp(self.target_fission_rate, 0.0, 100.0);

        // Keep the target near the actual rate; fission and temperature lag
        // behind, and an unbounded target would run away.
        self.target_fission_rate = clamp(
            self.target_fission_rate,
            self.fission_rate - 5.0,
            self.fission_rate + 5.0,
        );
    }

    fn update_thermals(&mut self, dt: f64) {
        let diff = self.generated_heat(self.fission_rate) - self.turbine_output - self.temperature;
        let step = clamp(sign(diff) * TEMPERATURE_RATE * dt, -diff.abs(), diff.abs());
        self.temperature = clamp(self.temperature + step, 0.0, 100.0);

        let fission_goal = self.target_fission_rate.min(self.fuel_heat());
        self.fission_rate = clamp(lerp(self.fission_rate, fission_goal, dt), 0.0, 100.0);
        self.turbine_output = clamp(
            lerp(self.turbine_output, self.target_turbine_output, dt),
            0.0,
            100.0,
        );
    }

    fn burn_fuel(&mut self, dt: f64) {
        if self.fission_rate <= 0.0 {
            return;
        }
        let (fission_rate, rate) = (self.fission_rate, self.fuel_consumption_rate);
        for rod in self.rods.iter_mut().flatten() {
            rod.burn(fission_rate, rate, dt);
        }
    }

    fn update_failures(&mut self, dt: f64) {
        // Damaged reactors heat up their failure timers faster.
        let timer_step = lerp(dt * 2.0, dt, self.reactor_health / self.reactor_max_health);

        if self.temperature_critical() {
            self.melt_down_timer += timer_step;
            if self.melt_down_timer > self.melt_down_delay {
                self.melted = true;
                return;
            }
        } else {
            self.melt_down_timer = (self.melt_down_timer - dt).max(0.0);
        }

        if self.temperature_hot() {
            self.fire_timer += timer_step;
            if self.fire_timer >= self.fire_delay {
                self.fire_timer = self.fire_delay;
                self.on_fire += dt;
                self.reactor_health = (self.reactor_health - dt).max(0.0);
                self.burning = true;
            } else {
                self.burning = false;
            }
        } else {
            self.fire_timer = (self.fire_timer - dt).max(0.0);
            self.burning = false;
        }
    }
}

fn clamp_signal(signal: Signal) -> Signal {
    match signal {
        Signal::Hold => Signal::Hold,
        Signal::Value(v) => Signal::Value(clamp(v, 0.0, 100.0)),
    }
}

impl Simulated for Reactor {
    fn tick(&mut self, dt: f64) {
        if self.melted {
            return;
        }

        self.update_correct_output(dt);
        self.update_bands();
        self.follow_signals(dt);

        if !self.power_on {
            self.target_fission_rate = 0.0;
            self.target_turbine_output = 0.0;
        } else if self.auto_temp {
            self.update_auto_temp(AUTO_TEMP_SPEED, dt);
        }

        self.update_thermals(dt);
        self.burn_fuel(dt);
        self.update_failures(dt);
    }
}

impl Powered for Reactor {
    fn priority(&self) -> PowerPriority {
        PowerPriority::Reactor
    }

    fn current_power_consumption(&mut self, _dt: f64) -> f64 {
        0.0
    }

    fn min_max_power_out(&mut self, _load: f64, _dt: f64) -> PowerRange {
        // A well-tuned reactor may trim its output a little further.
        let well_tuned = self.optimal_turbine_output.contains_strict(self.turbine_output)
            && self.optimal_temperature.contains_strict(self.temperature);
        let tolerance = if well_tuned { 3.0 } else { 1.0 };

        let temperature_factor = (self.temperature / 50.0).min(1.0);
        let min_output = self.max_power_output
            * clamp(
                ((self.turbine_output - tolerance) / 100.0).min(temperature_factor),
                0.0,
                1.0,
            );
        let max_output =
            self.max_power_output * ((self.turbine_output + tolerance) / 100.0).min(temperature_factor);

        self.min_update_power_out = min_output;
        self.max_update_power_out = max_output;

        let capacity = if self.power_on {
            self.max_power_output
        } else {
            max_output
        };
        PowerRange::with_capacity(min_output, max_output, capacity)
    }

    fn power_out(&mut self, power: f64, load: f64, aggregate: &PowerRange, _dt: f64) -> f64 {
        let load_left = (load - power).max(0.0);
        let expected_power = clamp(load_left, aggregate.min, aggregate.max);

        // Where the outstanding load sits inside the aggregate band.
        let mut ratio = ((load_left - aggregate.min) / (aggregate.max - aggregate.min)).max(0.0);
        if !ratio.is_finite() {
            ratio = 0.0;
        }

        let (own_min, own_max) = (self.min_update_power_out, self.max_update_power_out);
        let output = clamp(ratio * (own_max - own_min) + own_min, own_min, own_max);

        let mut new_load = load_left;
        if !nearly_equal(self.max_power_output, aggregate.capacity, 1e-4) && aggregate.capacity > 0.0 {
            let ideal_load = self.max_power_output / aggregate.capacity * load_left;
            let correction = self.max_power_output / 100.0;
            let load_adjust = clamp(
                (ratio - 0.5) * 25.0 + ideal_load
                    - (self.turbine_output / 100.0) * self.max_power_output,
                -correction,
                correction,
            );
            new_load = clamp(load_left - (expected_power - output) + load_adjust, 0.0, load_left);
        }

        self.load = new_load.max(0.0);
        self.last_output = output;
        output
    }

    fn grid_resolved(&mut self, _resolution: &Resolution, _dt: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FuelRodDef, RodKind};

    fn manual_reactor() -> Reactor {
        Reactor::new(&ReactorDef {
            max_power_output: 5200.0,
            max_power_output_multiplier: 1.0,
            rods: [Some(FuelRodDef::fresh(RodKind::Normal)); 4],
            fuel_consumption_rate: 0.2,
            melt_down_delay: 10.0,
            fire_delay: 20.0,
            reactor_max_health: 100.0,
            reactor_health: None,
            degree_of_success: 0.5,
            power_on: true,
            auto_temp: false,
        })
    }

    /// Pin the core at full fission so temperature stays at 100.
    fn overheated(mut reactor: Reactor) -> Reactor {
        reactor.temperature = 100.0;
        reactor.fission_rate = 100.0;
        reactor.target_fission_rate = 100.0;
        reactor
    }

    #[test]
    fn fuel_heat_sums_live_rods() {
        let reactor = manual_reactor();
        assert!((reactor.fuel_heat() - 320.0).abs() < f64::EPSILON);
        assert!((reactor.fuel_percentage_left() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn temperature_step_is_clamped_to_ten_per_second() {
        let mut reactor = manual_reactor();
        reactor.fission_rate = 100.0;
        reactor.target_fission_rate = 100.0;
        reactor.tick(1.0);
        assert!((reactor.temperature() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn temperature_step_never_overshoots_resting_point() {
        let mut reactor = manual_reactor();
        // Resting point: 1 * 3.2 * 2 - 0 - 0 = 6.4
        reactor.fission_rate = 1.0;
        reactor.target_fission_rate = 1.0;
        reactor.tick(1.0);
        assert!((reactor.temperature() - 6.4).abs() < 1e-9);
    }

    #[test]
    fn signal_moves_target_without_overshoot() {
        let mut reactor = manual_reactor();
        reactor.set_fission_rate(50.0);
        reactor.tick(0.1);
        assert!((reactor.target_fission_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn signals_are_clamped_and_hold_keeps_target() {
        let mut reactor = manual_reactor();
        reactor.set_turbine_output(250.0);
        assert_eq!(reactor.signal_turbine_output(), Signal::Value(100.0));
        for _ in 0..10 {
            reactor.tick(1.0);
        }
        let target = reactor.target_turbine_output();
        assert!((target - 50.0).abs() < 1e-9);
        reactor.set_turbine_output(Signal::Hold);
        reactor.tick(1.0);
        assert!((reactor.target_turbine_output() - target).abs() < 1e-12);
    }

    #[test]
    fn power_off_zeroes_targets() {
        let mut reactor = manual_reactor();
        reactor.set_fission_rate(80.0);
        reactor.set_turbine_output(80.0);
        reactor.tick(1.0);
        reactor.set_power_on(false);
        reactor.tick(1.0);
        assert!(reactor.target_fission_rate().abs() < f64::EPSILON);
        assert!(reactor.target_turbine_output().abs() < f64::EPSILON);
    }

    #[test]
    fn fission_rate_limited_by_fuel_heat() {
        let mut reactor = Reactor::new(&ReactorDef {
            rods: [Some(FuelRodDef::fresh(RodKind::Normal)), None, None, None],
            ..manual_def()
        });
        reactor.target_fission_rate = 100.0;
        reactor.tick(1.0);
        assert!((reactor.fission_rate() - 80.0).abs() < 1e-9);
    }

    fn manual_def() -> ReactorDef {
        ReactorDef {
            max_power_output: 5200.0,
            max_power_output_multiplier: 1.0,
            rods: [None; 4],
            fuel_consumption_rate: 0.2,
            melt_down_delay: 10.0,
            fire_delay: 20.0,
            reactor_max_health: 100.0,
            reactor_health: None,
            degree_of_success: 0.5,
            power_on: true,
            auto_temp: false,
        }
    }

    #[test]
    fn fuel_burns_only_while_fission_active() {
        let mut reactor = manual_reactor();
        reactor.tick(1.0);
        assert!((reactor.fuel_percentage_left() - 100.0).abs() < f64::EPSILON);

        reactor.target_fission_rate = 50.0;
        reactor.tick(1.0);
        let rod = reactor.rods()[0].as_ref().unwrap();
        // fission lerps to 50 at dt = 1, burning 0.5 * 0.2 durability.
        assert!((rod.durability() - 99.9).abs() < 1e-9);
    }

    #[test]
    fn meltdown_only_after_delay_elapses() {
        let mut reactor = overheated(manual_reactor());
        for _ in 0..20 {
            reactor.tick(0.5);
            assert!(!reactor.melted());
        }
        // Timer sits at exactly the 10 s delay; it must exceed it.
        assert!((reactor.melt_down_timer() - 10.0).abs() < 1e-9);
        reactor.tick(0.5);
        assert!(reactor.melted());
    }

    #[test]
    fn damaged_reactor_melts_faster() {
        let mut reactor = overheated(Reactor::new(&ReactorDef {
            rods: [Some(FuelRodDef::fresh(RodKind::Normal)); 4],
            reactor_health: Some(50.0),
            ..manual_def()
        }));
        // Timer grows 1.5 * dt per tick at half health.
        let mut ticks = 0;
        while !reactor.melted() {
            reactor.tick(0.5);
            ticks += 1;
        }
        assert_eq!(ticks, 14);
    }

    #[test]
    fn melted_reactor_is_frozen() {
        let mut reactor = overheated(manual_reactor());
        while !reactor.melted() {
            reactor.tick(0.5);
        }
        let before = serde_json::to_string(&reactor).unwrap();
        reactor.set_fission_rate(0.0);
        for _ in 0..50 {
            reactor.tick(0.5);
        }
        reactor.signal_fission_rate = Signal::Hold;
        let after = serde_json::to_string(&reactor).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn fire_starts_after_fire_delay_and_burns_health() {
        let mut reactor = Reactor::new(&ReactorDef {
            rods: [Some(FuelRodDef::fresh(RodKind::Normal)); 4],
            melt_down_delay: 1000.0,
            fire_delay: 5.0,
            ..manual_def()
        });
        reactor = overheated(reactor);
        for _ in 0..5 {
            reactor.tick(1.0);
        }
        assert!(reactor.is_burning());
        assert!((reactor.fire_timer() - 5.0).abs() < 1e-9);
        assert!((reactor.on_fire() - 1.0).abs() < 1e-9);
        assert!((reactor.health() - 99.0).abs() < 1e-9);
        assert!(reactor.fire_time_remaining().abs() < 1e-9);
    }

    #[test]
    fn failure_timers_decay_when_cool() {
        let mut reactor = overheated(manual_reactor());
        reactor.tick(1.0);
        reactor.tick(1.0);
        assert!(reactor.melt_down_timer() > 0.0);
        reactor.temperature = 0.0;
        reactor.fission_rate = 0.0;
        reactor.target_fission_rate = 0.0;
        for _ in 0..5 {
            reactor.tick(1.0);
        }
        assert!(reactor.melt_down_timer().abs() < f64::EPSILON);
        assert!(reactor.fire_timer().abs() < f64::EPSILON);
    }

    #[test]
    fn band_widens_when_well_tuned() {
        let mut reactor = manual_reactor();
        reactor.temperature = 50.0;
        reactor.turbine_output = 50.0;
        reactor.correct_turbine_output = 50.0;
        reactor.update_bands();
        let tuned = reactor.min_max_power_out(0.0, 0.05);
        assert!((tuned.min - 5200.0 * 0.47).abs() < 1e-6);
        assert!((tuned.max - 5200.0 * 0.53).abs() < 1e-6);
        assert!((tuned.capacity - 5200.0).abs() < f64::EPSILON);

        reactor.correct_turbine_output = 90.0;
        reactor.update_bands();
        let untuned = reactor.min_max_power_out(0.0, 0.05);
        assert!((untuned.min - 5200.0 * 0.49).abs() < 1e-6);
        assert!((untuned.max - 5200.0 * 0.51).abs() < 1e-6);
    }

    #[test]
    fn single_reactor_tracks_outstanding_load() {
        let mut reactor = manual_reactor();
        reactor.temperature = 50.0;
        reactor.turbine_output = 50.0;
        let range = reactor.min_max_power_out(2600.0, 0.05);
        let output = reactor.power_out(0.0, 2600.0, &range, 0.05);
        assert!(output >= range.min && output <= range.max);
        assert!((reactor.load_value_out() - 2600.0).abs() < 1e-9);
        assert!((reactor.committed_output() - output).abs() < f64::EPSILON);
    }

    #[test]
    fn need_more_fuel_without_rods_under_load() {
        let mut reactor = Reactor::new(&manual_def());
        assert!(!reactor.need_more_fuel());
        reactor.load = 1000.0;
        assert!(reactor.need_more_fuel());
        assert!(!reactor.too_much_fuel());
    }

    #[test]
    fn too_much_fuel_with_four_hot_rods_at_low_load() {
        let reactor = Reactor::new(&ReactorDef {
            rods: [Some(FuelRodDef::fresh(RodKind::Fulgurium)); 4],
            ..manual_def()
        });
        // 600 fuel heat: optimal fission low end 25 → 300 heat, far over 90.
        assert!(reactor.too_much_fuel());
    }

    #[test]
    fn construction_values_are_clamped() {
        let reactor = Reactor::new(&ReactorDef {
            max_power_output: -100.0,
            fuel_consumption_rate: -1.0,
            degree_of_success: 7.0,
            reactor_health: Some(500.0),
            ..manual_def()
        });
        assert!(reactor.max_power_output().abs() < f64::EPSILON);
        assert!((reactor.degree_of_success() - 1.0).abs() < f64::EPSILON);
        assert!((reactor.health() - 100.0).abs() < f64::EPSILON);
    }
}
