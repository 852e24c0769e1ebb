//! Touch-probing calibration against a conductive reference object.

use libm::{ceilf, fabsf};

use crate::config::units::{Axis, Direction, MmPerSec, XyzPos};
use crate::config::{CalibrationConfig, MachineConfig, MAX_HOTENDS};
use crate::error::{CalibrationError, MotionError, ProbeError, Result};
use crate::hal::{BacklashCompensation, Motion, ProbeSignal, Toolheads};

use super::measurement::{Measurements, Side, Uncertainty};
use super::report::CalibrationReport;

/// Slack take-up move after a backlash measurement (mm per axis).
pub const BACKLASH_TAKE_UP: f32 = 3.0;

/// Fraction of the nozzle tip height the nozzle plunges below the top face.
pub const TIP_PLUNGE_RATIO: f32 = 0.7;

/// Where a calibration run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// No run in progress.
    #[default]
    Idle,
    /// Moving above the object.
    Park,
    /// Touching the top face.
    ProbeTop,
    /// Touching a lateral face.
    ProbeSide(Side),
    /// Deriving center and nozzle size from the faces.
    ComputeCenter,
    /// Writing offsets and correcting the position belief.
    ApplyOffsets,
}

/// A calibration request, as issued by the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationCommand {
    /// Full calibration of backlash and every toolhead.
    All,
    /// Measure and store backlash only.
    Backlash {
        /// Search tier.
        uncertainty: Uncertainty,
    },
    /// Calibrate one toolhead.
    Toolhead {
        /// Extruder to calibrate, the active one if `None`.
        extruder: Option<u8>,
        /// Search tier.
        uncertainty: Uncertainty,
    },
    /// Probe and report without changing any state.
    Report {
        /// Search tier.
        uncertainty: Uncertainty,
    },
}

/// Calibrates toolhead offsets and backlash by touching a reference object.
///
/// Owns the machine and the contact signal for the duration of its life;
/// recover them with [`Calibrator::into_parts`].
pub struct Calibrator<M, S>
where
    M: Motion + Toolheads + BacklashCompensation,
    S: ProbeSignal,
{
    machine: M,
    signal: S,
    config: CalibrationConfig,
    envelope: MachineConfig,
    phase: CalibrationPhase,
}

impl<M, S> Calibrator<M, S>
where
    M: Motion + Toolheads + BacklashCompensation,
    S: ProbeSignal,
{
    /// Create a calibrator. Use [`CalibratorBuilder`](super::CalibratorBuilder)
    /// to build one from a [`SystemConfig`](crate::config::SystemConfig).
    pub fn new(machine: M, signal: S, config: CalibrationConfig, envelope: MachineConfig) -> Self {
        Self {
            machine,
            signal,
            config,
            envelope,
            phase: CalibrationPhase::Idle,
        }
    }

    /// The calibration configuration.
    #[inline]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// The machine.
    #[inline]
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// The machine, mutably.
    #[inline]
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Release the machine and the contact signal.
    pub fn into_parts(self) -> (M, S) {
        (self.machine, self.signal)
    }

    /// A fresh measurement record for this object.
    pub fn measurements(&self) -> Measurements {
        Measurements::new(&self.config)
    }

    fn hotends(&self) -> u8 {
        self.envelope.hotends.min(MAX_HOTENDS as u8)
    }

    fn travel_feedrate(&self) -> MmPerSec {
        self.config.feedrates.travel.to_mm_per_sec()
    }

    fn check_extruder(&self, extruder: u8) -> Result<()> {
        let hotends = self.hotends();
        if extruder >= hotends {
            return Err(CalibrationError::InvalidExtruder { extruder, hotends }.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Motion helpers
    // ------------------------------------------------------------------

    fn calibration_move(&mut self, target: XyzPos) -> Result<()> {
        let target = self.envelope.clamp(target);
        let feedrate = self.travel_feedrate();
        self.machine.move_to(target, feedrate)
    }

    fn park_above_object(&mut self, m: &Measurements, uncertainty: Uncertainty) -> Result<()> {
        self.phase = CalibrationPhase::Park;
        let clearance = uncertainty.mm(&self.config.uncertainty);

        let mut target = self.machine.current_position();
        target.z = m.obj_center.z + self.config.dimensions.z / 2.0 + clearance;
        self.calibration_move(target)?;

        target.x = m.obj_center.x;
        target.y = m.obj_center.y;
        self.calibration_move(target)
    }

    fn set_nozzle(&mut self, m: &Measurements, extruder: u8) -> Result<()> {
        if extruder != self.machine.active_extruder() {
            self.park_above_object(m, Uncertainty::Unknown)?;
            self.machine.tool_change(extruder)?;
        }
        Ok(())
    }

    /// Step along `axis` until the contact signal reads `stop_state`,
    /// synchronizing before every read. Returns the believed coordinate at
    /// the transition.
    fn measuring_movement(
        &mut self,
        axis: Axis,
        dir: Direction,
        stop_state: bool,
        fast: bool,
    ) -> Result<f32> {
        let (step, limit, feedrate) = if fast {
            (
                self.config.search.fast_step,
                self.config.search.fast_travel,
                self.config.feedrates.fast,
            )
        } else {
            (
                self.config.measurement_resolution,
                self.config.search.fine_travel,
                self.config.feedrates.slow,
            )
        };
        let feedrate = feedrate.to_mm_per_sec();
        let steps = ceilf(limit / step) as u32;

        let mut target = self.machine.current_position();
        for _ in 0..steps {
            target[axis] += dir.sign() * step;
            self.machine.move_to(target, feedrate)?;
            self.machine.synchronize();
            if self.signal.is_triggered()? == stop_state {
                return Ok(target[axis]);
            }
        }

        warn!("no contact on {} within {} mm", axis, limit);
        Err(ProbeError::NoTrigger {
            axis,
            travel: steps as f32 * step,
        }
        .into())
    }

    /// Touch the object moving along `axis` in `dir`.
    ///
    /// When `backlash` is given and the search is fine, the toolhead then
    /// backs off until the contact releases and the release distance is
    /// written to it. The toolhead always returns to its starting coordinate
    /// on `axis`, also when the touch fails.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::NoTrigger`] if the contact does not change
    /// within the travel cap, or any error of the collaborators.
    pub fn measure(
        &mut self,
        axis: Axis,
        dir: Direction,
        stop_state: bool,
        backlash: Option<&mut f32>,
        uncertainty: Uncertainty,
    ) -> Result<f32> {
        let fast = uncertainty.is_fast(&self.config.uncertainty);
        let start = self.machine.current_position()[axis];

        let result = self
            .measuring_movement(axis, dir, stop_state, fast)
            .and_then(|measured| {
                if let (Some(slot), false) = (backlash, fast) {
                    let release = self.measuring_movement(axis, dir.reversed(), !stop_state, fast)?;
                    *slot = fabsf(release - measured);
                }
                Ok(measured)
            });

        let mut back = self.machine.current_position();
        back[axis] = start;
        let feedrate = self.travel_feedrate();
        let restored = self.machine.move_to(back, feedrate);

        let measured = result?;
        restored?;
        debug!("touch on {} at {}", axis, measured);
        Ok(measured)
    }

    // ------------------------------------------------------------------
    // Face probing
    // ------------------------------------------------------------------

    fn probe_top(&mut self, m: &mut Measurements, uncertainty: Uncertainty) -> Result<()> {
        self.phase = CalibrationPhase::ProbeTop;
        let top = self.measure(
            Axis::Z,
            Direction::Negative,
            true,
            Some(&mut m.backlash[Side::Top.index()]),
            uncertainty,
        )?;
        m.obj_center.z = top - self.config.dimensions.z / 2.0;
        m.obj_side[Side::Top.index()] = top;
        Ok(())
    }

    /// Park above the object and touch one face.
    ///
    /// Lateral faces are touched with the nozzle plunged below the last
    /// measured top; with `probe_top_at_edge` the top is first re-measured
    /// close to that face.
    pub fn probe_side(
        &mut self,
        m: &mut Measurements,
        uncertainty: Uncertainty,
        side: Side,
        probe_top_at_edge: bool,
    ) -> Result<()> {
        self.park_above_object(m, uncertainty)?;

        if side == Side::Top {
            return self.probe_top(m, uncertainty);
        }

        let axis = side.axis();
        let dir = side.approach().sign();
        let half = self.config.dimensions[axis] / 2.0;
        let nozzle = m.nozzle_dimension(axis);

        if probe_top_at_edge {
            let mut target = self.machine.current_position();
            target[axis] = m.obj_center[axis] - dir * (half - nozzle);
            self.calibration_move(target)?;
            self.probe_top(m, uncertainty)?;
        }

        self.phase = CalibrationPhase::ProbeSide(side);
        let clearance = uncertainty.mm(&self.config.uncertainty);
        let mut target = self.machine.current_position();
        target[axis] = m.obj_center[axis] - dir * (half + nozzle / 2.0 + clearance);
        self.calibration_move(target)?;

        target.z = m.side(Side::Top) - self.config.nozzle_tip_height * TIP_PLUNGE_RATIO;
        self.calibration_move(target)?;

        let measured = self.measure(
            axis,
            side.approach(),
            true,
            Some(&mut m.backlash[side.index()]),
            uncertainty,
        )?;
        m.obj_center[axis] = measured + dir * (half + nozzle / 2.0);
        m.obj_side[side.index()] = measured;
        Ok(())
    }

    /// Touch the top and every enabled lateral face, then derive the object
    /// center, the effective nozzle size and the positional error.
    pub fn probe_sides(&mut self, m: &mut Measurements, uncertainty: Uncertainty) -> Result<()> {
        let sides = self.config.sides;
        let at_edges = self.config.measure_at_top_edges;
        if at_edges && !sides.any() {
            return Err(CalibrationError::NoSidesConfigured.into());
        }

        if !at_edges {
            self.probe_side(m, uncertainty, Side::Top, false)?;
        }
        for side in Side::LATERAL {
            let enabled = match side {
                Side::Right => sides.right,
                Side::Front => sides.front,
                Side::Left => sides.left,
                Side::Back => sides.back,
                Side::Top => false,
            };
            if enabled {
                self.probe_side(m, uncertainty, side, at_edges)?;
            }
        }

        self.phase = CalibrationPhase::ComputeCenter;
        let dims = self.config.dimensions;
        if sides.has_x_center() {
            m.obj_center.x = (m.side(Side::Left) + m.side(Side::Right)) / 2.0;
            m.nozzle_outer_dimension.x = m.side(Side::Right) - m.side(Side::Left) - dims.x;
        }
        if sides.has_y_center() {
            m.obj_center.y = (m.side(Side::Front) + m.side(Side::Back)) / 2.0;
            m.nozzle_outer_dimension.y = m.side(Side::Back) - m.side(Side::Front) - dims.y;
        }

        self.park_above_object(m, uncertainty)?;

        let truth = self.config.true_center;
        m.pos_error.x = if sides.has_x_center() {
            truth.x - m.obj_center.x
        } else {
            0.0
        };
        m.pos_error.y = if sides.has_y_center() {
            truth.y - m.obj_center.y
        } else {
            0.0
        };
        m.pos_error.z = truth.z - m.obj_center.z;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calibration passes
    // ------------------------------------------------------------------

    /// Run `f` with backlash correction at `correction` and smoothing off,
    /// restoring both afterwards.
    fn with_backlash_correction<R>(
        &mut self,
        correction: f32,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved_correction = self.machine.correction();
        let saved_smoothing = self.machine.smoothing_mm();
        self.machine.set_correction(correction);
        self.machine.set_smoothing_mm(0.0);

        let result = f(self);

        self.machine.set_correction(saved_correction);
        self.machine.set_smoothing_mm(saved_smoothing);
        result
    }

    /// Measure backlash on every axis and store it in the compensation.
    ///
    /// An axis probed from both faces takes the average; from one face, that
    /// face's reading; Z comes from the top. Nothing is stored if probing
    /// fails.
    pub fn calibrate_backlash(&mut self, m: &mut Measurements, uncertainty: Uncertainty) -> Result<()> {
        self.with_backlash_correction(0.0, |this| {
            this.probe_sides(m, uncertainty)?;

            let sides = this.config.sides;
            if let Some(x) = axis_backlash(sides.left, sides.right, m, Side::Left, Side::Right) {
                this.machine.set_distance_mm(Axis::X, x);
            }
            if let Some(y) = axis_backlash(sides.front, sides.back, m, Side::Front, Side::Back) {
                this.machine.set_distance_mm(Axis::Y, y);
            }
            this.machine.set_distance_mm(Axis::Z, m.backlash(Side::Top));
            info!(
                "backlash x {} y {} z {}",
                this.machine.distance_mm(Axis::X),
                this.machine.distance_mm(Axis::Y),
                this.machine.distance_mm(Axis::Z)
            );
            Ok(())
        })?;

        self.with_backlash_correction(1.0, |this| {
            let take_up = XyzPos::new(BACKLASH_TAKE_UP, BACKLASH_TAKE_UP, BACKLASH_TAKE_UP);
            let start = this.machine.current_position();
            this.calibration_move(start + take_up)?;
            this.calibration_move(start)
        })
    }

    /// Calibrate one toolhead's offset against the object.
    ///
    /// The positional error is added to the extruder's hotend offset (axes
    /// with a measured center, and Z), offsets are renormalized to extruder
    /// 0, and the position belief is corrected so the object sits at its
    /// true center.
    pub fn calibrate_toolhead(
        &mut self,
        m: &mut Measurements,
        uncertainty: Uncertainty,
        extruder: u8,
    ) -> Result<()> {
        self.check_extruder(extruder)?;
        self.with_backlash_correction(1.0, |this| {
            this.set_nozzle(m, extruder)?;
            this.probe_sides(m, uncertainty)?;

            this.phase = CalibrationPhase::ApplyOffsets;
            let sides = this.config.sides;
            let mut offset = this.machine.hotend_offset(extruder);
            if sides.has_x_center() {
                offset.x += m.pos_error.x;
            }
            if sides.has_y_center() {
                offset.y += m.pos_error.y;
            }
            offset.z += m.pos_error.z;
            this.machine.set_hotend_offset(extruder, offset);
            this.normalize_hotend_offsets();

            this.machine.synchronize();
            if sides.has_x_center() {
                this.update_measurements(m, Axis::X);
            }
            if sides.has_y_center() {
                this.update_measurements(m, Axis::Y);
            }
            this.update_measurements(m, Axis::Z);
            this.machine.sync_plan_position();
            debug!("toolhead {} offset {} {} {}", extruder, offset.x, offset.y, offset.z);
            Ok(())
        })
    }

    fn update_measurements(&mut self, m: &mut Measurements, axis: Axis) {
        let mut position = self.machine.current_position();
        position[axis] += m.pos_error[axis];
        self.machine.set_current_position(position);
        m.obj_center[axis] = self.config.true_center[axis];
        m.pos_error[axis] = 0.0;
    }

    /// Calibrate every toolhead in order, then switch back to extruder 0.
    pub fn calibrate_all_toolheads(&mut self, m: &mut Measurements, uncertainty: Uncertainty) -> Result<()> {
        self.with_backlash_correction(1.0, |this| {
            for extruder in 0..this.hotends() {
                this.calibrate_toolhead(m, uncertainty, extruder)?;
            }
            this.normalize_hotend_offsets();
            this.set_nozzle(m, 0)
        })
    }

    /// Full calibration: coarse toolhead pass, backlash, a nozzle cycle to
    /// settle the changers, a fine toolhead pass, then park away from the
    /// object.
    ///
    /// On failure the hotend offsets and backlash distances from before the
    /// run are put back.
    pub fn calibrate_all(&mut self) -> Result<()> {
        let hotends = self.hotends();
        let mut saved_offsets = [XyzPos::ZERO; MAX_HOTENDS];
        for (e, slot) in saved_offsets.iter_mut().enumerate().take(hotends as usize) {
            *slot = self.machine.hotend_offset(e as u8);
        }
        let saved_backlash = Axis::ALL.map(|axis| self.machine.distance_mm(axis));

        let mut m = self.measurements();
        let result = self.with_backlash_correction(1.0, |this| this.run_full_calibration(&mut m));

        if result.is_err() {
            error!("calibration failed, restoring offsets and backlash");
            let active = self.machine.active_extruder();
            let shift = saved_offsets[active as usize] - self.machine.hotend_offset(active);
            for e in 0..hotends {
                self.machine.set_hotend_offset(e, saved_offsets[e as usize]);
            }
            for (axis, mm) in Axis::ALL.iter().zip(saved_backlash) {
                self.machine.set_distance_mm(*axis, mm);
            }
            let position = self.machine.current_position() + shift;
            self.machine.set_current_position(position);
            self.machine.sync_plan_position();
        }
        self.phase = CalibrationPhase::Idle;
        result
    }

    fn run_full_calibration(&mut self, m: &mut Measurements) -> Result<()> {
        self.reset_hotend_offsets();

        self.calibrate_all_toolheads(m, Uncertainty::Unknown)?;
        self.calibrate_backlash(m, Uncertainty::Uncertain)?;
        for extruder in 0..self.hotends() {
            self.set_nozzle(m, extruder)?;
        }
        self.calibrate_all_toolheads(m, Uncertainty::Uncertain)?;

        self.phase = CalibrationPhase::Park;
        let mut target = self.machine.current_position();
        target.x = self.config.park_x;
        self.calibration_move(target)
    }

    fn reset_hotend_offsets(&mut self) {
        for e in 0..self.hotends() {
            self.machine.set_hotend_offset(e, XyzPos::ZERO);
        }
    }

    /// Make every hotend offset relative to extruder 0.
    pub fn normalize_hotend_offsets(&mut self) {
        let base = self.machine.hotend_offset(0);
        for e in 1..self.hotends() {
            let offset = self.machine.hotend_offset(e) - base;
            self.machine.set_hotend_offset(e, offset);
        }
        self.machine.set_hotend_offset(0, XyzPos::ZERO);
    }

    /// Probe the object and report what was measured without changing
    /// offsets or backlash. Hotend offsets are normalized before reporting.
    pub fn probe_and_report(&mut self, uncertainty: Uncertainty) -> Result<CalibrationReport> {
        let mut m = self.measurements();
        self.with_backlash_correction(1.0, |this| this.probe_sides(&mut m, uncertainty))?;
        self.normalize_hotend_offsets();

        let hotends = self.hotends();
        let report = CalibrationReport::new(&m, &self.config, |e| self.machine.hotend_offset(e), hotends);
        report.log();
        Ok(report)
    }

    /// Execute an operator command.
    ///
    /// Requires all axes homed; fails with [`MotionError::NotHomed`] before
    /// any motion otherwise. Mesh leveling and soft endstops are off for the
    /// duration and restored afterwards, on success and on failure.
    pub fn run(&mut self, command: CalibrationCommand) -> Result<Option<CalibrationReport>> {
        if !self.machine.is_homed() {
            return Err(MotionError::NotHomed.into());
        }

        let leveling = self.machine.leveling_active();
        let soft_endstops = self.machine.soft_endstops_enabled();
        self.machine.set_leveling_active(false);
        self.machine.set_soft_endstops_enabled(false);

        let result = self.dispatch(command);

        self.machine.set_soft_endstops_enabled(soft_endstops);
        self.machine.set_leveling_active(leveling);
        self.phase = CalibrationPhase::Idle;
        result
    }

    fn dispatch(&mut self, command: CalibrationCommand) -> Result<Option<CalibrationReport>> {
        let mut m = self.measurements();
        match command {
            CalibrationCommand::All => self.calibrate_all().map(|_| None),
            CalibrationCommand::Backlash { uncertainty } => {
                self.calibrate_backlash(&mut m, uncertainty).map(|_| None)
            }
            CalibrationCommand::Toolhead {
                extruder,
                uncertainty,
            } => {
                let extruder = extruder.unwrap_or_else(|| self.machine.active_extruder());
                self.calibrate_toolhead(&mut m, uncertainty, extruder).map(|_| None)
            }
            CalibrationCommand::Report { uncertainty } => self.probe_and_report(uncertainty).map(Some),
        }
    }
}

fn axis_backlash(
    low_enabled: bool,
    high_enabled: bool,
    m: &Measurements,
    low: Side,
    high: Side,
) -> Option<f32> {
    match (low_enabled, high_enabled) {
        (true, true) => Some((m.backlash(low) + m.backlash(high)) / 2.0),
        (true, false) => Some(m.backlash(low)),
        (false, true) => Some(m.backlash(high)),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_backlash_selection() {
        let config = CalibrationConfig::new(XyzPos::new(50.0, 50.0, 5.0));
        let mut m = Measurements::new(&config);
        m.backlash[Side::Left.index()] = 0.2;
        m.backlash[Side::Right.index()] = 0.4;

        let both = axis_backlash(true, true, &m, Side::Left, Side::Right).unwrap();
        assert!((both - 0.3).abs() < 1e-6);
        assert_eq!(axis_backlash(false, true, &m, Side::Left, Side::Right), Some(0.4));
        assert_eq!(axis_backlash(true, false, &m, Side::Left, Side::Right), Some(0.2));
        assert_eq!(axis_backlash(false, false, &m, Side::Left, Side::Right), None);
    }

    #[test]
    fn test_phase_default() {
        assert_eq!(CalibrationPhase::default(), CalibrationPhase::Idle);
    }
}
