//! Simulated printer shared by the integration tests.
//!
//! The planner keeps a position *belief*; the carriage follows commanded
//! deltas through a backlash dead band, and each toolhead's tip sits at the
//! carriage plus its true (unknown to the firmware) offset. The contact
//! signal, the bed probe and the front panel all read the same state.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bed_leveling::config::MAX_HOTENDS;
use bed_leveling::error::{MotionError, ProbeError, Result};
use bed_leveling::{
    Axis, BacklashCompensation, BedProbe, JogEncoder, Motion, MmPerSec, OperatorInput,
    ProbeSignal, Toolheads, XyzPos,
};

/// Calibration object: a box of `dims` at `center`, touched by a nozzle of
/// radius `nozzle_radius`.
#[derive(Debug, Clone, Copy)]
pub struct SimObject {
    pub center: XyzPos,
    pub dims: XyzPos,
    pub nozzle_radius: f32,
}

impl SimObject {
    pub fn standard() -> Self {
        Self {
            center: XyzPos::new(50.0, 50.0, 5.0),
            dims: XyzPos::new(10.0, 10.0, 10.0),
            nozzle_radius: 1.0,
        }
    }

    fn touches(&self, tip: XyzPos) -> bool {
        tip.z <= self.center.z + self.dims.z / 2.0
            && (tip.x - self.center.x).abs() <= self.dims.x / 2.0 + self.nozzle_radius
            && (tip.y - self.center.y).abs() <= self.dims.y / 2.0 + self.nozzle_radius
    }
}

/// Bed surface: a tilted plane plus an optional bump at one point.
#[derive(Debug, Clone, Copy)]
pub struct SimBed {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl SimBed {
    pub fn flat(c: f32) -> Self {
        Self { a: 0.0, b: 0.0, c }
    }

    pub fn height(&self, x: f32, y: f32) -> f32 {
        self.a * x + self.b * y + self.c
    }
}

#[derive(Debug)]
pub struct SimState {
    pub belief: XyzPos,
    pub carriage: XyzPos,
    pub mechanism: XyzPos,
    pub play: XyzPos,
    last_dir: [f32; 3],

    pub true_offsets: [XyzPos; MAX_HOTENDS],
    pub stored_offsets: [XyzPos; MAX_HOTENDS],
    pub active: u8,
    pub fail_tool_change: Option<u8>,

    pub homed: bool,
    pub leveling: bool,
    pub soft_endstops: bool,

    pub correction: f32,
    pub smoothing: f32,
    pub backlash_distance: XyzPos,

    pub object: Option<SimObject>,
    pub bed: SimBed,
    pub probe_offset: XyzPos,

    pub moves: usize,
    pub lowest_tip_z: f32,
    pub unprotected_moves: usize,
    pub syncs: usize,
    pub plan_syncs: usize,
}

impl SimState {
    fn tip(&self) -> XyzPos {
        self.mechanism + self.true_offsets[self.active as usize]
    }
}

/// Handle to the simulated printer. Clones share state.
#[derive(Clone)]
pub struct SimPrinter(pub Rc<RefCell<SimState>>);

impl SimPrinter {
    /// Homed printer at (100, 100, 20) with T0 exactly where the firmware
    /// believes, no backlash and the standard calibration object.
    pub fn new() -> Self {
        let start = XyzPos::new(100.0, 100.0, 20.0);
        Self(Rc::new(RefCell::new(SimState {
            belief: start,
            carriage: start,
            mechanism: start,
            play: XyzPos::ZERO,
            last_dir: [1.0; 3],
            true_offsets: [XyzPos::ZERO; MAX_HOTENDS],
            stored_offsets: [XyzPos::ZERO; MAX_HOTENDS],
            active: 0,
            fail_tool_change: None,
            homed: true,
            leveling: true,
            soft_endstops: true,
            correction: 0.0,
            smoothing: 0.0,
            backlash_distance: XyzPos::ZERO,
            object: Some(SimObject::standard()),
            bed: SimBed::flat(0.0),
            probe_offset: XyzPos::ZERO,
            moves: 0,
            lowest_tip_z: f32::INFINITY,
            unprotected_moves: 0,
            syncs: 0,
            plan_syncs: 0,
        })))
    }

    /// Mechanical play per axis.
    pub fn with_play(self, play: XyzPos) -> Self {
        {
            let mut s = self.0.borrow_mut();
            s.play = play;
            // Start as if the last move on every axis was positive
            s.mechanism = s.carriage - play * 0.5;
        }
        self
    }

    /// Physical error between belief and carriage, as left by homing.
    pub fn with_homing_error(self, error: XyzPos) -> Self {
        {
            let mut s = self.0.borrow_mut();
            s.carriage = s.carriage + error;
            s.mechanism = s.mechanism + error;
        }
        self
    }

    /// True offset of a toolhead relative to T0.
    pub fn with_true_offset(self, extruder: u8, offset: XyzPos) -> Self {
        self.0.borrow_mut().true_offsets[extruder as usize] = offset;
        self
    }

    pub fn with_bed(self, bed: SimBed) -> Self {
        self.0.borrow_mut().bed = bed;
        self
    }

    pub fn state(&self) -> std::cell::Ref<'_, SimState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, SimState> {
        self.0.borrow_mut()
    }

    pub fn contact(&self) -> SimContact {
        SimContact(self.0.clone())
    }

    pub fn bed_probe(&self) -> SimBedProbe {
        SimBedProbe {
            state: self.0.clone(),
            failures: VecDeque::new(),
            deploys: 0,
            stows: 0,
            probed: Vec::new(),
        }
    }

    /// Where the active tip physically is, minus where the firmware thinks.
    pub fn belief_error(&self) -> XyzPos {
        let s = self.0.borrow();
        s.tip() - s.belief
    }
}

impl Motion for SimPrinter {
    fn current_position(&self) -> XyzPos {
        self.0.borrow().belief
    }

    fn set_current_position(&mut self, position: XyzPos) {
        self.0.borrow_mut().belief = position;
    }

    fn move_to(&mut self, target: XyzPos, _feedrate: MmPerSec) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.moves += 1;
        if s.leveling || s.soft_endstops {
            s.unprotected_moves += 1;
        }
        for axis in Axis::ALL {
            let i = axis.index();
            let delta = target[axis] - s.belief[axis];
            if delta == 0.0 {
                continue;
            }
            let dir = delta.signum();
            let mut c = s.carriage[axis] + delta;
            if dir != s.last_dir[i] {
                c += dir * s.correction * s.backlash_distance[axis];
                s.last_dir[i] = dir;
            }
            s.carriage[axis] = c;
            let half = s.play[axis] / 2.0;
            s.mechanism[axis] = s.mechanism[axis].clamp(c - half, c + half);
        }
        s.belief = target;
        let tip_z = s.tip().z;
        s.lowest_tip_z = s.lowest_tip_z.min(tip_z);
        Ok(())
    }

    fn synchronize(&mut self) {
        self.0.borrow_mut().syncs += 1;
    }

    fn sync_plan_position(&mut self) {
        self.0.borrow_mut().plan_syncs += 1;
    }

    fn is_homed(&self) -> bool {
        self.0.borrow().homed
    }

    fn leveling_active(&self) -> bool {
        self.0.borrow().leveling
    }

    fn set_leveling_active(&mut self, active: bool) {
        self.0.borrow_mut().leveling = active;
    }

    fn soft_endstops_enabled(&self) -> bool {
        self.0.borrow().soft_endstops
    }

    fn set_soft_endstops_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().soft_endstops = enabled;
    }
}

impl Toolheads for SimPrinter {
    fn active_extruder(&self) -> u8 {
        self.0.borrow().active
    }

    fn tool_change(&mut self, extruder: u8) -> Result<()> {
        let mut s = self.0.borrow_mut();
        if s.fail_tool_change == Some(extruder) {
            return Err(MotionError::ToolChangeFailed(extruder).into());
        }
        let shift = s.stored_offsets[extruder as usize] - s.stored_offsets[s.active as usize];
        s.belief = s.belief + shift;
        s.active = extruder;
        Ok(())
    }

    fn hotend_offset(&self, extruder: u8) -> XyzPos {
        self.0.borrow().stored_offsets[extruder as usize]
    }

    fn set_hotend_offset(&mut self, extruder: u8, offset: XyzPos) {
        self.0.borrow_mut().stored_offsets[extruder as usize] = offset;
    }
}

impl BacklashCompensation for SimPrinter {
    fn correction(&self) -> f32 {
        self.0.borrow().correction
    }

    fn set_correction(&mut self, correction: f32) {
        self.0.borrow_mut().correction = correction;
    }

    fn smoothing_mm(&self) -> f32 {
        self.0.borrow().smoothing
    }

    fn set_smoothing_mm(&mut self, mm: f32) {
        self.0.borrow_mut().smoothing = mm;
    }

    fn distance_mm(&self, axis: Axis) -> f32 {
        self.0.borrow().backlash_distance[axis]
    }

    fn set_distance_mm(&mut self, axis: Axis, mm: f32) {
        self.0.borrow_mut().backlash_distance[axis] = mm;
    }
}

/// Nozzle-to-object contact.
pub struct SimContact(Rc<RefCell<SimState>>);

impl ProbeSignal for SimContact {
    fn is_triggered(&mut self) -> Result<bool> {
        let s = self.0.borrow();
        Ok(s.object.map_or(false, |o| o.touches(s.tip())))
    }
}

/// Bed probe reading the simulated surface under its own position.
pub struct SimBedProbe {
    state: Rc<RefCell<SimState>>,
    /// Outcome of upcoming probes; `true` fails. Empty means succeed.
    pub failures: VecDeque<bool>,
    pub deploys: usize,
    pub stows: usize,
    /// Requested probe positions, with the nozzle XY at the time.
    pub probed: Vec<(f32, f32, f32, f32)>,
}

impl SimBedProbe {
    pub fn fail_next(mut self, n: usize) -> Self {
        self.failures.extend(std::iter::repeat(true).take(n));
        self
    }
}

impl BedProbe for SimBedProbe {
    fn deploy(&mut self) -> Result<()> {
        self.deploys += 1;
        Ok(())
    }

    fn stow(&mut self) -> Result<()> {
        self.stows += 1;
        Ok(())
    }

    fn probe_at_point(&mut self, x: f32, y: f32) -> Result<f32> {
        let s = self.state.borrow();
        self.probed.push((x, y, s.belief.x, s.belief.y));
        if self.failures.pop_front().unwrap_or(false) {
            return Err(ProbeError::ProbeFailed { x, y, attempts: 1 }.into());
        }
        Ok(s.bed.height(x, y) - s.probe_offset.z)
    }
}

/// One operator action in a scripted session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelStep {
    /// Button not pressed at the next poll.
    Quiet,
    /// Turn the jog wheel by this many clicks.
    Jog(i32),
    /// Press (and release) the button.
    Press,
    /// Keep holding after a press: cancels.
    Hold,
}

/// Front panel driven by a script. When the script runs out the button reads
/// as `pressed_when_done`.
pub struct ScriptedPanel {
    pub encoder: Rc<JogEncoder>,
    pub steps: VecDeque<PanelStep>,
    pub pressed_when_done: bool,
}

impl ScriptedPanel {
    pub fn new(encoder: Rc<JogEncoder>, steps: &[PanelStep], pressed_when_done: bool) -> Self {
        Self {
            encoder,
            steps: steps.iter().copied().collect(),
            pressed_when_done,
        }
    }

    /// A panel nobody touches.
    pub fn idle() -> Self {
        Self::new(Rc::new(JogEncoder::new()), &[], false)
    }
}

impl OperatorInput for ScriptedPanel {
    fn button_pressed(&mut self) -> bool {
        match self.steps.front() {
            Some(PanelStep::Press) => {
                self.steps.pop_front();
                true
            }
            Some(PanelStep::Quiet) => {
                self.steps.pop_front();
                false
            }
            Some(_) => false,
            None => self.pressed_when_done,
        }
    }

    fn click_and_hold(&mut self) -> bool {
        if self.steps.front() == Some(&PanelStep::Hold) {
            self.steps.pop_front();
            return true;
        }
        false
    }

    fn wait_for_release(&mut self) {}

    fn idle(&mut self) {
        if let Some(PanelStep::Jog(clicks)) = self.steps.front().copied() {
            self.steps.pop_front();
            // The interrupt side of the encoder
            self.encoder.add(clicks);
        }
    }
}
