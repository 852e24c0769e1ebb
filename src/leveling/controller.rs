//! Mesh acquisition controller.

use crate::config::units::{Axis, MmPerSec, XyPos, XyzPos};
use crate::config::{MachineConfig, ProbeBounds, ProbeConfig, SystemConfig};
use crate::error::{AcquisitionError, MeshError, MotionError, ProbeError, Result};
use crate::hal::{BedProbe, JogEncoder, Motion, OperatorInput};
use crate::mesh::{FillReport, MeshBitmap, MeshGrid, MeshIndex, MeshPointType, Plane, PlaneFit};

use super::state::{AcquisitionState, ProbeOrder, ProbeReference};

/// Z travel per jog wheel click (mm).
pub const MANUAL_JOG_STEP: f32 = 0.01;

/// Height change per jog wheel click while fine tuning a node (mm).
pub const FINE_TUNE_STEP: f32 = 0.005;

/// Lift between the two touches of a shim measurement (mm).
pub const SHIM_MEASURE_RAISE: f32 = 1.0;

/// Parameters of a running manual session.
#[derive(Debug, Clone, Copy)]
struct ManualSession {
    origin: XyPos,
    shim_thickness: f32,
}

/// Owns the mesh and drives its population.
///
/// Collaborators (planner, probe, operator input) are passed to each
/// operation; the controller itself holds no hardware.
#[derive(Debug, Clone)]
pub struct MeshLeveling<const GX: usize, const GY: usize> {
    mesh: MeshGrid<GX, GY>,
    machine: MachineConfig,
    probe: ProbeConfig,
    probe_bounds: ProbeBounds,
    state: AcquisitionState,
    manual: Option<ManualSession>,
    skipped: MeshBitmap<GX, GY>,
}

impl<const GX: usize, const GY: usize> MeshLeveling<GX, GY> {
    /// Create a controller with an all-undefined mesh.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the mesh cannot be built.
    pub fn new(config: &SystemConfig) -> Result<Self> {
        Ok(Self {
            mesh: MeshGrid::new(&config.mesh)?,
            machine: config.machine.clone(),
            probe: config.probe.clone(),
            probe_bounds: config.probe_bounds(),
            state: AcquisitionState::Idle,
            manual: None,
            skipped: MeshBitmap::new(),
        })
    }

    /// The mesh.
    #[inline]
    pub fn mesh(&self) -> &MeshGrid<GX, GY> {
        &self.mesh
    }

    /// The mesh, for direct edits.
    #[inline]
    pub fn mesh_mut(&mut self) -> &mut MeshGrid<GX, GY> {
        &mut self.mesh
    }

    /// Session state.
    #[inline]
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Correction for the motion layer.
    #[inline]
    pub fn get_z_correction(&self, x: f32, y: f32) -> f32 {
        self.mesh.get_z_correction(x, y)
    }

    /// Nodes skipped during the current manual session.
    #[inline]
    pub fn skipped(&self) -> &MeshBitmap<GX, GY> {
        &self.skipped
    }

    fn settle_state(&mut self) {
        self.state = if self.mesh.mesh_is_valid() {
            AcquisitionState::Ready
        } else {
            AcquisitionState::Repairing
        };
    }

    fn travel_feedrate(&self) -> MmPerSec {
        self.probe.travel_feedrate.to_mm_per_sec()
    }

    /// Whether node position (x, y) is reachable from `reference`.
    pub fn can_reach(&self, x: f32, y: f32, reference: ProbeReference) -> bool {
        match reference {
            ProbeReference::Nozzle => self.machine.can_reach(x, y),
            ProbeReference::Probe => {
                let off = self.probe.nozzle_to_probe_offset;
                self.probe_bounds.contains(x, y) && self.machine.can_reach(x - off.x, y - off.y)
            }
        }
    }

    // =========================================================================
    // Point searches
    // =========================================================================

    /// Reachable node of `kind` closest to nozzle position `pos`.
    ///
    /// With [`ProbeReference::Probe`] distance is measured from where the probe
    /// sits when the nozzle is at `pos`. Nodes marked in `exclude` are skipped;
    /// for [`MeshPointType::SetInBitmap`] the candidates are instead the nodes
    /// *not* marked in `exclude`. Ties keep the first node in scan order
    /// (x outer, y inner).
    pub fn find_closest_mesh_point_of_type(
        &self,
        kind: MeshPointType,
        pos: XyPos,
        reference: ProbeReference,
        exclude: Option<&MeshBitmap<GX, GY>>,
    ) -> Option<MeshIndex> {
        let origin = match reference {
            ProbeReference::Nozzle => pos,
            ProbeReference::Probe => pos + self.probe.nozzle_to_probe_offset.xy(),
        };
        let marked = |i: usize, j: usize| exclude.map_or(false, |b| b.marked(i, j));

        let mut best: Option<MeshIndex> = None;
        for i in 0..GX {
            for j in 0..GY {
                let candidate = match kind {
                    MeshPointType::SetInBitmap => !marked(i, j),
                    _ => self.mesh.point_type(i, j) == kind && !marked(i, j),
                };
                if !candidate {
                    continue;
                }
                let node = self.mesh.node_position(i, j);
                if !self.can_reach(node.x, node.y, reference) {
                    continue;
                }
                let distance = origin.distance_to(node);
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(MeshIndex { x: i, y: j, distance });
                }
            }
        }
        best
    }

    /// Probe-reachable undefined node furthest from every defined node.
    ///
    /// The metric is the distance to the nearest defined node. On a mesh with
    /// no defined node it is the distance from the mesh center, so probing
    /// starts at a corner.
    pub fn find_furthest_invalid_mesh_point(&self) -> Option<MeshIndex> {
        let center = self.mesh.center();
        let any_real = self.mesh.valid_count() > 0;

        let mut best: Option<MeshIndex> = None;
        for i in 0..GX {
            for j in 0..GY {
                if self.mesh.z(i, j).is_some() {
                    continue;
                }
                let node = self.mesh.node_position(i, j);
                if !self.can_reach(node.x, node.y, ProbeReference::Probe) {
                    continue;
                }
                let distance = if any_real {
                    self.mesh
                        .valid_points()
                        .map(|(k, l, _)| node.distance_to(self.mesh.node_position(k, l)))
                        .fold(f32::INFINITY, f32::min)
                } else {
                    node.distance_to(center)
                };
                if best.map_or(true, |b| distance > b.distance) {
                    best = Some(MeshIndex { x: i, y: j, distance });
                }
            }
        }
        best
    }

    // =========================================================================
    // Automatic probing
    // =========================================================================

    /// Move the nozzle to (x, y) at height `z`, raising first if below it.
    fn travel_to<M: Motion>(&self, motion: &mut M, x: f32, y: f32, z: f32) -> Result<()> {
        let feedrate = self.travel_feedrate();
        let current = motion.current_position();
        if current.z < z {
            motion.move_to(self.machine.clamp(current.with(Axis::Z, z)), feedrate)?;
        }
        motion.move_to(self.machine.clamp(XyzPos::new(x, y, z)), feedrate)
    }

    /// Raise (or lower) the nozzle to `z` in place.
    fn move_z<M: Motion>(&self, motion: &mut M, z: f32) -> Result<()> {
        let target = motion.current_position().with(Axis::Z, z);
        motion.move_to(self.machine.clamp(target), self.travel_feedrate())
    }

    /// Probe the bed at probe position (x, y), retrying up to the configured
    /// count. Returns the bed height with the probe's Z offset applied.
    fn probe_point_with_retries<M: Motion, P: BedProbe>(
        &self,
        motion: &mut M,
        probe: &mut P,
        x: f32,
        y: f32,
    ) -> Result<f32> {
        if !self.can_reach(x, y, ProbeReference::Probe) {
            return Err(ProbeError::Unreachable { x, y }.into());
        }
        let off = self.probe.nozzle_to_probe_offset;
        let attempts = self.probe.retries.saturating_add(1);

        for attempt in 1..=attempts {
            self.travel_to(motion, x - off.x, y - off.y, self.probe.z_clearance_between_probes)?;
            motion.synchronize();
            match probe.probe_at_point(x, y) {
                Ok(raw) => return Ok(raw + off.z),
                Err(_e) => {
                    warn!("probe at ({}, {}) failed, attempt {} of {}", x, y, attempt, attempts);
                }
            }
        }
        error!("probing failed at ({}, {})", x, y);
        Err(ProbeError::ProbeFailed { x, y, attempts }.into())
    }

    fn stow_after_failure<P: BedProbe>(probe: &mut P) {
        if probe.stow().is_err() {
            error!("probe stow failed after aborted probing");
        }
    }

    /// Probe every reachable undefined node (all nodes if `probe_all`).
    ///
    /// The operator button aborts between points. Repeated probe failure
    /// aborts the run with an error; nodes probed so far are kept. Returns the
    /// number of nodes probed.
    ///
    /// # Errors
    ///
    /// `MotionError::NotHomed` before any motion, `AcquisitionError::Cancelled`
    /// on operator abort, or the probe/motion error that stopped the run.
    pub fn probe_entire_mesh<M, P, I>(
        &mut self,
        motion: &mut M,
        probe: &mut P,
        input: &mut I,
        order: ProbeOrder,
        probe_all: bool,
    ) -> Result<usize>
    where
        M: Motion,
        P: BedProbe,
        I: OperatorInput,
    {
        if self.state.in_progress() {
            return Err(AcquisitionError::AlreadyInProgress.into());
        }
        if !motion.is_homed() {
            return Err(MotionError::NotHomed.into());
        }

        if probe_all {
            self.mesh.invalidate();
        }
        self.state = AcquisitionState::AutoProbing;

        let leveling_was_active = motion.leveling_active();
        motion.set_leveling_active(false);
        let result = self.run_auto_probing(motion, probe, input, order);
        motion.set_leveling_active(leveling_was_active);

        match result {
            Ok(count) => {
                info!("probed {} mesh points", count);
                self.settle_state();
                Ok(count)
            }
            Err(e) => {
                self.state = AcquisitionState::Cancelled;
                Err(e)
            }
        }
    }

    fn run_auto_probing<M, P, I>(
        &mut self,
        motion: &mut M,
        probe: &mut P,
        input: &mut I,
        order: ProbeOrder,
    ) -> Result<usize>
    where
        M: Motion,
        P: BedProbe,
        I: OperatorInput,
    {
        self.move_z(motion, self.probe.z_clearance_deploy)?;
        probe.deploy()?;

        let mut count = 0;
        while count < MeshGrid::<GX, GY>::POINTS {
            if input.button_pressed() {
                warn!("mesh only partially populated");
                input.wait_for_release();
                Self::stow_after_failure(probe);
                return Err(AcquisitionError::Cancelled.into());
            }

            let next = match order {
                ProbeOrder::Closest(near) => self.find_closest_mesh_point_of_type(
                    MeshPointType::Invalid,
                    near,
                    ProbeReference::Probe,
                    None,
                ),
                ProbeOrder::Furthest => self.find_furthest_invalid_mesh_point(),
            };
            let Some(point) = next else {
                break;
            };

            let node = self.mesh.node_position(point.x, point.y);
            match self.probe_point_with_retries(motion, probe, node.x, node.y) {
                Ok(z) => self.mesh.set_z(point.x, point.y, z),
                Err(e) => {
                    Self::stow_after_failure(probe);
                    return Err(e);
                }
            }
            count += 1;
        }

        probe.stow()?;
        self.move_z(motion, self.probe.z_clearance_deploy)?;
        if let ProbeOrder::Closest(near) = order {
            let off = self.probe.nozzle_to_probe_offset;
            let span = &self.mesh;
            let x = (near.x - off.x).clamp(span.mesh_index_to_xpos(0), span.mesh_index_to_xpos(GX - 1));
            let y = (near.y - off.y).clamp(span.mesh_index_to_ypos(0), span.mesh_index_to_ypos(GY - 1));
            self.travel_to(motion, x, y, self.probe.z_clearance_deploy)?;
        }
        Ok(count)
    }

    // =========================================================================
    // Manual probing
    // =========================================================================

    fn next_manual_target(&mut self) -> Option<MeshIndex> {
        let origin = self.manual.map(|m| m.origin).unwrap_or_default();
        let next = self.find_closest_mesh_point_of_type(
            MeshPointType::Invalid,
            origin,
            ProbeReference::Nozzle,
            Some(&self.skipped),
        );
        match next {
            Some(p) => self.state = AcquisitionState::ManualProbing { x: p.x, y: p.y },
            None => {
                self.manual = None;
                self.settle_state();
            }
        }
        next
    }

    /// Start a stepwise manual session. Targets are chosen closest to
    /// `origin`; recorded heights have `shim_thickness` subtracted.
    ///
    /// Returns the first target, or `None` if no undefined node is reachable.
    pub fn start_manual_probing(&mut self, origin: XyPos, shim_thickness: f32) -> Result<Option<MeshIndex>> {
        if self.state.in_progress() {
            return Err(AcquisitionError::AlreadyInProgress.into());
        }
        self.skipped.clear();
        self.manual = Some(ManualSession {
            origin,
            shim_thickness,
        });
        Ok(self.next_manual_target())
    }

    /// Current manual target node.
    pub fn manual_target(&self) -> Option<(usize, usize)> {
        match self.state {
            AcquisitionState::ManualProbing { x, y } => Some((x, y)),
            _ => None,
        }
    }

    /// Record the nozzle height touching the shim at the current target and
    /// advance. Returns the next target.
    pub fn record_manual_point(&mut self, nozzle_z: f32) -> Result<Option<MeshIndex>> {
        let (Some((x, y)), Some(session)) = (self.manual_target(), self.manual) else {
            return Err(AcquisitionError::NotInProgress.into());
        };
        self.mesh.set_z(x, y, nozzle_z - session.shim_thickness);
        Ok(self.next_manual_target())
    }

    /// Leave the current target undefined and advance. Skipped nodes are not
    /// offered again in this session.
    pub fn skip_manual_point(&mut self) -> Result<Option<MeshIndex>> {
        let Some((x, y)) = self.manual_target() else {
            return Err(AcquisitionError::NotInProgress.into());
        };
        self.skipped.mark(x, y);
        Ok(self.next_manual_target())
    }

    /// Abort any running session.
    pub fn cancel(&mut self) {
        if self.state.in_progress() {
            warn!("mesh acquisition cancelled in state {}", self.state.name());
            self.state = AcquisitionState::Cancelled;
            self.manual = None;
        }
    }

    /// Homing invalidates the nozzle position an in-progress session relies on.
    pub fn on_homing(&mut self) {
        self.cancel();
    }

    /// Jog Z from the encoder until the button is pressed, returning the final
    /// nozzle height.
    fn move_z_with_encoder<M, I>(
        &self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        step: f32,
    ) -> Result<f32>
    where
        M: Motion,
        I: OperatorInput,
    {
        input.wait_for_release();
        while !input.button_pressed() {
            input.idle();
            let clicks = encoder.take();
            if clicks != 0 {
                let target = motion.current_position();
                self.move_z(motion, target.z + clicks as f32 * step)?;
            }
        }
        motion.synchronize();
        Ok(motion.current_position().z)
    }

    /// Interactive manual probing of every remaining undefined node.
    ///
    /// For each target the nozzle moves over the node at `z_clearance`, the
    /// operator jogs it down onto a shim of `shim_thickness` and confirms.
    /// Holding the button cancels; nodes recorded so far are kept.
    /// Returns the number of nodes recorded.
    pub fn manually_probe_remaining_mesh<M, I>(
        &mut self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        origin: XyPos,
        z_clearance: f32,
        shim_thickness: f32,
    ) -> Result<usize>
    where
        M: Motion,
        I: OperatorInput,
    {
        if !motion.is_homed() {
            return Err(MotionError::NotHomed.into());
        }
        self.start_manual_probing(origin, shim_thickness)?;

        let leveling_was_active = motion.leveling_active();
        motion.set_leveling_active(false);
        let result = self.run_manual_probing(motion, input, encoder, z_clearance);
        motion.set_leveling_active(leveling_was_active);

        if result.is_err() {
            self.cancel();
        }
        let count = result?;
        self.travel_to(motion, origin.x, origin.y, self.probe.z_clearance_deploy)?;
        Ok(count)
    }

    fn run_manual_probing<M, I>(
        &mut self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        z_clearance: f32,
    ) -> Result<usize>
    where
        M: Motion,
        I: OperatorInput,
    {
        self.move_z(motion, z_clearance)?;

        let mut count = 0;
        while let Some((x, y)) = self.manual_target() {
            let node = self.mesh.node_position(x, y);
            self.travel_to(motion, node.x, node.y, z_clearance)?;
            motion.synchronize();

            let z = self.move_z_with_encoder(motion, input, encoder, MANUAL_JOG_STEP)?;
            if input.click_and_hold() {
                warn!("mesh only partially populated");
                self.move_z(motion, self.probe.z_clearance_deploy)?;
                return Err(AcquisitionError::Cancelled.into());
            }
            self.record_manual_point(z)?;
            count += 1;
            self.move_z(motion, z_clearance)?;
        }
        Ok(count)
    }

    /// Measure a shim's thickness at the mesh center: the operator jogs onto
    /// the shim, then onto the bed with the shim removed.
    pub fn measure_shim_thickness<M, I>(
        &mut self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        start_height: f32,
    ) -> Result<f32>
    where
        M: Motion,
        I: OperatorInput,
    {
        if !motion.is_homed() {
            return Err(MotionError::NotHomed.into());
        }
        let leveling_was_active = motion.leveling_active();
        motion.set_leveling_active(false);
        let result = self.run_shim_measurement(motion, input, encoder, start_height);
        motion.set_leveling_active(leveling_was_active);

        if let Ok(thickness) = result {
            info!("shim thickness {} mm", thickness);
        }
        result
    }

    fn run_shim_measurement<M, I>(
        &self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        start_height: f32,
    ) -> Result<f32>
    where
        M: Motion,
        I: OperatorInput,
    {
        let center = self.mesh.center();
        self.travel_to(motion, center.x, center.y, start_height)?;
        motion.synchronize();

        info!("place shim under nozzle");
        let with_shim = self.move_z_with_encoder(motion, input, encoder, MANUAL_JOG_STEP)?;
        self.move_z(motion, with_shim + SHIM_MEASURE_RAISE)?;
        motion.synchronize();

        info!("remove shim");
        let without_shim = self.move_z_with_encoder(motion, input, encoder, MANUAL_JOG_STEP)?;
        self.move_z(motion, without_shim + self.probe.z_clearance_between_probes)?;

        Ok((with_shim - without_shim).abs())
    }

    /// Adjust defined nodes by hand, closest to `pos` first.
    ///
    /// For up to `count` nodes the nozzle is lowered to the node's stored
    /// height; each jog wheel click moves the height by [`FINE_TUNE_STEP`]
    /// and a press stores it. Holding the button ends the session and keeps
    /// the nodes stored so far. Returns the number of nodes stored.
    ///
    /// # Errors
    ///
    /// `MotionError::NotHomed` before any motion, `AcquisitionError::AlreadyInProgress`
    /// during a probing session, `MeshError::NoReachablePoint` if no defined
    /// node can be reached.
    pub fn fine_tune_mesh<M, I>(
        &mut self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        pos: XyPos,
        count: usize,
        z_clearance: f32,
    ) -> Result<usize>
    where
        M: Motion,
        I: OperatorInput,
    {
        if self.state.in_progress() {
            return Err(AcquisitionError::AlreadyInProgress.into());
        }
        if !motion.is_homed() {
            return Err(MotionError::NotHomed.into());
        }
        if self
            .find_closest_mesh_point_of_type(MeshPointType::Real, pos, ProbeReference::Nozzle, None)
            .is_none()
        {
            return Err(MeshError::NoReachablePoint.into());
        }

        let leveling_was_active = motion.leveling_active();
        motion.set_leveling_active(false);
        let result = self.run_fine_tune(motion, input, encoder, pos, count, z_clearance);
        motion.set_leveling_active(leveling_was_active);

        let edited = result?;
        info!("fine tuned {} mesh points", edited);
        Ok(edited)
    }

    fn run_fine_tune<M, I>(
        &mut self,
        motion: &mut M,
        input: &mut I,
        encoder: &JogEncoder,
        pos: XyPos,
        count: usize,
        z_clearance: f32,
    ) -> Result<usize>
    where
        M: Motion,
        I: OperatorInput,
    {
        let mut done = MeshBitmap::<GX, GY>::new();
        let mut edited = 0;

        while edited < count {
            let Some(node) =
                self.find_closest_mesh_point_of_type(MeshPointType::Real, pos, ProbeReference::Nozzle, Some(&done))
            else {
                break;
            };
            done.mark(node.x, node.y);
            let Some(mut z) = self.mesh.z(node.x, node.y) else {
                continue;
            };

            let p = self.mesh.node_position(node.x, node.y);
            self.travel_to(motion, p.x, p.y, z_clearance)?;
            self.move_z(motion, z)?;
            motion.synchronize();

            // Stale clicks from before the nozzle arrived do not count
            encoder.take();
            input.wait_for_release();
            while !input.button_pressed() {
                input.idle();
                let clicks = encoder.take();
                if clicks != 0 {
                    z += clicks as f32 * FINE_TUNE_STEP;
                    self.move_z(motion, z)?;
                }
            }
            if input.click_and_hold() {
                debug!("fine tuning stopped at node ({}, {})", node.x, node.y);
                break;
            }

            self.mesh.set_z(node.x, node.y, z);
            edited += 1;
            self.move_z(motion, z_clearance)?;
        }

        self.move_z(motion, z_clearance)?;
        Ok(edited)
    }

    // =========================================================================
    // Repair and tilt
    // =========================================================================

    /// Smart-fill undefined nodes and update the session state.
    pub fn repair(&mut self) -> FillReport {
        let report = self.mesh.smart_fill_mesh();
        if !self.state.in_progress() {
            self.settle_state();
        }
        report
    }

    /// Probe the configured three points and tilt the mesh through them.
    pub fn probe_three_point_tilt<M, P>(&mut self, motion: &mut M, probe: &mut P) -> Result<Plane>
    where
        M: Motion,
        P: BedProbe,
    {
        let points = self.probe.three_point;
        let mut residuals = [(0.0, 0.0, 0.0); 3];

        self.with_probe(motion, probe, |this, motion, probe| {
            for (slot, p) in residuals.iter_mut().zip(points.iter()) {
                let z = this.probe_point_with_retries(motion, probe, p.x, p.y)?;
                *slot = (p.x, p.y, z - this.mesh.get_z_correction(p.x, p.y));
            }
            Ok(())
        })?;

        self.mesh.tilt_mesh_based_on_3pts(residuals)
    }

    /// Probe an `n × n` grid over the probe envelope and tilt the mesh by the
    /// least-squares plane through the residuals.
    pub fn tilt_mesh_based_on_probed_grid<M, P>(
        &mut self,
        motion: &mut M,
        probe: &mut P,
        n: usize,
    ) -> Result<Plane>
    where
        M: Motion,
        P: BedProbe,
    {
        if n < 2 {
            return Err(MeshError::InsufficientData { points: n * n }.into());
        }
        let bounds = self.probe_bounds;
        let dx = (bounds.max_x - bounds.min_x) / (n - 1) as f32;
        let dy = (bounds.max_y - bounds.min_y) / (n - 1) as f32;
        let mut fit = PlaneFit::new();

        self.with_probe(motion, probe, |this, motion, probe| {
            for ix in 0..n {
                let x = bounds.min_x + ix as f32 * dx;
                for iy in 0..n {
                    // Serpentine order keeps travel short
                    let iy = if ix % 2 == 0 { iy } else { n - 1 - iy };
                    let y = bounds.min_y + iy as f32 * dy;
                    let z = this.probe_point_with_retries(motion, probe, x, y)?;
                    fit.add(x, y, z - this.mesh.get_z_correction(x, y));
                }
            }
            Ok(())
        })?;

        let plane = fit.finish()?;
        self.mesh.shift_by_plane(&plane);
        Ok(plane)
    }

    /// Run `f` with leveling off and the probe deployed, restoring both.
    fn with_probe<M, P, F>(&mut self, motion: &mut M, probe: &mut P, f: F) -> Result<()>
    where
        M: Motion,
        P: BedProbe,
        F: FnOnce(&mut Self, &mut M, &mut P) -> Result<()>,
    {
        if !motion.is_homed() {
            return Err(MotionError::NotHomed.into());
        }
        let leveling_was_active = motion.leveling_active();
        motion.set_leveling_active(false);
        let result = self.deploy_and_run(motion, probe, f);
        motion.set_leveling_active(leveling_was_active);
        result
    }

    fn deploy_and_run<M, P, F>(&mut self, motion: &mut M, probe: &mut P, f: F) -> Result<()>
    where
        M: Motion,
        P: BedProbe,
        F: FnOnce(&mut Self, &mut M, &mut P) -> Result<()>,
    {
        self.move_z(motion, self.probe.z_clearance_deploy)?;
        probe.deploy()?;
        if let Err(e) = f(self, motion, probe) {
            Self::stow_after_failure(probe);
            return Err(e);
        }
        probe.stow()?;
        self.move_z(motion, self.probe.z_clearance_deploy)
    }
}
