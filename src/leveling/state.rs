//! Acquisition session state.

use crate::config::XyPos;

/// Where the mesh acquisition controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    /// No session has run.
    #[default]
    Idle,
    /// Operator is jogging the nozzle onto node (x, y).
    ManualProbing {
        /// Target column.
        x: usize,
        /// Target row.
        y: usize,
    },
    /// Automatic probing is running.
    AutoProbing,
    /// Probing finished with undefined nodes left to fill or tilt.
    Repairing,
    /// Every node is defined.
    Ready,
    /// The last session was aborted by the operator, a probe fault or homing.
    Cancelled,
}

impl AcquisitionState {
    /// A probing session is running.
    #[inline]
    pub fn in_progress(&self) -> bool {
        matches!(
            self,
            AcquisitionState::ManualProbing { .. } | AcquisitionState::AutoProbing
        )
    }

    /// State name for display/debugging.
    pub fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "Idle",
            AcquisitionState::ManualProbing { .. } => "ManualProbing",
            AcquisitionState::AutoProbing => "AutoProbing",
            AcquisitionState::Repairing => "Repairing",
            AcquisitionState::Ready => "Ready",
            AcquisitionState::Cancelled => "Cancelled",
        }
    }
}

/// Which position a closest-point search measures from, and so which points
/// count as reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeReference {
    /// The nozzle; any point inside nozzle travel is reachable.
    Nozzle,
    /// The bed probe, offset from the nozzle.
    Probe,
}

/// Order in which automatic probing visits the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOrder {
    /// Always the undefined node closest to this point next.
    Closest(XyPos),
    /// The undefined node furthest from any probed node next.
    Furthest,
}
