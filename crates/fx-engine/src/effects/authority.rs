use std::fmt;

use fx_core::IdOrigin;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ServerAuthority {}
    impl Sealed for super::ClientPrediction {}
}

/// Which view of the simulation an engine handle acts for.
///
/// Chosen once, when the handle is built. Removal paths exist only on
/// `StatusEffects<ServerAuthority>`; code generic over the authority goes
/// through `try_remove`, which refuses on a predicting handle.
pub trait Authority: sealed::Sealed + fmt::Debug + Clone + Copy + Default + 'static {
    /// Short name used in logs.
    const NAME: &'static str;
    /// Whether this view may remove effects.
    const CAN_REMOVE: bool;
    /// The ID origin of worlds this view normally drives.
    const ORIGIN: IdOrigin;
}

/// The authoritative simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerAuthority;

impl Authority for ServerAuthority {
    const NAME: &'static str = "server";
    const CAN_REMOVE: bool = true;
    const ORIGIN: IdOrigin = IdOrigin::Authoritative;
}

/// A client predicting ahead of the authoritative state. May apply and
/// extend effects, never remove them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientPrediction;

impl Authority for ClientPrediction {
    const NAME: &'static str = "client";
    const CAN_REMOVE: bool = false;
    const ORIGIN: IdOrigin = IdOrigin::Predicted;
}
