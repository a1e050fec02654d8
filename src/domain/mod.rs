// Domain layer: commute models and the ports the providers plug into.

pub mod model;
pub mod ports;
