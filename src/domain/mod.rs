// Domain layer: prospect/campaign models and the ports the agents and pipeline depend on.

pub mod model;
pub mod ports;
