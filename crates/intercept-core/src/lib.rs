pub mod borders;
pub mod error;
pub mod flight;
pub mod models;
pub mod obstacle;
pub mod predictor;
pub mod reachability;
pub mod routing;
pub mod rules;
pub mod session;
pub mod spatial;
pub mod tracking;

pub use borders::{BorderLine, Borders};
pub use error::{BordersError, FlightError, MotionError, SessionError};
pub use flight::{
    Controls, Decision, Drone, DroneView, FlightState, Maneuver, Phase, RoleChange, TickContext,
};
pub use models::{DroneId, Point2, Point3};
pub use obstacle::{Obstacle, ObstacleMargins};
pub use predictor::{BallisticPredictor, BalloonModel, HittingPoint, PredictedState};
pub use reachability::Reachability;
pub use rules::{FlightRules, MissionMode};
pub use session::{
    DroneRecord, MotionController, NullTelemetry, SensorFrame, Session, SessionStats,
    TelemetrySink, TickRecord,
};
pub use tracking::TrackedObject;
