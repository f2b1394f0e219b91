//! Pre-defined throw scripts for the simulator.

use intercept_core::{Borders, Controls, Point2, Point3};

/// One scripted balloon throw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throw {
    pub at_s: f64,
    pub from: Point3,
    pub velocity: Point3,
}

/// A named script: when the operator presses each control, and when the
/// balloon is thrown.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub takeoff_at_s: f64,
    pub start_at_s: f64,
    pub begin_at_s: f64,
    pub throws: Vec<Throw>,
    pub noise_cm: f64,
    pub dropout_rate: f64,
}

pub const SCENARIOS: [&str; 3] = ["rally", "drift", "noisy"];

impl Scenario {
    /// Look up a scenario laid out relative to the play area.
    pub fn by_name(name: &str, borders: &Borders) -> Option<Self> {
        let middle = borders.middle();
        let side = |i: usize| if i % 2 == 0 { 1.0_f64 } else { -1.0 };

        let scenario = match name {
            "rally" => Self::base(
                "rally",
                series(middle, |_| (0.0, 0.0), |_| Point3::new(0.0, 0.0, 350.0)),
            ),
            "drift" => Self::base(
                "drift",
                series(
                    middle,
                    |i| (-40.0 * side(i), 10.0),
                    |i| Point3::new(60.0 * side(i), -15.0, 300.0),
                ),
            ),
            "noisy" => Self {
                noise_cm: 3.0,
                dropout_rate: 0.05,
                ..Self::base(
                    "noisy",
                    series(middle, |_| (20.0, -20.0), |_| {
                        Point3::new(-20.0, 10.0, 350.0)
                    }),
                )
            },
            _ => return None,
        };
        Some(scenario)
    }

    fn base(name: &'static str, throws: Vec<Throw>) -> Self {
        Self {
            name,
            takeoff_at_s: 0.5,
            start_at_s: 1.5,
            begin_at_s: 3.0,
            throws,
            noise_cm: 0.5,
            dropout_rate: 0.0,
        }
    }

    /// Operator controls at `time_s`. Each control stays pressed once pressed.
    pub fn controls_at(&self, time_s: f64) -> Controls {
        Controls {
            takeoff: time_s >= self.takeoff_at_s,
            start: time_s >= self.start_at_s,
            begin: time_s >= self.begin_at_s,
        }
    }

    /// Throws due in `(after_s, until_s]`.
    pub fn throws_between(&self, after_s: f64, until_s: f64) -> impl Iterator<Item = &Throw> {
        self.throws
            .iter()
            .filter(move |t| t.at_s > after_s && t.at_s <= until_s)
    }
}

/// Four throws 160 cm above `middle`, one every 12 s from t = 5 s.
fn series(
    middle: Point2,
    offset: impl Fn(usize) -> (f64, f64),
    velocity: impl Fn(usize) -> Point3,
) -> Vec<Throw> {
    (0..4)
        .map(|i| {
            let (dx, dy) = offset(i);
            Throw {
                at_s: 5.0 + 12.0 * i as f64,
                from: Point3::new(middle.x + dx, middle.y + dy, 160.0),
                velocity: velocity(i),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borders() -> Borders {
        Borders::rectangle(Point2::new(0.0, 0.0), Point2::new(400.0, 300.0)).unwrap()
    }

    #[test]
    fn every_listed_scenario_exists() {
        for name in SCENARIOS {
            let scenario = Scenario::by_name(name, &borders()).unwrap();
            assert_eq!(scenario.name, name);
            assert!(!scenario.throws.is_empty());
            for throw in &scenario.throws {
                assert!(borders().contains(throw.from.xy()));
            }
        }
        assert!(Scenario::by_name("juggling", &borders()).is_none());
    }

    #[test]
    fn controls_latch_in_order() {
        let scenario = Scenario::by_name("rally", &borders()).unwrap();
        assert_eq!(scenario.controls_at(0.0), Controls::default());
        let c = scenario.controls_at(2.0);
        assert!(c.takeoff && c.start && !c.begin);
        let c = scenario.controls_at(10.0);
        assert!(c.takeoff && c.start && c.begin);
    }

    #[test]
    fn each_throw_fires_once() {
        let scenario = Scenario::by_name("rally", &borders()).unwrap();
        let mut fired = 0;
        let mut t = 0.0;
        while t < 60.0 {
            fired += scenario.throws_between(t, t + 0.05).count();
            t += 0.05;
        }
        assert_eq!(fired, scenario.throws.len());
    }
}
