//! Easing curves
//!
//! An easing maps normalized time in `[0, 1]` to eased progress. Progress
//! always starts at 0 and ends at 1, but the back and elastic families
//! intentionally overshoot in between.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Easing function applied to a tween's normalized progress
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
    /// CSS-style cubic bezier with control points `(x1, y1)` and `(x2, y2)`
    CubicBezier(f64, f64, f64, f64),
}

const NAMED: [(&str, Easing); 31] = [
    ("linear", Easing::Linear),
    ("easeInQuad", Easing::EaseInQuad),
    ("easeOutQuad", Easing::EaseOutQuad),
    ("easeInOutQuad", Easing::EaseInOutQuad),
    ("easeInCubic", Easing::EaseInCubic),
    ("easeOutCubic", Easing::EaseOutCubic),
    ("easeInOutCubic", Easing::EaseInOutCubic),
    ("easeInQuart", Easing::EaseInQuart),
    ("easeOutQuart", Easing::EaseOutQuart),
    ("easeInOutQuart", Easing::EaseInOutQuart),
    ("easeInQuint", Easing::EaseInQuint),
    ("easeOutQuint", Easing::EaseOutQuint),
    ("easeInOutQuint", Easing::EaseInOutQuint),
    ("easeInSine", Easing::EaseInSine),
    ("easeOutSine", Easing::EaseOutSine),
    ("easeInOutSine", Easing::EaseInOutSine),
    ("easeInExpo", Easing::EaseInExpo),
    ("easeOutExpo", Easing::EaseOutExpo),
    ("easeInOutExpo", Easing::EaseInOutExpo),
    ("easeInCirc", Easing::EaseInCirc),
    ("easeOutCirc", Easing::EaseOutCirc),
    ("easeInOutCirc", Easing::EaseInOutCirc),
    ("easeInBack", Easing::EaseInBack),
    ("easeOutBack", Easing::EaseOutBack),
    ("easeInOutBack", Easing::EaseInOutBack),
    ("easeInElastic", Easing::EaseInElastic),
    ("easeOutElastic", Easing::EaseOutElastic),
    ("easeInOutElastic", Easing::EaseInOutElastic),
    ("easeInBounce", Easing::EaseInBounce),
    ("easeOutBounce", Easing::EaseOutBounce),
    ("easeInOutBounce", Easing::EaseInOutBounce),
];

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f64 = (2.0 * PI) / 4.5;

impl Easing {
    /// Map normalized time to eased progress
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => in_out(t, |t| t * t),
            Easing::EaseInCubic => t.powi(3),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => in_out(t, |t| t.powi(3)),
            Easing::EaseInQuart => t.powi(4),
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => in_out(t, |t| t.powi(4)),
            Easing::EaseInQuint => t.powi(5),
            Easing::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::EaseInOutQuint => in_out(t, |t| t.powi(5)),
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInExpo => expo_in(t),
            Easing::EaseOutExpo => 1.0 - expo_in(1.0 - t),
            Easing::EaseInOutExpo => in_out(t, expo_in),
            Easing::EaseInCirc => circ_in(t),
            Easing::EaseOutCirc => 1.0 - circ_in(1.0 - t),
            Easing::EaseInOutCirc => in_out(t, circ_in),
            Easing::EaseInBack => BACK_C3 * t.powi(3) - BACK_C1 * t * t,
            Easing::EaseOutBack => {
                1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2)
            }
            Easing::EaseInOutBack => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Easing::EaseInElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Easing::EaseOutElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            Easing::EaseInOutElastic => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                        + 1.0
                }
            }
            Easing::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::EaseInOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier(t, x1, y1, x2, y2),
        }
    }

    /// Canonical name, as accepted by [`Easing::from_str`]
    pub fn name(&self) -> String {
        match self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                format!("cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            other => NAMED
                .iter()
                .find(|(_, e)| e == other)
                .map(|(name, _)| name.to_string())
                .unwrap_or_default(),
        }
    }
}

fn in_out(t: f64, ease_in: impl Fn(f64) -> f64) -> f64 {
    if t < 0.5 {
        ease_in(t * 2.0) / 2.0
    } else {
        1.0 - ease_in((1.0 - t) * 2.0) / 2.0
    }
}

fn expo_in(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else {
        2f64.powf(10.0 * t - 10.0)
    }
}

fn circ_in(t: f64) -> f64 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Solve the bezier's x(s) = t with Newton iterations, falling back to
/// bisection, then evaluate y(s).
fn cubic_bezier(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let sample = |a: f64, b: f64, s: f64| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * a + 3.0 * inv * s * s * b + s * s * s
    };
    let slope = |a: f64, b: f64, s: f64| {
        let inv = 1.0 - s;
        3.0 * inv * inv * a + 6.0 * inv * s * (b - a) + 3.0 * s * s * (1.0 - b)
    };

    let mut s = t;
    for _ in 0..8 {
        let err = sample(x1, x2, s) - t;
        if err.abs() < 1e-7 {
            return sample(y1, y2, s);
        }
        let d = slope(x1, x2, s);
        if d.abs() < 1e-6 {
            break;
        }
        s -= err / d;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    s = t;
    for _ in 0..40 {
        let x = sample(x1, x2, s);
        if (x - t).abs() < 1e-7 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    sample(y1, y2, s)
}

impl FromStr for Easing {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((_, easing)) = NAMED.iter().find(|(name, _)| *name == trimmed) {
            return Ok(*easing);
        }
        if let Some(args) = trimmed
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let points: Vec<f64> = args
                .split(',')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| AnimationError::UnknownEasing(s.to_string()))?;
            if let &[x1, y1, x2, y2] = points.as_slice() {
                return Ok(Easing::CubicBezier(x1, y1, x2, y2));
            }
        }
        Err(AnimationError::UnknownEasing(s.to_string()))
    }
}

impl TryFrom<String> for Easing {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.name()
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_named_easings_hit_endpoints() {
        for (name, easing) in NAMED {
            assert!(easing.apply(0.0).abs() < 1e-9, "{name} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{name} at 1");
        }
    }

    #[test]
    fn test_back_overshoots() {
        let min = (0..100)
            .map(|i| Easing::EaseInBack.apply(i as f64 / 100.0))
            .fold(f64::MAX, f64::min);
        assert!(min < 0.0);

        let max = (0..100)
            .map(|i| Easing::EaseOutElastic.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(max > 1.0);
    }

    #[test]
    fn test_in_out_is_symmetric() {
        let a = Easing::EaseInOutCubic.apply(0.25);
        let b = Easing::EaseInOutCubic.apply(0.75);
        assert!((a + b - 1.0).abs() < 1e-9);
        assert!((Easing::EaseInOutQuad.apply(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cubic_bezier_linear_control_points() {
        let easing: Easing = "cubic-bezier(0.25, 0.25, 0.75, 0.75)".parse().unwrap();
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((easing.apply(t) - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("easeOutCubic".parse::<Easing>().unwrap(), Easing::EaseOutCubic);
        assert_eq!(
            Easing::EaseInOutBounce.name().parse::<Easing>().unwrap(),
            Easing::EaseInOutBounce
        );
        assert!(matches!(
            "wobble".parse::<Easing>(),
            Err(AnimationError::UnknownEasing(_))
        ));
    }
}
