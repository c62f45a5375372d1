//! Strongly-typed wrappers for simulation concepts
//!
//! Ticks, run ids and playback rates are newtypes so they cannot be mixed up
//! with plain integers. `Vec2` is the single vector type used for positions,
//! velocities and aim directions.

use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// One discrete simulation step
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Tick(u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn new(tick: u64) -> Self {
        Tick(tick)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The following tick
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }

    /// Move forward by `ticks`
    pub fn offset(self, ticks: u64) -> Tick {
        Tick(self.0 + ticks)
    }

    /// Move back by `ticks`, or `None` if that would go before tick 0
    pub fn checked_rewind(self, ticks: u64) -> Option<Tick> {
        self.0.checked_sub(ticks).map(Tick)
    }

    /// Number of ticks from `earlier` to `self` (0 if `earlier` is later)
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one play session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(u32);

impl RunId {
    pub fn new(id: u32) -> Self {
        RunId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run{}", self.0)
    }
}

/// 2D vector for positions, velocities and directions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(&self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Unit vector in the same direction, or zero for the zero vector
    pub fn normalized(&self) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }

    /// Clamp each component into `[0, bounds]`
    pub fn clamp_to(&self, bounds: Vec2) -> Vec2 {
        Vec2::new(self.x.clamp(0.0, bounds.x), self.y.clamp(0.0, bounds.y))
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    /// Bit patterns of both components (for hashing)
    pub fn to_bits(&self) -> (u32, u32) {
        (self.x.to_bits(), self.y.to_bits())
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Rational playback rate: source ticks advanced per simulation tick
///
/// Kept as an integer ratio so that mapping a simulation tick to a source
/// tick is exact and independent of how many steps it took to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackRate {
    num: u32,
    den: u32,
}

impl PlaybackRate {
    pub const ONE: PlaybackRate = PlaybackRate { num: 1, den: 1 };

    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(MirrorError::InvalidRate { num, den });
        }
        Ok(PlaybackRate { num, den })
    }

    /// Whole-number rate
    pub fn times(factor: u32) -> Result<Self> {
        Self::new(factor, 1)
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn den(&self) -> u32 {
        self.den
    }

    /// Source ticks covered after `elapsed` simulation ticks (rounded down)
    pub fn scale(&self, elapsed: u64) -> u64 {
        ((elapsed as u128 * self.num as u128) / self.den as u128) as u64
    }

    /// Compose two rates (playing at `self`, then scaled by `other`)
    pub fn then(&self, other: PlaybackRate) -> PlaybackRate {
        let num = self.num as u64 * other.num as u64;
        let den = self.den as u64 * other.den as u64;
        let g = gcd(num, den);
        PlaybackRate {
            num: (num / g) as u32,
            den: (den / g) as u32,
        }
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        PlaybackRate::ONE
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}x", self.num)
        } else {
            write!(f, "{}/{}x", self.num, self.den)
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a.max(1)
}
